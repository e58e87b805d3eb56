//! Streaming list responses.
//!
//! A row that fails to decode aborts the stream. An item the receiver does not
//! accept is logged and skipped, and the stream goes on.

use std::future::Future;

use futures_util::{Stream, StreamExt, pin_mut};
use serde::Serialize;

use crate::error::{KycError, KycResult};

/// Receiving end of a streamed list.
pub trait ItemSink<T>: Send + Sync {
    /// Deliver one item; an `Err` carries the reason it was not accepted.
    fn send(&self, item: T) -> impl Future<Output = Result<(), String>> + Send;
}

impl<T: Send + 'static> ItemSink<T> for tokio::sync::mpsc::Sender<T> {
    async fn send(&self, item: T) -> Result<(), String> {
        tokio::sync::mpsc::Sender::send(self, item)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Outcome of a completed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub sent: usize,
    pub skipped: usize,
}

/// Decode every row with `scan` and hand it to `sink`.
pub async fn forward<S, R, T, F, K>(rows: S, scan: F, sink: &K) -> KycResult<StreamSummary>
where
    S: Stream<Item = KycResult<R>>,
    F: Fn(&R) -> KycResult<T>,
    K: ItemSink<T>,
{
    pin_mut!(rows);
    let mut summary = StreamSummary::default();
    let mut index = 0usize;
    while let Some(row) = rows.next().await {
        let row = row.map_err(|e| KycError::Streaming(format!("row {index}: {e}")))?;
        let item = scan(&row)?;
        match sink.send(item).await {
            Ok(()) => summary.sent += 1,
            Err(reason) => {
                tracing::warn!(target: "kyc.stream", index, reason = %reason, "skipping list item");
                summary.skipped += 1;
            }
        }
        index += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures_util::stream;

    /// Refuses the values listed in `refuse`.
    #[derive(Default)]
    struct Collect {
        got: Mutex<Vec<i32>>,
        refuse: Vec<i32>,
    }

    impl ItemSink<i32> for Collect {
        async fn send(&self, item: i32) -> Result<(), String> {
            if self.refuse.contains(&item) {
                return Err(format!("refused {item}"));
            }
            self.got.lock().unwrap().push(item);
            Ok(())
        }
    }

    fn scan(row: &i32) -> KycResult<i32> {
        if *row < 0 {
            return Err(KycError::decode("value", "negative"));
        }
        Ok(*row * 10)
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let sink = Collect::default();
        let rows = stream::iter(vec![Ok(1), Ok(2), Ok(3)]);
        let summary = forward(rows, scan, &sink).await.unwrap();
        assert_eq!(summary, StreamSummary { sent: 3, skipped: 0 });
        assert_eq!(*sink.got.lock().unwrap(), vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn refused_item_is_skipped() {
        let sink = Collect {
            refuse: vec![20],
            ..Default::default()
        };
        let rows = stream::iter(vec![Ok(1), Ok(2), Ok(3)]);
        let summary = forward(rows, scan, &sink).await.unwrap();
        assert_eq!(summary, StreamSummary { sent: 2, skipped: 1 });
        assert_eq!(*sink.got.lock().unwrap(), vec![10, 30]);
    }

    #[tokio::test]
    async fn scan_error_aborts() {
        let sink = Collect::default();
        let rows = stream::iter(vec![Ok(1), Ok(-1), Ok(3)]);
        let err = forward(rows, scan, &sink).await.unwrap_err();
        assert!(matches!(err, KycError::Decode { .. }));
        assert_eq!(*sink.got.lock().unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn broken_row_stream_is_a_streaming_error() {
        let sink = Collect::default();
        let rows = stream::iter(vec![Ok(1), Err(KycError::Connection("reset".into()))]);
        let err = forward(rows, scan, &sink).await.unwrap_err();
        assert!(matches!(err, KycError::Streaming(ref m) if m.starts_with("row 1")));
    }

    #[tokio::test]
    async fn closed_channel_skips_everything() {
        let (tx, rx) = tokio::sync::mpsc::channel::<i32>(4);
        drop(rx);
        let rows = stream::iter(vec![Ok(1), Ok(2)]);
        let summary = forward(rows, scan, &tx).await.unwrap();
        assert_eq!(summary, StreamSummary { sent: 0, skipped: 2 });
    }
}
