//! Transaction helpers.
//!
//! Repository statements and orchestration steps take any [`GenericClient`], so the
//! same code runs on a plain connection or inside the transaction opened here.
//!
//! # Example
//!
//! ```ignore
//! let mut client = pool.get().await?;
//! let contact = kyc::transaction!(&mut client, tx, {
//!     let (_, qb) = ContactRepo::build_insert(&new_contact)?;
//!     qb.fetch_one::<Contact>(&tx).await
//! })?;
//! ```
//!
//! [`GenericClient`]: crate::GenericClient

/// Runs the block inside a database transaction and evaluates to its result.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `kyc::KycResult<T>`. Failures to begin or commit are
/// returned as the macro's value, never with an early return, so that
/// [`transaction_with_retry!`] can see them.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let __kyc_tx_result: $crate::KycResult<_> = async {
            let $tx = ($client)
                .transaction()
                .await
                .map_err($crate::KycError::from_db_error)?;

            let __kyc_tx_body_result: $crate::KycResult<_> = async { $body }.await;
            match __kyc_tx_body_result {
                Ok(value) => {
                    $tx.commit()
                        .await
                        .map_err($crate::KycError::from_db_error)?;
                    Ok(value)
                }
                Err(error) => match $tx.rollback().await {
                    Ok(()) => Err(error),
                    Err(rollback_err) => Err($crate::KycError::Other(format!(
                        "{error} (rollback failed: {rollback_err})"
                    ))),
                },
            }
        }
        .await;
        __kyc_tx_result
    }};
}

/// Like [`transaction!`], but re-runs the whole block in a fresh transaction when
/// it fails with a serialization failure, at most `$max_retries` extra times.
///
/// The block is re-evaluated from the start, so reads it performs are repeated
/// against the new snapshot.
#[macro_export]
macro_rules! transaction_with_retry {
    ($client:expr, $max_retries:expr, $tx:ident, $body:block) => {{
        let __kyc_max_retries: u32 = $max_retries;
        let mut __kyc_attempt: u32 = 0;
        loop {
            let __kyc_result: $crate::KycResult<_> = $crate::transaction!($client, $tx, $body);
            match __kyc_result {
                Err(error) if error.is_retryable() && __kyc_attempt < __kyc_max_retries => {
                    __kyc_attempt += 1;
                    $crate::__private::tracing::warn!(
                        target: "kyc.tx",
                        attempt = __kyc_attempt,
                        max_retries = __kyc_max_retries,
                        error = %error,
                        "retrying transaction"
                    );
                }
                other => break other,
            }
        }
    }};
}
