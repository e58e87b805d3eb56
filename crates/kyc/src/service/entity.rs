//! Create / Update / Get / GetList / Delete for any [`Repository`].

use std::marker::PhantomData;

use uuid::Uuid;

use crate::client::{GenericClient, StreamingClient};
use crate::entity::Repository;
use crate::error::{KycError, KycResult};
use crate::qb::QueryBuilder;
use crate::reply::Reply;
use crate::service::Database;
use crate::service::stream::{self, ItemSink, StreamSummary};
use crate::validate;

/// Fetch one record by id; a miss is reported as `"{entity} {id}"`.
pub async fn get_record<R: Repository>(conn: &impl GenericClient, id: Uuid) -> KycResult<R::Record> {
    R::build_get_one(id)
        .fetch_one_strict::<R::Record>(conn)
        .await
        .map_err(|e| if e.is_not_found() { R::not_found(id) } else { e })
}

/// Outcome of a soft delete, from the row the UPDATE returned and, when it
/// returned none, the row as it is now.
///
/// Deleting a row that is already terminal is a `Validation` error; deleting a
/// missing row is `NotFound`.
pub fn settle_delete<R: Repository>(
    id: Uuid,
    deleted: Option<R::Record>,
    current: Option<R::Record>,
) -> KycResult<R::Record> {
    match (deleted, current) {
        (Some(record), _) => Ok(record),
        (None, Some(current)) => Err(KycError::validation(format!(
            "{} {} is already deleted ({})",
            R::ENTITY,
            R::record_id(&current),
            R::record_status(&current).as_str()
        ))),
        (None, None) => Err(R::not_found(id)),
    }
}

/// Run a soft delete built by [`Repository::build_delete`]. The row is only
/// read back when the UPDATE matched nothing.
pub async fn delete_record<R: Repository>(
    conn: &impl GenericClient,
    id: Uuid,
    delete: &QueryBuilder,
) -> KycResult<R::Record> {
    let deleted = delete.fetch_opt::<R::Record>(conn).await?;
    if deleted.is_some() {
        return settle_delete::<R>(id, deleted, None);
    }
    let current = R::build_get_one(id).fetch_opt::<R::Record>(conn).await?;
    settle_delete::<R>(id, None, current)
}

/// Stream every record matching `filter` into `sink`.
pub async fn list_records<R, K>(
    conn: &impl StreamingClient,
    filter: &R::Filter,
    sink: &K,
) -> KycResult<StreamSummary>
where
    R: Repository,
    K: ItemSink<R::Record>,
{
    let rows = R::build_get_list(filter).stream(conn).await?;
    stream::forward(rows, R::scan_one, sink).await
}

/// Service for one table.
pub struct EntityService<R> {
    db: Database,
    _repo: PhantomData<fn() -> R>,
}

impl<R> Clone for EntityService<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _repo: PhantomData,
        }
    }
}

impl<R: Repository> EntityService<R> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _repo: PhantomData,
        }
    }

    fn reply<T>(op: &str, result: KycResult<T>) -> Reply<T> {
        let result = result.map_err(|e| e.context(format!("{}.{op}", R::ENTITY)));
        Reply::from_result(R::PACKAGE, result)
    }

    pub async fn create(&self, req: &R::Create) -> Reply<R::Record> {
        let result = match R::build_insert(req) {
            Ok((_, qb)) => {
                self.db
                    .bounded(async {
                        let client = self.db.client().await?;
                        qb.fetch_one::<R::Record>(&client).await
                    })
                    .await
            }
            Err(e) => Err(e),
        };
        Self::reply("create", result)
    }

    pub async fn update(&self, req: &R::Update) -> Reply<R::Record> {
        let id = R::update_id(req);
        let result = match R::build_update(req) {
            Ok(qb) => {
                self.db
                    .bounded(async {
                        let client = self.db.client().await?;
                        qb.fetch_opt::<R::Record>(&client)
                            .await?
                            .ok_or_else(|| R::not_found(id))
                    })
                    .await
            }
            Err(e) => Err(e),
        };
        Self::reply("update", result)
    }

    pub async fn get(&self, id: Uuid) -> Reply<R::Record> {
        let result = match validate::require_id(&format!("{} id", R::ENTITY), id) {
            Ok(()) => {
                self.db
                    .bounded(async {
                        let client = self.db.client().await?;
                        get_record::<R>(&client, id).await
                    })
                    .await
            }
            Err(e) => Err(e),
        };
        Self::reply("get", result)
    }

    /// Stream matching records into `sink`. Items the sink refuses are skipped;
    /// a row that cannot be decoded ends the stream with an error.
    pub async fn get_list<K: ItemSink<R::Record>>(
        &self,
        filter: &R::Filter,
        sink: &K,
    ) -> Reply<StreamSummary> {
        let result = self
            .db
            .bounded(async {
                let client = self.db.client().await?;
                list_records::<R, K>(&client, filter, sink).await
            })
            .await;
        Self::reply("get_list", result)
    }

    pub async fn delete(&self, id: Uuid) -> Reply<R::Record> {
        let result = match R::build_delete(id) {
            Ok(qb) => {
                self.db
                    .bounded(async {
                        let client = self.db.client().await?;
                        delete_record::<R>(&client, id, &qb).await
                    })
                    .await
            }
            Err(e) => Err(e),
        };
        Self::reply("delete", result)
    }
}
