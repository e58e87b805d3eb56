//! Pool-backed services: one per table plus the `UserId` aggregate.
//!
//! Services are built once at startup from a [`Database`] handle and shared by
//! reference; they hold no per-request state. Every operation returns a
//! [`Reply`](crate::reply::Reply) instead of a bare error.

mod entity;
pub mod stream;
mod user_id;

use std::future::Future;
use std::time::Duration;

use deadpool_postgres::Pool;

use crate::entity::{AddressRepo, ContactRepo, CredentialRepo, IncomeRepo, PhysiqueRepo, SocialRepo};
use crate::error::{KycError, KycResult};
use crate::qb::Dialect;

pub use entity::{EntityService, delete_record, get_record, list_records, settle_delete};
pub use stream::{ItemSink, StreamSummary};
pub use user_id::UserIdService;

/// Knobs shared by every service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub dialect: Dialect,
    /// Extra attempts for a transaction aborted by a serialization failure.
    pub max_retries: u32,
    /// Upper bound for one request, pool wait included.
    pub request_timeout: Option<Duration>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            max_retries: 3,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Shared pool handle plus the options requests run with.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
    options: ServiceOptions,
}

impl Database {
    pub fn new(pool: Pool, options: ServiceOptions) -> Self {
        Self { pool, options }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Borrow a connection for the duration of one request.
    pub async fn client(&self) -> KycResult<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }

    /// Run `fut` under the request timeout, if one is configured.
    ///
    /// On timeout the future is dropped, which drops any open transaction and
    /// rolls it back.
    pub async fn bounded<T>(&self, fut: impl Future<Output = KycResult<T>>) -> KycResult<T> {
        match self.options.request_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| KycError::Timeout(limit))?,
            None => fut.await,
        }
    }
}

/// The whole service graph.
pub struct KycServices {
    pub contacts: EntityService<ContactRepo>,
    pub incomes: EntityService<IncomeRepo>,
    pub credentials: EntityService<CredentialRepo>,
    pub physiques: EntityService<PhysiqueRepo>,
    pub socials: EntityService<SocialRepo>,
    pub addresses: EntityService<AddressRepo>,
    pub user_ids: UserIdService,
}

impl KycServices {
    pub fn new(db: Database) -> Self {
        Self {
            contacts: EntityService::new(db.clone()),
            incomes: EntityService::new(db.clone()),
            credentials: EntityService::new(db.clone()),
            physiques: EntityService::new(db.clone()),
            socials: EntityService::new(db.clone()),
            addresses: EntityService::new(db.clone()),
            user_ids: UserIdService::new(db),
        }
    }
}
