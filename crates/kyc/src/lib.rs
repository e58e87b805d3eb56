//! # kyc
//!
//! Storage layer of a KYC user-profile graph on PostgreSQL / CockroachDB.
//!
//! ## Features
//!
//! - **Query builder**: filter, update and insert fragments written with `?`
//!   markers, numbered `$1..$n` in one pass when the statement is generated
//! - **Repositories**: one per table, building statements without touching the
//!   database
//! - **Aggregate operations**: attach contacts, incomes and addresses to a user
//!   under labels, or set their sub-profiles, in a single transaction
//! - **Typed replies**: every service operation returns a success payload or an
//!   error with a code from a closed set
//!
//! ## Example
//!
//! ```ignore
//! use kyc::service::{Database, KycServices, ServiceOptions};
//! use kyc::aggregate::LinkItem;
//!
//! let pool = kyc::create_pool("postgres://kyc@localhost/kyc")?;
//! let services = KycServices::new(Database::new(pool, ServiceOptions::default()));
//!
//! let reply = services
//!     .user_ids
//!     .add_contacts(user_id, &[LinkItem::new_value("home", new_contact)])
//!     .await;
//! ```

pub mod aggregate;
pub mod client;
pub mod entity;
pub mod error;
pub mod qb;
pub mod reply;
pub mod row;
pub mod trace;
pub mod transaction;
pub mod validate;

pub use client::{GenericClient, RowStream, StreamingClient};
pub use entity::{Labeled, Repository, Status};
pub use error::{KycError, KycResult};
pub use qb::{BuiltQuery, Dialect, Param, QueryBuilder};
pub use reply::{ErrorCode, Reply, ServiceError};
pub use row::{FromRow, RowExt};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub mod service;

#[cfg(feature = "pool")]
pub use pool::{DEFAULT_MAX_CONNECTIONS, create_pool, create_pool_with_config};

#[cfg(test)]
mod test_support;

// Used by the exported transaction macros.
#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
