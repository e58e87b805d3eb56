//! Dynamic SQL construction.
//!
//! One [`QueryBuilder`] per statement, composed of three fragments:
//!
//! - a conjunctive filter list (`WHERE`)
//! - a SET-assignment list (`UPDATE`, `ON CONFLICT ... DO UPDATE`)
//! - an ordered field list with value tuples (`INSERT`, `UPSERT`)
//!
//! Fragments are written with `?` markers and numbered in a single pass when the
//! statement is generated, so values appended by different fragments always bind
//! in the order they appear in the final SQL.
//!
//! ```ignore
//! use kyc::qb::QueryBuilder;
//!
//! let contacts: Vec<Contact> = QueryBuilder::select("contacts")
//!     .filter_in("status", vec!["active", "validated"])
//!     .order_by("value")
//!     .limit(20)
//!     .fetch_all(&client)
//!     .await?;
//! ```

mod builder;
mod built;
mod fragment;
mod param;
mod placeholder;

pub use builder::{Dialect, QueryBuilder, QueryKind};
pub use built::BuiltQuery;
pub use fragment::{FilterBracket, InsertBracket, UpdateBracket, UpdateValue};
pub use param::{Param, ParamList};
pub use placeholder::number_placeholders;
