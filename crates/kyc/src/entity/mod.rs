//! Records of the profile graph and the repositories that build their statements.
//!
//! Each table has a record type (`Contact`), a creation request (`NewContact`), an
//! update request with optional fields (`ContactUpdate`), a list filter and a unit
//! struct implementing [`Repository`].

mod address;
mod contact;
mod credential;
mod income;
mod link;
mod physique;
mod repository;
mod social;
mod status;
mod user_id;

pub use address::{Address, AddressFilter, AddressLocation, AddressRepo, AddressUpdate, NewAddress};
pub use contact::{Contact, ContactFilter, ContactRepo, ContactType, ContactUpdate, NewContact};
pub use credential::{Credential, CredentialFilter, CredentialRepo, CredentialUpdate, NewCredential};
pub use income::{Income, IncomeAmount, IncomeFilter, IncomeRepo, IncomeUpdate, NewIncome};
pub use link::{AddressLinks, ContactLinks, IncomeLinks, LinkKind, LinkRow};
pub use physique::{NewPhysique, Physique, PhysiqueFilter, PhysiqueRepo, PhysiqueUpdate};
pub use repository::{ListFilter, Repository};
pub use social::{NewSocial, Social, SocialFilter, SocialRepo, SocialUpdate};
pub use status::Status;
pub use user_id::{NewUserId, UserId, UserIdFilter, UserIdRepo, UserIdUpdate};

use serde::{Deserialize, Serialize};

/// A record reached through a linking table, with the link's label and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labeled<T> {
    pub label: String,
    pub status: Status,
    pub item: T,
}
