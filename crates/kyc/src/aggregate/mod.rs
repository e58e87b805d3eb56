//! Multi-statement operations on the `UserId` aggregate.
//!
//! Every function here takes the caller's transaction as a [`GenericClient`] and
//! stops at the first failing statement; committing or rolling back is left to
//! the caller. The first statement always locks the user row, so concurrent
//! changes to the same user are serialized.

pub mod links;
pub mod profile;

use uuid::Uuid;

use crate::client::GenericClient;
use crate::entity::{Repository, UserIdRepo};
use crate::error::KycResult;

pub use links::{BatchMode, Intent, LinkChange, LinkItem, LinkPlan, LinkTarget, ModifyParams};
pub use profile::{CredentialProfile, PhysiqueProfile, ProfileKind, SocialProfile};

/// Lock a live user row; a missing or terminal user is `NotFound`.
pub(crate) async fn lock_user(conn: &impl GenericClient, user_id: Uuid) -> KycResult<()> {
    let locked = UserIdRepo::build_lock_live(user_id).execute(conn).await?;
    if locked == 0 {
        return Err(UserIdRepo::not_found(user_id));
    }
    Ok(())
}
