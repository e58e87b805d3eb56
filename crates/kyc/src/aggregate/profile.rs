//! SetCredential / SetPhysique / SetSocial: write a sub-profile and point the
//! user at it, in one transaction.

use uuid::Uuid;

use crate::aggregate::lock_user;
use crate::client::GenericClient;
use crate::entity::{CredentialRepo, PhysiqueRepo, Repository, SocialRepo, Status, UserIdRepo};
use crate::error::KycResult;
use crate::qb::QueryBuilder;
use crate::validate;

/// A sub-profile referenced by a foreign key of `user_ids`.
pub trait ProfileKind: Send + Sync + 'static {
    type Target: Repository;

    /// Column of `user_ids` holding the reference.
    const REFERENCE_COLUMN: &'static str;

    /// Overwrite the live sub-profile the user currently references, if any.
    fn build_replace_current(
        user_id: Uuid,
        req: &<Self::Target as Repository>::Create,
    ) -> KycResult<QueryBuilder> {
        let table = <Self::Target as Repository>::TABLE;
        let returning: Vec<String> = <Self::Target as Repository>::COLUMNS
            .iter()
            .map(|c| format!("{table}.{c}"))
            .collect();
        let returning: Vec<&str> = returning.iter().map(String::as_str).collect();
        let qb = <Self::Target as Repository>::apply_replace(QueryBuilder::update(table), req)?;
        Ok(qb
            .update_from(&format!("{} u", UserIdRepo::TABLE))
            .filter(&format!("{table}.id = u.{}", Self::REFERENCE_COLUMN), vec![])
            .filter_eq("u.id", user_id)
            .filter_not_in(&format!("{table}.status"), Status::terminal_values())
            .returning(&returning))
    }
}

pub struct CredentialProfile;

impl ProfileKind for CredentialProfile {
    type Target = CredentialRepo;
    const REFERENCE_COLUMN: &'static str = "credential_id";
}

pub struct PhysiqueProfile;

impl ProfileKind for PhysiqueProfile {
    type Target = PhysiqueRepo;
    const REFERENCE_COLUMN: &'static str = "physique_id";
}

pub struct SocialProfile;

impl ProfileKind for SocialProfile {
    type Target = SocialRepo;
    const REFERENCE_COLUMN: &'static str = "social_id";
}

pub fn check_profile<P: ProfileKind>(
    user_id: Uuid,
    req: &<P::Target as Repository>::Create,
) -> KycResult<()> {
    validate::require_id("user id", user_id)?;
    <P::Target as Repository>::validate_create(req)
}

/// Update the referenced sub-profile in place when it is live; otherwise create
/// a new one and move the reference to it.
pub async fn set_profile<P: ProfileKind>(
    conn: &impl GenericClient,
    user_id: Uuid,
    req: &<P::Target as Repository>::Create,
) -> KycResult<<P::Target as Repository>::Record> {
    lock_user(conn, user_id).await?;

    let replaced = P::build_replace_current(user_id, req)?
        .fetch_opt::<<P::Target as Repository>::Record>(conn)
        .await?;
    if let Some(record) = replaced {
        return Ok(record);
    }

    let (id, qb) = <P::Target as Repository>::build_insert(req)?;
    let record = qb
        .fetch_one::<<P::Target as Repository>::Record>(conn)
        .await?;
    let moved = UserIdRepo::build_set_reference(user_id, P::REFERENCE_COLUMN, id)
        .execute(conn)
        .await?;
    if moved == 0 {
        return Err(UserIdRepo::not_found(user_id));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::NewSocial;
    use crate::test_support::RecordingClient;

    fn single() -> NewSocial {
        NewSocial {
            marital_status: "single".into(),
            occupation: Some("engineer".into()),
            employer: None,
        }
    }

    #[test]
    fn replace_goes_through_the_user_reference() {
        let built = SocialProfile::build_replace_current(Uuid::new_v4(), &single())
            .unwrap()
            .generate_sql()
            .unwrap();
        assert_eq!(
            built.sql,
            "UPDATE socials SET marital_status = $1, occupation = $2, employer = $3 \
             FROM user_ids u WHERE socials.id = u.social_id AND u.id = $4 \
             AND socials.status NOT IN ($5, $6) \
             RETURNING socials.id, socials.marital_status, socials.occupation, \
             socials.employer, socials.status"
        );
    }

    #[test]
    fn invalid_profile_is_rejected_up_front() {
        let mut req = single();
        req.marital_status = String::new();
        assert!(check_profile::<SocialProfile>(Uuid::new_v4(), &req).is_err());
        assert!(check_profile::<SocialProfile>(Uuid::nil(), &single()).is_err());
    }

    #[tokio::test]
    async fn unknown_user_stops_before_any_write() {
        let client = RecordingClient::new().affected(0);
        let err = set_profile::<SocialProfile>(&client, Uuid::new_v4(), &single())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(client.statements().len(), 1);
    }

    #[tokio::test]
    async fn without_live_profile_a_new_one_is_inserted() {
        let client = RecordingClient::new();
        // The insert returns no row here, which surfaces as NotFound.
        let err = set_profile::<SocialProfile>(&client, Uuid::new_v4(), &single())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let sql = client.sql();
        assert_eq!(sql.len(), 3);
        assert!(sql[1].starts_with("UPDATE socials SET"));
        assert!(sql[2].starts_with("INSERT INTO socials"));
    }

    #[tokio::test]
    async fn failing_replace_aborts() {
        let client = RecordingClient::new().fail_at(2);
        let err = set_profile::<SocialProfile>(&client, Uuid::new_v4(), &single())
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(client.statements().len(), 2);
    }
}
