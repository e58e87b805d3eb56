//! The `UserId` aggregate: plain CRUD plus the multi-statement operations that
//! attach contacts, incomes, addresses and sub-profiles to a user.
//!
//! Request checks run before a connection is borrowed. Each write then runs in
//! one transaction, re-run from the start on serialization failures.

use uuid::Uuid;

use crate::aggregate::links::{self, BatchMode, LinkChange, LinkItem, TargetCreate, TargetRecord};
use crate::aggregate::profile::{self, ProfileKind};
use crate::aggregate::{CredentialProfile, PhysiqueProfile, SocialProfile};
use crate::entity::{
    Address, AddressLinks, Contact, ContactLinks, Credential, Income, IncomeLinks, Labeled,
    LinkKind, LinkRow, NewAddress, NewContact, NewCredential, NewIncome, NewPhysique, NewSocial,
    NewUserId, Physique, Repository, Social, UserId, UserIdFilter, UserIdRepo, UserIdUpdate,
};
use crate::error::KycResult;
use crate::reply::Reply;
use crate::service::stream::{ItemSink, StreamSummary};
use crate::service::{Database, EntityService};
use crate::validate;

#[derive(Clone)]
pub struct UserIdService {
    db: Database,
    crud: EntityService<UserIdRepo>,
}

impl UserIdService {
    pub fn new(db: Database) -> Self {
        Self {
            crud: EntityService::new(db.clone()),
            db,
        }
    }

    fn reply<T>(op: &str, result: KycResult<T>) -> Reply<T> {
        let result = result.map_err(|e| e.context(format!("{}.{op}", UserIdRepo::ENTITY)));
        Reply::from_result(UserIdRepo::PACKAGE, result)
    }

    // ===== plain CRUD =====

    pub async fn create(&self, req: &NewUserId) -> Reply<UserId> {
        self.crud.create(req).await
    }

    pub async fn update(&self, req: &UserIdUpdate) -> Reply<UserId> {
        self.crud.update(req).await
    }

    pub async fn get(&self, id: Uuid) -> Reply<UserId> {
        self.crud.get(id).await
    }

    pub async fn get_list<K: ItemSink<UserId>>(
        &self,
        filter: &UserIdFilter,
        sink: &K,
    ) -> Reply<StreamSummary> {
        self.crud.get_list(filter, sink).await
    }

    pub async fn delete(&self, id: Uuid) -> Reply<UserId> {
        self.crud.delete(id).await
    }

    // ===== generic aggregate steps =====

    async fn modify<K: LinkKind>(
        &self,
        mode: BatchMode,
        user_id: Uuid,
        items: &[LinkItem<TargetCreate<K>>],
    ) -> KycResult<Vec<Labeled<TargetRecord<K>>>> {
        links::check_batch::<K>(user_id, items)?;
        tracing::debug!(
            target: "kyc.service",
            link_table = K::LINK_TABLE,
            ?mode,
            %user_id,
            items = items.len(),
            "modifying links"
        );
        let options = *self.db.options();
        self.db
            .bounded(async {
                let mut client = self.db.client().await?;
                crate::transaction_with_retry!(&mut client, options.max_retries, tx, {
                    links::modify_links::<K>(&tx, options.dialect, mode, user_id, items).await
                })
            })
            .await
    }

    async fn change<K: LinkKind>(
        &self,
        user_id: Uuid,
        change: &LinkChange<TargetCreate<K>>,
    ) -> KycResult<Labeled<TargetRecord<K>>> {
        links::check_change::<K>(user_id, change)?;
        let max_retries = self.db.options().max_retries;
        self.db
            .bounded(async {
                let mut client = self.db.client().await?;
                crate::transaction_with_retry!(&mut client, max_retries, tx, {
                    links::update_link::<K>(&tx, user_id, change).await
                })
            })
            .await
    }

    async fn remove<K: LinkKind>(&self, user_id: Uuid, labels: &[String]) -> KycResult<Vec<LinkRow>> {
        links::check_labels(user_id, labels)?;
        let max_retries = self.db.options().max_retries;
        self.db
            .bounded(async {
                let mut client = self.db.client().await?;
                crate::transaction_with_retry!(&mut client, max_retries, tx, {
                    links::remove_links::<K>(&tx, user_id, labels).await
                })
            })
            .await
    }

    async fn labeled<K: LinkKind>(&self, user_id: Uuid) -> KycResult<Vec<Labeled<TargetRecord<K>>>> {
        validate::require_id("user id", user_id)?;
        self.db
            .bounded(async {
                let client = self.db.client().await?;
                links::get_labeled::<K>(&client, user_id).await
            })
            .await
    }

    async fn set_profile<P: ProfileKind>(
        &self,
        user_id: Uuid,
        req: &<P::Target as Repository>::Create,
    ) -> KycResult<<P::Target as Repository>::Record> {
        profile::check_profile::<P>(user_id, req)?;
        let max_retries = self.db.options().max_retries;
        self.db
            .bounded(async {
                let mut client = self.db.client().await?;
                crate::transaction_with_retry!(&mut client, max_retries, tx, {
                    profile::set_profile::<P>(&tx, user_id, req).await
                })
            })
            .await
    }

    // ===== contacts =====

    pub async fn add_contacts(
        &self,
        user_id: Uuid,
        items: &[LinkItem<NewContact>],
    ) -> Reply<Vec<Labeled<Contact>>> {
        let result = self.modify::<ContactLinks>(BatchMode::Add, user_id, items).await;
        Self::reply("add_contacts", result)
    }

    pub async fn set_contacts(
        &self,
        user_id: Uuid,
        items: &[LinkItem<NewContact>],
    ) -> Reply<Vec<Labeled<Contact>>> {
        let result = self.modify::<ContactLinks>(BatchMode::Set, user_id, items).await;
        Self::reply("set_contacts", result)
    }

    pub async fn update_contact(
        &self,
        user_id: Uuid,
        change: &LinkChange<NewContact>,
    ) -> Reply<Labeled<Contact>> {
        let result = self.change::<ContactLinks>(user_id, change).await;
        Self::reply("update_contact", result)
    }

    pub async fn remove_contacts(&self, user_id: Uuid, labels: &[String]) -> Reply<Vec<LinkRow>> {
        let result = self.remove::<ContactLinks>(user_id, labels).await;
        Self::reply("remove_contacts", result)
    }

    pub async fn get_labeled_contacts(&self, user_id: Uuid) -> Reply<Vec<Labeled<Contact>>> {
        let result = self.labeled::<ContactLinks>(user_id).await;
        Self::reply("get_labeled_contacts", result)
    }

    // ===== incomes =====

    pub async fn add_incomes(
        &self,
        user_id: Uuid,
        items: &[LinkItem<NewIncome>],
    ) -> Reply<Vec<Labeled<Income>>> {
        let result = self.modify::<IncomeLinks>(BatchMode::Add, user_id, items).await;
        Self::reply("add_incomes", result)
    }

    pub async fn set_incomes(
        &self,
        user_id: Uuid,
        items: &[LinkItem<NewIncome>],
    ) -> Reply<Vec<Labeled<Income>>> {
        let result = self.modify::<IncomeLinks>(BatchMode::Set, user_id, items).await;
        Self::reply("set_incomes", result)
    }

    pub async fn update_income(
        &self,
        user_id: Uuid,
        change: &LinkChange<NewIncome>,
    ) -> Reply<Labeled<Income>> {
        let result = self.change::<IncomeLinks>(user_id, change).await;
        Self::reply("update_income", result)
    }

    pub async fn remove_incomes(&self, user_id: Uuid, labels: &[String]) -> Reply<Vec<LinkRow>> {
        let result = self.remove::<IncomeLinks>(user_id, labels).await;
        Self::reply("remove_incomes", result)
    }

    pub async fn get_labeled_incomes(&self, user_id: Uuid) -> Reply<Vec<Labeled<Income>>> {
        let result = self.labeled::<IncomeLinks>(user_id).await;
        Self::reply("get_labeled_incomes", result)
    }

    // ===== addresses =====

    pub async fn add_addresses(
        &self,
        user_id: Uuid,
        items: &[LinkItem<NewAddress>],
    ) -> Reply<Vec<Labeled<Address>>> {
        let result = self.modify::<AddressLinks>(BatchMode::Add, user_id, items).await;
        Self::reply("add_addresses", result)
    }

    pub async fn set_addresses(
        &self,
        user_id: Uuid,
        items: &[LinkItem<NewAddress>],
    ) -> Reply<Vec<Labeled<Address>>> {
        let result = self.modify::<AddressLinks>(BatchMode::Set, user_id, items).await;
        Self::reply("set_addresses", result)
    }

    pub async fn update_address(
        &self,
        user_id: Uuid,
        change: &LinkChange<NewAddress>,
    ) -> Reply<Labeled<Address>> {
        let result = self.change::<AddressLinks>(user_id, change).await;
        Self::reply("update_address", result)
    }

    pub async fn remove_addresses(&self, user_id: Uuid, labels: &[String]) -> Reply<Vec<LinkRow>> {
        let result = self.remove::<AddressLinks>(user_id, labels).await;
        Self::reply("remove_addresses", result)
    }

    pub async fn get_labeled_addresses(&self, user_id: Uuid) -> Reply<Vec<Labeled<Address>>> {
        let result = self.labeled::<AddressLinks>(user_id).await;
        Self::reply("get_labeled_addresses", result)
    }

    // ===== sub-profiles =====

    pub async fn set_credential(&self, user_id: Uuid, req: &NewCredential) -> Reply<Credential> {
        let result = self.set_profile::<CredentialProfile>(user_id, req).await;
        Self::reply("set_credential", result)
    }

    pub async fn set_physique(&self, user_id: Uuid, req: &NewPhysique) -> Reply<Physique> {
        let result = self.set_profile::<PhysiqueProfile>(user_id, req).await;
        Self::reply("set_physique", result)
    }

    pub async fn set_social(&self, user_id: Uuid, req: &NewSocial) -> Reply<Social> {
        let result = self.set_profile::<SocialProfile>(user_id, req).await;
        Self::reply("set_social", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ContactType;
    use crate::pool::create_pool;
    use crate::reply::ErrorCode;
    use crate::service::ServiceOptions;

    /// A pool that is never connected: every test below fails before a
    /// connection is requested.
    fn service() -> UserIdService {
        let pool = create_pool("postgres://kyc@localhost/kyc").unwrap();
        UserIdService::new(Database::new(pool, ServiceOptions::default()))
    }

    fn email(value: &str) -> NewContact {
        NewContact {
            contact_type: ContactType::Email,
            value: value.into(),
        }
    }

    #[tokio::test]
    async fn empty_batch_is_invalid_argument() {
        let reply = service().add_contacts(Uuid::new_v4(), &[]).await;
        let err = reply.error().unwrap();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.package, "kyc.user_ids");
        assert!(err.text.contains("user.add_contacts"));
    }

    #[tokio::test]
    async fn duplicate_labels_are_rejected_before_the_transaction() {
        let items = vec![
            LinkItem::new_value("home", email("a@example.com")),
            LinkItem::new_value("home", email("b@example.com")),
        ];
        let reply = service().set_contacts(Uuid::new_v4(), &items).await;
        assert_eq!(reply.code(), Some(ErrorCode::InvalidArgument));
        assert!(reply.error().unwrap().text.contains("duplicate label 'home'"));
    }

    #[tokio::test]
    async fn change_without_anything_to_change() {
        let change = LinkChange::<NewContact> {
            label: "home".into(),
            target: None,
            status: None,
        };
        let reply = service().update_contact(Uuid::new_v4(), &change).await;
        assert_eq!(reply.code(), Some(ErrorCode::InvalidArgument));
        assert!(reply.error().unwrap().text.contains(validate::NOTHING_TO_UPDATE));
    }

    #[tokio::test]
    async fn remove_needs_labels() {
        let reply = service().remove_incomes(Uuid::new_v4(), &[]).await;
        assert_eq!(reply.code(), Some(ErrorCode::InvalidArgument));
    }

    #[tokio::test]
    async fn nil_user_is_rejected_everywhere() {
        let service = service();
        assert_eq!(
            service.get_labeled_addresses(Uuid::nil()).await.code(),
            Some(ErrorCode::InvalidArgument)
        );
        assert_eq!(service.get(Uuid::nil()).await.code(), Some(ErrorCode::InvalidArgument));
        assert_eq!(service.delete(Uuid::nil()).await.code(), Some(ErrorCode::InvalidArgument));
    }
}
