//! Batch changes to a user's labeled relations (contacts, incomes, addresses).
//!
//! Each operation is split in three steps so that the decisions can be checked
//! without a database:
//!
//! 1. [`classify`] turns request items and the user's live links into
//!    [`ModifyParams`], rejecting conflicts.
//! 2. [`plan`] turns those into builders, ordered by dependency.
//! 3. [`LinkPlan::run`] executes them on the caller's transaction.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::lock_user;
use crate::client::GenericClient;
use crate::entity::{Labeled, LinkKind, LinkRow, Repository, Status};
use crate::error::{KycError, KycResult};
use crate::qb::{Dialect, QueryBuilder};
use crate::validate;

pub type TargetCreate<K> = <<K as LinkKind>::Target as Repository>::Create;
pub type TargetRecord<K> = <<K as LinkKind>::Target as Repository>::Record;

/// What a label should point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget<C> {
    /// An entity that already exists.
    Existing(Uuid),
    /// An entity created in the same transaction.
    New(C),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkItem<C> {
    pub label: String,
    pub target: LinkTarget<C>,
}

impl<C> LinkItem<C> {
    pub fn existing(label: impl Into<String>, id: Uuid) -> Self {
        Self {
            label: label.into(),
            target: LinkTarget::Existing(id),
        }
    }

    pub fn new_value(label: impl Into<String>, value: C) -> Self {
        Self {
            label: label.into(),
            target: LinkTarget::New(value),
        }
    }
}

/// Change to one live link, addressed by its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkChange<C> {
    pub label: String,
    pub target: Option<LinkTarget<C>>,
    pub status: Option<Status>,
}

/// `Add` fails on labels already in use; `Set` updates them instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Add,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Add,
    Update,
}

/// One classified item of a batch.
#[derive(Debug, PartialEq)]
pub struct ModifyParams<'a, C> {
    pub intent: Intent,
    pub label: &'a str,
    pub target_id: Uuid,
    /// Set when the target has to be created first, under `target_id`.
    pub new_value: Option<&'a C>,
}

/// Checks that need neither the database nor the user's current links.
pub fn check_batch<K: LinkKind>(user_id: Uuid, items: &[LinkItem<TargetCreate<K>>]) -> KycResult<()> {
    let entity = <K::Target as Repository>::ENTITY;
    validate::require_id("user id", user_id)?;
    validate::require_items(entity, items)?;
    for item in items {
        validate::require_text("label", &item.label)?;
        match &item.target {
            LinkTarget::Existing(id) => validate::require_id(&format!("{entity} id"), *id)?,
            LinkTarget::New(value) => <K::Target as Repository>::validate_create(value)?,
        }
    }
    validate::reject_duplicates("label", items.iter().map(|i| &i.label))?;
    let ids: Vec<Uuid> = items
        .iter()
        .filter_map(|i| match i.target {
            LinkTarget::Existing(id) => Some(id),
            LinkTarget::New(_) => None,
        })
        .collect();
    validate::reject_duplicates(&format!("{entity} id"), ids.iter())
}

pub fn check_change<K: LinkKind>(user_id: Uuid, change: &LinkChange<TargetCreate<K>>) -> KycResult<()> {
    validate::require_id("user id", user_id)?;
    validate::require_text("label", &change.label)?;
    validate::require_change(change.target.is_some() || change.status.is_some())?;
    match &change.target {
        Some(LinkTarget::Existing(id)) => {
            validate::require_id(&format!("{} id", <K::Target as Repository>::ENTITY), *id)
        }
        Some(LinkTarget::New(value)) => <K::Target as Repository>::validate_create(value),
        None => Ok(()),
    }
}

pub fn check_labels(user_id: Uuid, labels: &[String]) -> KycResult<()> {
    validate::require_id("user id", user_id)?;
    validate::require_items("label", labels)?;
    for label in labels {
        validate::require_text("label", label)?;
    }
    validate::reject_duplicates("label", labels.iter())
}

/// Fails when `id` stays linked under another label once the batch is applied.
/// Live links whose label is in `rewritten` are repointed by the same batch and
/// do not count.
fn linked_elsewhere<K: LinkKind>(
    live: &[LinkRow],
    rewritten: &[&str],
    id: Uuid,
    label: &str,
) -> KycResult<()> {
    let conflict = live.iter().find(|l| {
        l.target_id == id && l.label != label && !rewritten.contains(&l.label.as_str())
    });
    match conflict {
        Some(other) => Err(KycError::validation(format!(
            "{} {id} is already linked as '{}'",
            <K::Target as Repository>::ENTITY,
            other.label
        ))),
        None => Ok(()),
    }
}

/// Route every item to an insert or an update of its link. New targets get their
/// id here, before any statement runs.
pub fn classify<'a, K: LinkKind>(
    mode: BatchMode,
    items: &'a [LinkItem<TargetCreate<K>>],
    live: &[LinkRow],
) -> KycResult<Vec<ModifyParams<'a, TargetCreate<K>>>> {
    let rewritten: Vec<&str> = match mode {
        BatchMode::Add => Vec::new(),
        BatchMode::Set => items.iter().map(|i| i.label.as_str()).collect(),
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let in_use = live.iter().any(|l| l.label == item.label);
        let intent = match (mode, in_use) {
            (BatchMode::Add, true) => {
                return Err(KycError::validation(format!(
                    "label '{}' is already in use",
                    item.label
                )));
            }
            (BatchMode::Set, true) => Intent::Update,
            (_, false) => Intent::Add,
        };
        let (target_id, new_value) = match &item.target {
            LinkTarget::Existing(id) => {
                linked_elsewhere::<K>(live, &rewritten, *id, &item.label)?;
                (*id, None)
            }
            LinkTarget::New(value) => (Uuid::new_v4(), Some(value)),
        };
        out.push(ModifyParams {
            intent,
            label: &item.label,
            target_id,
            new_value,
        });
    }
    Ok(out)
}

/// Statements of one batch, in execution order.
#[derive(Debug)]
pub struct LinkPlan {
    pub create_targets: Option<QueryBuilder>,
    pub insert_links: Option<QueryBuilder>,
    pub update_links: Vec<(String, QueryBuilder)>,
    /// `(label, target)` for every item, in request order.
    pub targets: Vec<(String, Uuid)>,
}

pub fn plan<K: LinkKind>(
    dialect: Dialect,
    user_id: Uuid,
    params: &[ModifyParams<'_, TargetCreate<K>>],
) -> KycResult<LinkPlan> {
    let new_targets: Vec<(Uuid, &TargetCreate<K>)> = params
        .iter()
        .filter_map(|p| p.new_value.map(|v| (p.target_id, v)))
        .collect();
    let create_targets = if new_targets.is_empty() {
        None
    } else {
        Some(<K::Target as Repository>::build_insert_many(&new_targets)?)
    };

    let added: Vec<(&str, Uuid)> = params
        .iter()
        .filter(|p| p.intent == Intent::Add)
        .map(|p| (p.label, p.target_id))
        .collect();
    let insert_links = if added.is_empty() {
        None
    } else {
        Some(K::build_insert_links(dialect, user_id, &added)?)
    };

    let update_links = params
        .iter()
        .filter(|p| p.intent == Intent::Update)
        .map(|p| {
            let qb = K::build_update_link(user_id, p.label, Some(p.target_id), None);
            (p.label.to_string(), qb)
        })
        .collect();

    Ok(LinkPlan {
        create_targets,
        insert_links,
        update_links,
        targets: params
            .iter()
            .map(|p| (p.label.to_string(), p.target_id))
            .collect(),
    })
}

impl LinkPlan {
    /// Targets first, then new links, then link updates. Stops at the first
    /// failure; the caller's transaction discards what ran before it.
    pub async fn run<K: LinkKind>(&self, conn: &impl GenericClient) -> KycResult<Vec<LinkRow>> {
        if let Some(qb) = &self.create_targets {
            qb.execute(conn).await?;
        }
        let mut links = Vec::with_capacity(self.targets.len());
        if let Some(qb) = &self.insert_links {
            links.extend(qb.fetch_all::<LinkRow>(conn).await?);
        }
        for (label, qb) in &self.update_links {
            match qb.fetch_opt::<LinkRow>(conn).await? {
                Some(link) => links.push(link),
                None => return Err(K::label_not_found(label)),
            }
        }
        Ok(links)
    }

    pub fn target_ids(&self) -> Vec<Uuid> {
        self.targets.iter().map(|(_, id)| *id).collect()
    }
}

/// Pair every requested label with its written link and target record.
pub fn merge<K: LinkKind>(
    targets: &[(String, Uuid)],
    links: &[LinkRow],
    records: &[TargetRecord<K>],
) -> KycResult<Vec<Labeled<TargetRecord<K>>>> {
    targets
        .iter()
        .map(|(label, id)| {
            let link = links
                .iter()
                .find(|l| &l.label == label)
                .ok_or_else(|| KycError::Other(format!("link '{label}' was not written")))?;
            let item = records
                .iter()
                .find(|r| <K::Target as Repository>::record_id(r) == *id)
                .cloned()
                .ok_or_else(|| <K::Target as Repository>::not_found(*id))?;
            Ok(Labeled {
                label: label.clone(),
                status: link.status,
                item,
            })
        })
        .collect()
}

/// AddX / SetX: one transaction creating missing targets and linking them.
///
/// `items` must have passed [`check_batch`].
pub async fn modify_links<K: LinkKind>(
    conn: &impl GenericClient,
    dialect: Dialect,
    mode: BatchMode,
    user_id: Uuid,
    items: &[LinkItem<TargetCreate<K>>],
) -> KycResult<Vec<Labeled<TargetRecord<K>>>> {
    lock_user(conn, user_id).await?;
    let live = K::build_live_links(user_id).fetch_all::<LinkRow>(conn).await?;
    let params = classify::<K>(mode, items, &live)?;
    let plan = plan::<K>(dialect, user_id, &params)?;
    let links = plan.run::<K>(conn).await?;
    let records = <K::Target as Repository>::build_get_many(plan.target_ids())
        .fetch_all::<TargetRecord<K>>(conn)
        .await?;
    merge::<K>(&plan.targets, &links, &records)
}

/// UpdateX: repoint and/or change the status of one live link.
///
/// `change` must have passed [`check_change`].
pub async fn update_link<K: LinkKind>(
    conn: &impl GenericClient,
    user_id: Uuid,
    change: &LinkChange<TargetCreate<K>>,
) -> KycResult<Labeled<TargetRecord<K>>> {
    lock_user(conn, user_id).await?;
    let live = K::build_live_links(user_id).fetch_all::<LinkRow>(conn).await?;
    if !live.iter().any(|l| l.label == change.label) {
        return Err(K::label_not_found(&change.label));
    }

    let target = match &change.target {
        Some(LinkTarget::Existing(id)) => {
            linked_elsewhere::<K>(&live, &[], *id, &change.label)?;
            Some(*id)
        }
        Some(LinkTarget::New(value)) => {
            let (id, qb) = <K::Target as Repository>::build_insert(value)?;
            qb.execute(conn).await?;
            Some(id)
        }
        None => None,
    };

    let link = K::build_update_link(user_id, &change.label, target, change.status)
        .fetch_opt::<LinkRow>(conn)
        .await?
        .ok_or_else(|| K::label_not_found(&change.label))?;
    let item = <K::Target as Repository>::build_get_one(link.target_id)
        .fetch_one::<TargetRecord<K>>(conn)
        .await?;
    Ok(Labeled {
        label: link.label,
        status: link.status,
        item,
    })
}

/// Labels of `requested` missing from `removed`, in request order.
pub fn missing_labels<'a>(requested: &'a [String], removed: &[LinkRow]) -> Vec<&'a str> {
    let found: HashSet<&str> = removed.iter().map(|l| l.label.as_str()).collect();
    requested
        .iter()
        .map(String::as_str)
        .filter(|l| !found.contains(l))
        .collect()
}

/// RemoveX: cancel the live links with the given labels. Every label must name a
/// live link, otherwise nothing is removed.
///
/// `labels` must have passed [`check_labels`].
pub async fn remove_links<K: LinkKind>(
    conn: &impl GenericClient,
    user_id: Uuid,
    labels: &[String],
) -> KycResult<Vec<LinkRow>> {
    lock_user(conn, user_id).await?;
    let removed = K::build_remove_links(user_id, labels.to_vec())
        .fetch_all::<LinkRow>(conn)
        .await?;
    match missing_labels(labels, &removed).first() {
        Some(label) => Err(K::label_not_found(label)),
        None => Ok(removed),
    }
}

/// GetLabeledX: live links of one user with their targets, ordered by label.
pub async fn get_labeled<K: LinkKind>(
    conn: &impl GenericClient,
    user_id: Uuid,
) -> KycResult<Vec<Labeled<TargetRecord<K>>>> {
    validate::require_id("user id", user_id)?;
    let rows = K::build_get_labeled(user_id).generate_sql()?.query(conn).await?;
    rows.iter().map(K::scan_labeled).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Contact, ContactLinks, ContactType, IncomeLinks, NewContact, NewIncome};
    use crate::test_support::RecordingClient;

    fn email(value: &str) -> NewContact {
        NewContact {
            contact_type: ContactType::Email,
            value: value.to_string(),
        }
    }

    fn live(user_id: Uuid, label: &str, target_id: Uuid) -> LinkRow {
        LinkRow {
            user_id,
            target_id,
            label: label.to_string(),
            status: Status::Active,
        }
    }

    #[test]
    fn batch_checks() {
        let user = Uuid::new_v4();
        let empty: Vec<LinkItem<NewContact>> = vec![];
        assert!(check_batch::<ContactLinks>(user, &empty).is_err());

        let dup_labels = vec![
            LinkItem::new_value("home", email("a@example.org")),
            LinkItem::new_value("home", email("b@example.org")),
        ];
        let err = check_batch::<ContactLinks>(user, &dup_labels).unwrap_err();
        assert!(err.to_string().contains("duplicate label 'home'"));

        let id = Uuid::new_v4();
        let dup_ids = vec![LinkItem::existing("home", id), LinkItem::existing("work", id)];
        let err = check_batch::<ContactLinks>(user, &dup_ids).unwrap_err();
        assert!(err.to_string().contains("duplicate contact id"));

        let bad_value = vec![LinkItem::new_value("home", email("nope"))];
        assert!(check_batch::<ContactLinks>(user, &bad_value).is_err());

        let no_user = vec![LinkItem::new_value("home", email("a@example.org"))];
        assert!(check_batch::<ContactLinks>(Uuid::nil(), &no_user).is_err());
    }

    #[test]
    fn income_without_amount_fails_the_batch() {
        let items = vec![LinkItem::new_value(
            "salary",
            NewIncome {
                currency: "EUR".into(),
                amount: None,
            },
        )];
        let err = check_batch::<IncomeLinks>(Uuid::new_v4(), &items).unwrap_err();
        assert!(matches!(err, KycError::Validation(_)));
    }

    #[test]
    fn change_must_change_something() {
        let change: LinkChange<NewContact> = LinkChange {
            label: "home".into(),
            target: None,
            status: None,
        };
        let err = check_change::<ContactLinks>(Uuid::new_v4(), &change).unwrap_err();
        assert!(err.to_string().contains("cannot update without new value"));

        let unlabeled: LinkChange<NewContact> = LinkChange {
            label: "".into(),
            target: None,
            status: Some(Status::Validated),
        };
        assert!(check_change::<ContactLinks>(Uuid::new_v4(), &unlabeled).is_err());
    }

    #[test]
    fn add_rejects_label_in_use() {
        let user = Uuid::new_v4();
        let current = vec![live(user, "home", Uuid::new_v4())];
        let items = vec![LinkItem::new_value("home", email("a@example.org"))];
        let err = classify::<ContactLinks>(BatchMode::Add, &items, &current).unwrap_err();
        assert!(err.to_string().contains("label 'home' is already in use"));
    }

    #[test]
    fn add_rejects_target_linked_under_other_label() {
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        let current = vec![live(user, "home", id)];
        let items = vec![LinkItem::existing("work", id)];
        let err = classify::<ContactLinks>(BatchMode::Add, &items, &current).unwrap_err();
        assert!(err.to_string().contains("already linked as 'home'"));
    }

    #[test]
    fn set_may_hand_a_target_to_another_label() {
        let user = Uuid::new_v4();
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let current = vec![live(user, "home", x)];
        let items: Vec<LinkItem<NewContact>> =
            vec![LinkItem::existing("home", y), LinkItem::existing("work", x)];

        let params = classify::<ContactLinks>(BatchMode::Set, &items, &current).unwrap();
        assert_eq!(params[0].intent, Intent::Update);
        assert_eq!(params[0].target_id, y);
        assert_eq!(params[1].intent, Intent::Add);
        assert_eq!(params[1].target_id, x);

        // Without repointing "home", x would end up under two labels.
        let keep_home: Vec<LinkItem<NewContact>> = vec![LinkItem::existing("work", x)];
        let err = classify::<ContactLinks>(BatchMode::Set, &keep_home, &current).unwrap_err();
        assert!(err.to_string().contains("already linked as 'home'"));
    }

    #[test]
    fn set_updates_live_labels_and_adds_the_rest() {
        let user = Uuid::new_v4();
        let current = vec![live(user, "home", Uuid::new_v4())];
        let replacement = Uuid::new_v4();
        let items = vec![
            LinkItem::existing("home", replacement),
            LinkItem::new_value("work", email("w@example.org")),
        ];
        let params = classify::<ContactLinks>(BatchMode::Set, &items, &current).unwrap();
        assert_eq!(params[0].intent, Intent::Update);
        assert_eq!(params[0].target_id, replacement);
        assert!(params[0].new_value.is_none());
        assert_eq!(params[1].intent, Intent::Add);
        assert_eq!(params[1].new_value, Some(&email("w@example.org")));

        let plan = plan::<ContactLinks>(Dialect::Postgres, user, &params).unwrap();
        assert!(plan.create_targets.is_some());
        assert_eq!(plan.insert_links.as_ref().unwrap().insert_row_count(), 1);
        assert_eq!(plan.update_links.len(), 1);
        assert_eq!(plan.update_links[0].0, "home");
    }

    #[test]
    fn single_new_value_creates_one_target_and_one_link_sharing_its_id() {
        let user = Uuid::new_v4();
        let items = vec![LinkItem::new_value("home", email("ada@example.org"))];
        let params = classify::<ContactLinks>(BatchMode::Add, &items, &[]).unwrap();
        let plan = plan::<ContactLinks>(Dialect::Postgres, user, &params).unwrap();

        let contacts = plan.create_targets.as_ref().unwrap();
        assert_eq!(contacts.insert_row_count(), 1);
        let contacts = contacts.generate_sql().unwrap();
        let links = plan.insert_links.as_ref().unwrap();
        assert_eq!(links.insert_row_count(), 1);
        let links = links.generate_sql().unwrap();
        assert!(plan.update_links.is_empty());

        let new_id = format!("{:?}", params[0].target_id);
        assert_eq!(contacts.param_reprs()[0], new_id);
        assert_eq!(contacts.param_reprs()[2], "\"ada@example.org\"");
        assert_eq!(links.param_reprs()[1], new_id);
        assert_eq!(links.param_reprs()[2], "\"home\"");
        assert_eq!(plan.targets, vec![("home".to_string(), params[0].target_id)]);
    }

    #[test]
    fn existing_targets_only_need_links() {
        let items: Vec<LinkItem<NewContact>> = vec![LinkItem::existing("home", Uuid::new_v4())];
        let params = classify::<ContactLinks>(BatchMode::Add, &items, &[]).unwrap();
        let plan = plan::<ContactLinks>(Dialect::Postgres, Uuid::new_v4(), &params).unwrap();
        assert!(plan.create_targets.is_none());
        assert!(plan.insert_links.is_some());
    }

    #[test]
    fn merge_reports_every_item_once() {
        let user = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let contact = |id| Contact {
            id,
            contact_type: ContactType::Email,
            value: format!("{id}@example.org"),
            status: Status::Active,
        };
        let targets = vec![("home".to_string(), a), ("work".to_string(), b)];
        let links = vec![live(user, "work", b), live(user, "home", a)];
        let merged = merge::<ContactLinks>(&targets, &links, &[contact(b), contact(a)]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].label, "home");
        assert_eq!(merged[0].item.id, a);
        assert_eq!(merged[1].item.id, b);

        let err = merge::<ContactLinks>(&targets, &links, &[contact(a)]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_labels_in_request_order() {
        let user = Uuid::new_v4();
        let requested = vec!["home".to_string(), "work".to_string(), "old".to_string()];
        let removed = vec![live(user, "work", Uuid::new_v4())];
        assert_eq!(missing_labels(&requested, &removed), vec!["home", "old"]);
    }

    #[tokio::test]
    async fn add_runs_statements_in_dependency_order() {
        let client = RecordingClient::new();
        let user = Uuid::new_v4();
        let items = vec![LinkItem::new_value("home", email("ada@example.org"))];

        // The recording client returns no rows, so the final merge finds no
        // written link for the label.
        let err = modify_links::<ContactLinks>(&client, Dialect::Postgres, BatchMode::Add, user, &items)
            .await
            .unwrap_err();
        assert!(matches!(err, KycError::Other(ref m) if m == "link 'home' was not written"));

        let sql = client.sql();
        assert_eq!(sql.len(), 5);
        assert!(sql[0].starts_with("SELECT id, external_user_id"));
        assert!(sql[0].ends_with("FOR UPDATE"));
        assert!(sql[1].starts_with("SELECT user_id, contact_id AS target_id"));
        assert!(sql[2].starts_with("INSERT INTO contacts"));
        assert!(sql[3].starts_with("INSERT INTO users_contacts"));
        assert!(sql[4].starts_with("SELECT id, contact_type, value, status FROM contacts WHERE id = ANY($1)"));
    }

    #[tokio::test]
    async fn failing_link_insert_stops_the_batch() {
        let client = RecordingClient::new().fail_at(4);
        let items = vec![LinkItem::new_value("home", email("ada@example.org"))];

        let err = modify_links::<ContactLinks>(
            &client,
            Dialect::Postgres,
            BatchMode::Add,
            Uuid::new_v4(),
            &items,
        )
        .await
        .unwrap_err();
        assert!(err.is_unique_violation());

        let sql = client.sql();
        assert_eq!(sql.len(), 4);
        assert!(sql[2].starts_with("INSERT INTO contacts"));
        assert!(sql[3].starts_with("INSERT INTO users_contacts"));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let client = RecordingClient::new().affected(0);
        let items: Vec<LinkItem<NewContact>> = vec![LinkItem::existing("home", Uuid::new_v4())];
        let err = modify_links::<ContactLinks>(
            &client,
            Dialect::Postgres,
            BatchMode::Set,
            Uuid::new_v4(),
            &items,
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(client.statements().len(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_label_is_not_found() {
        let client = RecordingClient::new();
        let change: LinkChange<NewContact> = LinkChange {
            label: "home".into(),
            target: None,
            status: Some(Status::Validated),
        };
        let err = update_link::<ContactLinks>(&client, Uuid::new_v4(), &change)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no live contact labeled 'home'"));
        assert_eq!(client.statements().len(), 2);
    }

    #[tokio::test]
    async fn remove_requires_every_label() {
        let client = RecordingClient::new();
        let labels = vec!["home".to_string()];
        let err = remove_links::<ContactLinks>(&client, Uuid::new_v4(), &labels)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let statements = client.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[1].sql.starts_with("UPDATE users_contacts SET status = $1"));
        assert_eq!(statements[1].param_count, 5);
    }
}
