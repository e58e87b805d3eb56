use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use kyc::entity::{Contact, UserId};
use kyc::service::{Database, KycServices};
use kyc::{GenericClient, Labeled, Status};

use crate::cli::{CheckArgs, LookupArgs};
use crate::config::ProjectConfig;

fn connect(config: &ProjectConfig) -> anyhow::Result<Database> {
    let db = &config.file.database;
    let pool = kyc::create_pool_with_config(&db.url, db.max_connections)?;
    tracing::debug!(
        config = %config.config_path.display(),
        max_connections = db.max_connections,
        dialect = ?db.dialect,
        "pool ready"
    );
    Ok(Database::new(pool, config.file.service_options()))
}

pub async fn check(args: CheckArgs) -> anyhow::Result<()> {
    let config = ProjectConfig::load(args.config)?;
    crate::init_logging(&config);
    let db = connect(&config)?;

    db.bounded(async {
        let client = db.client().await?;
        GenericClient::execute(&client, "SELECT 1", &[]).await
    })
    .await?;

    let status = db.pool().status();
    println!(
        "database reachable ({} of {} connections open)",
        status.size, status.max_size
    );
    Ok(())
}

pub async fn user(args: LookupArgs) -> anyhow::Result<()> {
    let config = ProjectConfig::load(args.config)?;
    crate::init_logging(&config);
    let services = KycServices::new(connect(&config)?);

    let user = services.user_ids.get(args.user_id).await.into_result()?;
    println!("{}", user_table(&user));
    Ok(())
}

pub async fn contacts(args: LookupArgs) -> anyhow::Result<()> {
    let config = ProjectConfig::load(args.config)?;
    crate::init_logging(&config);
    let services = KycServices::new(connect(&config)?);

    let contacts = services
        .user_ids
        .get_labeled_contacts(args.user_id)
        .await
        .into_result()?;
    if contacts.is_empty() {
        println!("user {} has no live contacts", args.user_id);
        return Ok(());
    }
    println!("{}", contacts_table(&contacts));
    Ok(())
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold).fg(Color::Cyan))
        .collect()
}

fn status_cell(status: Status) -> Cell {
    let color = match status {
        Status::Active | Status::Validated => Color::Green,
        Status::Canceled | Status::Terminated => Color::Red,
        Status::Unspecified => Color::DarkGrey,
    };
    Cell::new(status.as_str()).fg(color)
}

fn optional_id(id: Option<uuid::Uuid>) -> Cell {
    match id {
        Some(id) => Cell::new(id.to_string()).fg(Color::Yellow),
        None => Cell::new("(none)").fg(Color::DarkGrey),
    }
}

fn user_table(user: &UserId) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Field", "Value"]));
    table.add_row(vec![Cell::new("id"), Cell::new(user.id.to_string()).fg(Color::Yellow)]);
    table.add_row(vec![Cell::new("external user id"), Cell::new(&user.external_user_id)]);
    table.add_row(vec![Cell::new("credential"), optional_id(user.credential_id)]);
    table.add_row(vec![Cell::new("physique"), optional_id(user.physique_id)]);
    table.add_row(vec![Cell::new("social"), optional_id(user.social_id)]);
    table.add_row(vec![Cell::new("status"), status_cell(user.status)]);
    table
}

fn contacts_table(contacts: &[Labeled<Contact>]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Label", "Link", "Type", "Value", "Contact", "ID"]));
    for labeled in contacts {
        let contact = &labeled.item;
        table.add_row(vec![
            Cell::new(&labeled.label).add_attribute(Attribute::Bold),
            status_cell(labeled.status),
            Cell::new(contact.contact_type.as_str()),
            Cell::new(&contact.value),
            status_cell(contact.status),
            Cell::new(contact.id.to_string()).fg(Color::Yellow),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc::entity::ContactType;
    use uuid::Uuid;

    #[test]
    fn contacts_table_has_one_row_per_label() {
        let contacts = vec![
            Labeled {
                label: "home".into(),
                status: Status::Active,
                item: Contact {
                    id: Uuid::new_v4(),
                    contact_type: ContactType::Email,
                    value: "ada@example.com".into(),
                    status: Status::Validated,
                },
            },
            Labeled {
                label: "work".into(),
                status: Status::Active,
                item: Contact {
                    id: Uuid::new_v4(),
                    contact_type: ContactType::Phone,
                    value: "+441234567890".into(),
                    status: Status::Active,
                },
            },
        ];
        let table = contacts_table(&contacts);
        assert_eq!(table.row_count(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("ada@example.com"));
        assert!(rendered.contains("work"));
    }

    #[test]
    fn user_table_marks_missing_profiles() {
        let user = UserId {
            id: Uuid::new_v4(),
            external_user_id: "ext-42".into(),
            credential_id: None,
            physique_id: None,
            social_id: Some(Uuid::new_v4()),
            status: Status::Active,
        };
        let rendered = user_table(&user).to_string();
        assert!(rendered.contains("ext-42"));
        assert!(rendered.contains("(none)"));
    }
}
