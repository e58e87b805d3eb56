use std::path::PathBuf;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Check,
    User,
    Contacts,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Check(CheckArgs),
    User(LookupArgs),
    Contacts(LookupArgs),
}

#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub config: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LookupArgs {
    pub config: PathBuf,
    pub user_id: Uuid,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help(HelpTopic::Root)),
        "check" => parse_check(it.map(|s| s.as_str())),
        "user" => parse_lookup(HelpTopic::User, it.map(|s| s.as_str())),
        "contacts" => parse_lookup(HelpTopic::Contacts, it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

/// Consumes `--config <path>` / `--config=<path>`; returns false for other tokens.
fn take_config<'a>(
    token: &str,
    it: &mut impl Iterator<Item = &'a str>,
    config: &mut PathBuf,
) -> anyhow::Result<bool> {
    if token == "--config" {
        let Some(v) = it.next() else {
            anyhow::bail!("--config requires a value");
        };
        *config = PathBuf::from(v);
        return Ok(true);
    }
    if let Some(v) = token.strip_prefix("--config=") {
        *config = PathBuf::from(v);
        return Ok(true);
    }
    Ok(false)
}

fn parse_check<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("kyc.toml");

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Check)),
            _ if take_config(token, &mut it, &mut config)? => {}
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Check(CheckArgs { config }))
}

fn parse_lookup<'a>(topic: HelpTopic, mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from("kyc.toml");
    let mut user_id: Option<Uuid> = None;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(topic)),
            _ if take_config(token, &mut it, &mut config)? => {}
            _ if token.starts_with('-') => anyhow::bail!("unknown argument: {token}"),
            _ if user_id.is_none() => {
                let id = Uuid::parse_str(token)
                    .map_err(|e| anyhow::anyhow!("invalid user id '{token}': {e}"))?;
                user_id = Some(id);
            }
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }

    let Some(user_id) = user_id else {
        anyhow::bail!("missing <user-id>");
    };
    let args = LookupArgs { config, user_id };
    Ok(match topic {
        HelpTopic::Contacts => Command::Contacts(args),
        _ => Command::User(args),
    })
}

pub fn print_help(topic: HelpTopic) {
    let text = match topic {
        HelpTopic::Root => {
            "\
kyc - operate on the KYC profile graph

USAGE:
  kyc <command> [options]

COMMANDS:
  check               verify the database is reachable
  user <user-id>      show one user and its sub-profile references
  contacts <user-id>  list the live labeled contacts of a user
  help                print this message

OPTIONS:
  --config <path>     config file (default: kyc.toml)
"
        }
        HelpTopic::Check => {
            "\
kyc check [--config <path>]

Borrows one connection from the pool and runs a trivial query.
"
        }
        HelpTopic::User => {
            "\
kyc user <user-id> [--config <path>]

Prints the user row: external id, sub-profile ids and status.
"
        }
        HelpTopic::Contacts => {
            "\
kyc contacts <user-id> [--config <path>]

Prints every live contact link of the user, ordered by label.
"
        }
    };
    print!("{text}");
}
