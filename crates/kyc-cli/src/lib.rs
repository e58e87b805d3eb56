mod cli;
mod commands;
mod config;

use tracing_subscriber::EnvFilter;

use crate::config::ProjectConfig;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Check(args) => commands::check(args).await,
        cli::Command::User(args) => commands::user(args).await,
        cli::Command::Contacts(args) => commands::contacts(args).await,
    }
}

/// `RUST_LOG` wins over `[logging] filter`; the fallback is `warn`.
pub(crate) fn init_logging(config: &ProjectConfig) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config
            .file
            .logging
            .filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new("warn")),
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
