use std::path::PathBuf;
use std::time::Duration;

use kyc::Dialect;
use kyc::service::ServiceOptions;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_path: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    /// Read, expand `${VAR}` references and validate. Variables from a `.env`
    /// file in the working directory are visible to the expansion.
    pub fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!("failed to read config file {}: {e}", config_path.display())
        })?;
        let file = ConfigFile::parse(&raw)
            .map_err(|e| anyhow::anyhow!("config file {}: {e:#}", config_path.display()))?;

        Ok(Self { config_path, file })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseConfig,

    #[serde(default)]
    pub transactions: TransactionsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default)]
    pub dialect: Dialect,
}

fn default_max_connections() -> usize {
    kyc::DEFAULT_MAX_CONNECTIONS
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 0 disables the timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for TransactionsConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: Option<String>,
}

impl ConfigFile {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut file: ConfigFile =
            toml::from_str(raw).map_err(|e| anyhow::anyhow!("failed to parse: {e}"))?;
        file.expand_env()?;
        file.validate()?;
        Ok(file)
    }

    pub fn service_options(&self) -> ServiceOptions {
        let timeout = self.transactions.request_timeout_ms;
        ServiceOptions {
            dialect: self.database.dialect,
            max_retries: self.transactions.max_retries,
            request_timeout: (timeout > 0).then(|| Duration::from_millis(timeout)),
        }
    }

    fn expand_env(&mut self) -> anyhow::Result<()> {
        self.database.url = expand_env_vars(&self.database.url)?;
        if let Some(filter) = self.logging.filter.as_mut() {
            *filter = expand_env_vars(filter)?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url must not be empty");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be at least 1");
        }
        Ok(())
    }
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            anyhow::bail!("unterminated env var reference: ${{{after}");
        };
        let key = &after[..end];
        if key.is_empty() {
            anyhow::bail!("invalid env var reference: ${{}}");
        }
        let value = std::env::var(key)
            .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}
