use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level config (opswatch.toml + OPSWATCH_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpswatchConfig {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub opserv: OpservConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// When set, slash commands are registered per guild (instant) instead
    /// of globally (propagates within the hour).
    pub guild_id: Option<u64>,
    /// Presence strings rotated by the status task ("Watching …").
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,
}

/// Connection settings for the read-only Opserv (XenForo) MySQL database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpservConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl Default for OpservConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Paths for the bot's own durable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding the notification ledger.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
    /// JSON file holding the schedule registry.
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            registry_path: default_registry_path(),
        }
    }
}

fn default_statuses() -> Vec<String> {
    vec!["the operations".to_string()]
}
fn default_db_host() -> String {
    "127.0.0.1".to_string()
}
fn default_db_port() -> u16 {
    3306
}
fn default_ledger_path() -> String {
    "opswatch.db".to_string()
}
fn default_registry_path() -> String {
    "schedules.json".to_string()
}

impl OpswatchConfig {
    /// Load config from a TOML file with OPSWATCH_* env var overrides.
    ///
    /// Checks in order: explicit path argument, then `./opswatch.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("opswatch.toml");

        let config: OpswatchConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("OPSWATCH_").split("_"))
            .extract()
            .map_err(|e| crate::error::OpswatchError::Config(e.to_string()))?;

        Ok(config)
    }
}
