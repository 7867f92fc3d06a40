use std::{path::PathBuf, str::FromStr};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub max_connections: u32,

    /// Legacy flat-file data directory imported once at startup.
    pub import_dir: Option<PathBuf>,
    /// Directory receiving a flat-file snapshot after shutdown.
    pub export_dir: Option<PathBuf>,

    /// Actors allowed to change community status. Empty means unchecked.
    pub admin_ids: Vec<String>,
    pub trust_client_identity: bool,
    pub strict_categories: bool,

    pub max_message_len: usize,
    pub max_message_limit: usize,
    pub broadcast_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0:8080".to_owned(),
            database_url: "sqlite://communities.db".to_owned(),
            max_connections: 16,
            import_dir: None,
            export_dir: None,
            admin_ids: Vec::new(),
            trust_client_identity: true,
            strict_categories: false,
            max_message_len: 2000,
            max_message_limit: 500,
            broadcast_capacity: 64,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        Ok(Config {
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: dotenv::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            import_dir: dotenv::var("IMPORT_DIR").ok().map(PathBuf::from),
            export_dir: dotenv::var("EXPORT_DIR").ok().map(PathBuf::from),
            admin_ids: dotenv::var("ADMIN_IDS")
                .map(|ids| parse_list(&ids))
                .unwrap_or_default(),
            trust_client_identity: parse_var(
                "TRUST_CLIENT_IDENTITY",
                defaults.trust_client_identity,
            )?,
            strict_categories: parse_var("STRICT_CATEGORIES", defaults.strict_categories)?,
            max_message_len: parse_var("MAX_MESSAGE_LEN", defaults.max_message_len)?,
            max_message_limit: parse_var("MAX_MESSAGE_LIMIT", defaults.max_message_limit)?,
            broadcast_capacity: parse_var("BROADCAST_CAPACITY", defaults.broadcast_capacity)?,
        })
    }

    pub fn is_admin(&self, actor: Option<&str>) -> bool {
        self.admin_ids.is_empty() || actor.is_some_and(|id| self.admin_ids.iter().any(|a| a == id))
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect()
}
