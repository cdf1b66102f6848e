use anyhow::Context;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/library.sqlite";
const DEFAULT_SERVER_PORT: u16 = 5001;

#[derive(Debug)]
pub struct Config {
    database_url: String,
    server_port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source, falling back to defaults
    /// for unset keys.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = load_or(&lookup, "DATABASE_URL", DEFAULT_DATABASE_URL.to_string())?;
        let server_port = load_or(&lookup, "SERVER_PORT", DEFAULT_SERVER_PORT)?;
        Ok(Self {
            database_url,
            server_port,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }
}

fn load_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("Failed to parse environment variable {key}")),
        None => Ok(default),
    }
}
