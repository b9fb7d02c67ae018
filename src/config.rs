use eyre::{Context, Error};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "rteams.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: DatabaseConfig,
    pub teams: TeamsConfig,
    pub admin: AdminConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub file: PathBuf,
    /// Seconds to wait for the write lock before giving up.
    pub busy_timeout: u64,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("data/teams.db"),
            busy_timeout: 30,
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeamsConfig {
    pub max_members: usize,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self { max_members: 2 }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    pub password: Option<String>,
}

impl Config {
    pub fn parse(content: &str) -> Result<Config, Error> {
        toml::from_str(content).context("cannot parse configuration file")
    }

    /// Load the configuration. A missing file is only tolerated when it is
    /// the default one, in which case every setting keeps its default.
    pub fn load(file_name: Option<&Path>) -> Result<Config, Error> {
        let (path, explicit) = match file_name {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            tracing::debug!(file = %path.display(), "no configuration file, using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot load configuration file {}", path.display()))?;
        Config::parse(&content)
    }
}
