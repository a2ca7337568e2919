use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use xsearch::{BackoffPolicy, TwscrapeProvider};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub twscrape: TwscrapeConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// How to invoke the search tool
#[derive(Debug, Deserialize, Clone)]
pub struct TwscrapeConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(deserialize_with = "deserialize_option_path")]
    #[serde(default)]
    pub db: Option<PathBuf>,
    /// Extra environment for the tool. Leaving `TWS_RAISE_WHEN_NO_ACCOUNT` unset lets it wait
    /// for the next free account itself.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(deserialize_with = "deserialize_path")]
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_day_delay_ms")]
    pub day_delay_ms: u64,
    #[serde(default = "default_min_backoff_secs")]
    pub min_backoff_secs: u64,
    #[serde(default = "default_default_backoff_secs")]
    pub default_backoff_secs: u64,
}

impl Default for TwscrapeConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: vec![],
            db: None,
            env: HashMap::new(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            day_delay_ms: default_day_delay_ms(),
            min_backoff_secs: default_min_backoff_secs(),
            default_backoff_secs: default_default_backoff_secs(),
        }
    }
}

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let conf_contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("unable to read config {:?}", path.as_ref()))?;
        toml::from_str(&conf_contents)
            .with_context(|| format!("unable to parse config {:?}", path.as_ref()))
    }

    /// Read `path` if given, otherwise the default location if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::read(p),
            None => match default_config_path() {
                Some(p) if p.exists() => Self::read(p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn provider(&self) -> TwscrapeProvider {
        let conf = &self.twscrape;
        let mut provider = TwscrapeProvider::new(&conf.program).args(&conf.args);
        if let Some(db) = &conf.db {
            provider = provider.db(db);
        }
        for (k, v) in &conf.env {
            provider = provider.env(k, v);
        }
        provider
    }
}

impl SearchConfig {
    pub fn archive_path(&self, archive_name: &str) -> PathBuf {
        self.output_dir.join(format!("{archive_name}.csv"))
    }

    pub fn day_delay(&self) -> Duration {
        Duration::from_millis(self.day_delay_ms)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            min_wait: Duration::from_secs(self.min_backoff_secs),
            default_wait: Duration::from_secs(self.default_backoff_secs),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "xsearch").map(|d| d.config_dir().join("config.toml"))
}

fn default_program() -> String {
    "twscrape".to_owned()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_day_delay_ms() -> u64 {
    1500
}

fn default_min_backoff_secs() -> u64 {
    60
}

fn default_default_backoff_secs() -> u64 {
    300
}

#[cfg(unix)]
fn expand_home(path: PathBuf) -> Result<PathBuf, String> {
    use home_dir::HomeDirExt;
    path.expand_home().map_err(|e| e.to_string())
}

#[cfg(not(unix))]
fn expand_home(path: PathBuf) -> Result<PathBuf, String> {
    Ok(path)
}

fn deserialize_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: Deserializer<'de>,
{
    let s: PathBuf = Deserialize::deserialize(deserializer)?;
    expand_home(s).map_err(D::Error::custom)
}

fn deserialize_option_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_path(deserializer).map(Some)
}
