//! Resolved runtime configuration.
//!
//! [`Settings`] is the one explicit configuration value threaded through the
//! constructors of the fetcher, rotator, limiter and validator. It is layered as
//! built-in defaults, then an optional YAML file, then whatever the CLI/env set.
//!
//! ```yaml
//! endpoint: "https://www.toutiao.com/hot-event/hot-board/?origin=toutiao_pc"
//! output: "./toutiao_articles.xlsx"
//! min_interval_secs: 8
//! max_retries: 3
//! timeout_secs: 15
//! backoff_secs: 2
//! proxy_failure_threshold: 3
//! proxies:
//!   - "10.0.0.1:3128"
//! cookie: "tt_webid=...; ttcid=..."
//! keep_zero_reads: false
//! user_agents:
//!   - "Mozilla/5.0 ..."
//! article_base: "https://www.toutiao.com/article/"
//! trending_base: "https://www.toutiao.com/trending/"
//! ```

use crate::cli::Cli;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://www.toutiao.com/hot-event/hot-board/?origin=toutiao_pc";
pub const DEFAULT_OUTPUT: &str = "toutiao_articles.xlsx";
pub const DEFAULT_ARTICLE_BASE: &str = "https://www.toutiao.com/article/";
pub const DEFAULT_TRENDING_BASE: &str = "https://www.toutiao.com/trending/";

/// Errors raised while building [`Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The YAML file is not valid for [`FileConfig`].
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    /// A duration knob was negative, NaN or infinite.
    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { field: &'static str, value: f64 },
    /// `max_retries` or `proxy_failure_threshold` was zero.
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
    /// A link prefix is not an absolute http(s) URL.
    #[error("{field} must be an absolute http(s) URL (got {value:?})")]
    InvalidBase {
        field: &'static str,
        value: String,
    },
}

/// The optional on-disk configuration. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub output: Option<String>,
    pub json_output: Option<String>,
    pub min_interval_secs: Option<f64>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<f64>,
    pub backoff_secs: Option<f64>,
    pub proxy_failure_threshold: Option<u32>,
    pub proxies: Vec<String>,
    pub cookie: Option<String>,
    pub keep_zero_reads: Option<bool>,
    pub user_agents: Vec<String>,
    pub article_base: Option<String>,
    pub trending_base: Option<String>,
}

impl FileConfig {
    #[instrument(level = "info", skip_all, fields(%path))]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let parsed: FileConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!("Loaded config file");
        Ok(parsed)
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub output: String,
    pub json_output: Option<String>,
    /// Minimum spacing between outbound requests.
    pub min_interval: Duration,
    /// Total attempts per logical fetch.
    pub max_retries: u32,
    pub timeout: Duration,
    /// Retry delay is `backoff_base * (attempt + 1)`.
    pub backoff_base: Duration,
    pub proxy_failure_threshold: u32,
    pub proxies: Vec<String>,
    pub cookie: Option<String>,
    pub keep_zero_reads: bool,
    /// Empty means "use the built-in browser signatures".
    pub user_agents: Vec<String>,
    pub article_base: String,
    pub trending_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            output: DEFAULT_OUTPUT.to_string(),
            json_output: None,
            min_interval: Duration::from_secs(8),
            max_retries: 3,
            timeout: Duration::from_secs(15),
            backoff_base: Duration::from_secs(2),
            proxy_failure_threshold: 3,
            proxies: Vec::new(),
            cookie: None,
            keep_zero_reads: false,
            user_agents: Vec::new(),
            article_base: DEFAULT_ARTICLE_BASE.to_string(),
            trending_base: DEFAULT_TRENDING_BASE.to_string(),
        }
    }
}

impl Settings {
    /// Layer the config file (if `cli.config` names one) and the CLI over the defaults.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::layered(file, cli)
    }

    /// Merge an already-loaded file config with the CLI. CLI wins.
    pub fn layered(file: FileConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let mut s = Settings::default();

        if let Some(v) = cli.endpoint.clone().or(file.endpoint) {
            s.endpoint = v;
        }
        if let Some(v) = cli.output.clone().or(file.output) {
            s.output = v;
        }
        s.json_output = cli.json_output.clone().or(file.json_output);
        if let Some(v) = cli.min_interval_secs.or(file.min_interval_secs) {
            s.min_interval = secs("min_interval_secs", v)?;
        }
        if let Some(v) = cli.max_retries.or(file.max_retries) {
            s.max_retries = non_zero("max_retries", v)?;
        }
        if let Some(v) = cli.timeout_secs.or(file.timeout_secs) {
            s.timeout = secs("timeout_secs", v)?;
        }
        if let Some(v) = cli.backoff_secs.or(file.backoff_secs) {
            s.backoff_base = secs("backoff_secs", v)?;
        }
        if let Some(v) = cli.proxy_failure_threshold.or(file.proxy_failure_threshold) {
            s.proxy_failure_threshold = non_zero("proxy_failure_threshold", v)?;
        }
        s.proxies = if cli.proxies.is_empty() {
            file.proxies
        } else {
            cli.proxies.clone()
        };
        s.proxies.retain(|p| !p.trim().is_empty());
        s.cookie = cli.cookie.clone().or(file.cookie).filter(|c| !c.trim().is_empty());
        s.keep_zero_reads = cli.keep_zero_reads || file.keep_zero_reads.unwrap_or(false);
        s.user_agents = file.user_agents;
        if let Some(v) = cli.article_base.clone().or(file.article_base) {
            s.article_base = link_base("article_base", v)?;
        }
        if let Some(v) = cli.trending_base.clone().or(file.trending_base) {
            s.trending_base = link_base("trending_base", v)?;
        }

        debug!(settings = ?s, "Resolved settings");
        Ok(s)
    }
}

fn secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { field, value })
}

/// Accept an absolute http(s) prefix. A missing trailing `/` is added so the id
/// is appended as a new path segment.
fn link_base(field: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => return Err(ConfigError::InvalidBase { field, value }),
    }
    if trimmed.ends_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/"))
    }
}

fn non_zero(field: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { field })
    } else {
        Ok(value)
    }
}
