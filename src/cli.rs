//! Command-line interface definitions for hotboard_export.
//!
//! Every option can be given as a flag or through its environment variable.
//! Options left unset fall back to the YAML config file (if any) and then to
//! the built-in defaults, see [`crate::config::Settings::resolve`].

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};

/// Default directory for the log file.
pub const DEFAULT_LOG_DIR: &str = ".";

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Defaults: 8s between requests, 3 attempts, 15s timeout
/// hotboard_export -o ./toutiao_articles.xlsx
///
/// # Through two proxies, keeping zero-engagement items
/// hotboard_export --proxies 10.0.0.1:3128,10.0.0.2:3128 --keep-zero-reads
///
/// # Everything else from a file
/// hotboard_export -c ./hotboard.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the spreadsheet to write
    #[arg(short, long, env = "HOTBOARD_OUTPUT")]
    pub output: Option<String>,

    /// Optionally also dump accepted records as JSON to this path
    #[arg(short, long, env = "HOTBOARD_JSON_OUTPUT")]
    pub json_output: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "HOTBOARD_CONFIG")]
    pub config: Option<String>,

    /// Hot board endpoint to fetch
    #[arg(long, env = "HOTBOARD_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Minimum seconds between two outbound requests
    #[arg(long, env = "HOTBOARD_MIN_INTERVAL_SECS")]
    pub min_interval_secs: Option<f64>,

    /// Total attempts per fetch before giving up
    #[arg(long, env = "HOTBOARD_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, env = "HOTBOARD_TIMEOUT_SECS")]
    pub timeout_secs: Option<f64>,

    /// Base retry delay in seconds (multiplied by the attempt number)
    #[arg(long, env = "HOTBOARD_BACKOFF_SECS")]
    pub backoff_secs: Option<f64>,

    /// Failures after which a proxy is dropped from rotation
    #[arg(long, env = "HOTBOARD_PROXY_FAILURE_THRESHOLD")]
    pub proxy_failure_threshold: Option<u32>,

    /// Proxies to rotate through (`host:port` or full URL)
    #[arg(long, env = "HOTBOARD_PROXIES", value_delimiter = ',')]
    pub proxies: Vec<String>,

    /// Prefix joined with an article id to form a record link
    #[arg(long, env = "HOTBOARD_ARTICLE_BASE")]
    pub article_base: Option<String>,

    /// Prefix joined with the cluster id when no article id is known
    #[arg(long, env = "HOTBOARD_TRENDING_BASE")]
    pub trending_base: Option<String>,

    /// Session cookie sent with every request
    #[arg(long, env = "HOTBOARD_COOKIE")]
    pub cookie: Option<String>,

    /// Directory for the log file
    #[arg(long, env = "HOTBOARD_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,

    /// Keep items whose engagement value is exactly zero.
    ///
    /// The environment form accepts `1`/`0`, `true`/`false`, `yes`/`no` and `on`/`off`.
    #[arg(
        long,
        env = "HOTBOARD_KEEP_ZERO_READS",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub keep_zero_reads: bool,
}
