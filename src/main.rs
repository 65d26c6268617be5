//! # hotboard_export
//!
//! Fetches the Toutiao hot board, normalizes each entry into a flat record,
//! drops invalid ones and writes the rest to a formatted spreadsheet.
//!
//! ## Usage
//!
//! ```sh
//! hotboard_export -o ./toutiao_articles.xlsx
//! ```
//!
//! ## Architecture
//!
//! One bounded pass per invocation:
//! 1. **Fetching**: one rate-limited GET under a rotated identity, retried with
//!    growing delays ([`fetcher`], [`identity`], [`rate_limit`])
//! 2. **Normalizing**: fallback-chain field extraction per item ([`normalize`])
//! 3. **Validating**: acceptance rules, feed order preserved ([`validate`], [`pipeline`])
//! 4. **Output**: spreadsheet and optional JSON snapshot ([`outputs`])
//!
//! The process always exits 0. Failures, including a malformed command line or
//! environment value, are logged, and the worst case is that no file gets written.

use clap::Parser;
use clap::error::ErrorKind;
use std::time::Instant;
use tracing::{debug, error, info, warn};

mod cli;
mod config;
mod fetcher;
mod identity;
mod logging;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod rate_limit;
mod utils;
mod validate;

use cli::Cli;
use config::Settings;
use fetcher::ResilientFetcher;
use identity::IdentityRotator;
use normalize::RecordNormalizer;
use outputs::ExportOutcome;
use validate::{RecordValidator, ZeroEngagementPolicy};

#[tokio::main]
async fn main() {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return;
        }
        Err(e) => {
            let _log_guard = logging::init(cli::DEFAULT_LOG_DIR);
            error!(error = %e.render(), "Invalid command line; nothing fetched");
            return;
        }
    };
    let _log_guard = logging::init(&args.log_dir);

    let start_time = Instant::now();
    info!("hotboard_export starting up");
    debug!(?args, "Parsed CLI arguments");

    let settings = match Settings::resolve(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration; nothing fetched");
            return;
        }
    };

    // ---- Identity pool ----
    let rotator = IdentityRotator::new(
        settings.user_agents.clone(),
        settings.proxy_failure_threshold,
    );
    for proxy in &settings.proxies {
        rotator.register(proxy);
    }
    info!(
        proxies = rotator.active_count(),
        threshold = settings.proxy_failure_threshold,
        "Identity pool ready"
    );

    let fetcher = match ResilientFetcher::new(&settings, rotator) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client; nothing fetched");
            return;
        }
    };
    debug!(?fetcher, "Fetcher configured");

    // ---- Fetch, normalize, validate ----
    let normalizer = RecordNormalizer::from_settings(&settings);
    let policy = if settings.keep_zero_reads {
        ZeroEngagementPolicy::Allow
    } else {
        ZeroEngagementPolicy::Reject
    };
    let validator = RecordValidator::new(policy);

    info!(endpoint = %settings.endpoint, "Fetching hot board");
    let records = pipeline::collect_records(
        &fetcher,
        &settings.endpoint,
        &normalizer,
        &validator,
    )
    .await;

    // ---- Output ----
    match outputs::xlsx::write_records(&records, &settings.output).await {
        Ok(ExportOutcome::Written { path, rows }) => {
            info!(%path, rows, "Spreadsheet export complete")
        }
        Ok(ExportOutcome::Skipped) => warn!("Spreadsheet export skipped: no records"),
        Err(e) => {
            error!(path = %settings.output, error = %e, "Failed to write spreadsheet")
        }
    }

    if let Some(json_path) = &settings.json_output {
        if let Err(e) = outputs::json::write_records(&records, json_path).await {
            error!(path = %json_path, error = %e, "Failed to write JSON snapshot");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        records = records.len(),
        proxies_left = fetcher.rotator().active_count(),
        "Execution complete"
    );
}
