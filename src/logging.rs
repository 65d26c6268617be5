//! Tracing setup: stdout plus a plain-text log file.
//!
//! Both outputs share the `RUST_LOG` filter (default `info`). The returned guard
//! flushes the file writer on drop, so `main` holds it for the whole run. If the
//! log file cannot be opened the run continues with stdout only.

use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

pub const LOG_FILE_NAME: &str = "hotboard_export.log";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, appending to `{log_dir}/hotboard_export.log`.
pub fn init(log_dir: &str) -> Option<WorkerGuard> {
    let appender = std::fs::create_dir_all(Path::new(log_dir))
        .map_err(|e| e.to_string())
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE_NAME)
                .build(log_dir)
                .map_err(|e| e.to_string())
        });

    let (file_layer, guard, file_error) = match appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tfmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(tfmt::time::UtcTime::rfc_3339())
                .with_filter(filter());
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(
            tfmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_timer(tfmt::time::UtcTime::rfc_3339())
                .with_filter(filter()),
        )
        .with(file_layer)
        .init();

    if let Some(error) = file_error {
        warn!(%log_dir, %error, "Log file unavailable; logging to stdout only");
    }
    guard
}
