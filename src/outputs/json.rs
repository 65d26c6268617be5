//! JSON snapshot of the accepted records.
//!
//! Written alongside the spreadsheet when `--json-output` is given. The file
//! holds a single array of [`Record`]s in feed order, with `published_at` as an
//! RFC 3339 timestamp.

use super::ExportOutcome;
use crate::models::Record;
use crate::utils::ensure_parent_dir;
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Serialize `records` as a pretty-printed JSON array at `path`.
///
/// # Returns
///
/// [`ExportOutcome::Skipped`] without touching the filesystem when there is
/// nothing to write, [`ExportOutcome::Written`] otherwise.
#[instrument(level = "info", skip(records), fields(rows = records.len()))]
pub async fn write_records(
    records: &[Record],
    path: &str,
) -> Result<ExportOutcome, Box<dyn Error>> {
    if records.is_empty() {
        warn!("No records to export; JSON snapshot not written");
        return Ok(ExportOutcome::Skipped);
    }

    let json = serde_json::to_string_pretty(records)?;
    ensure_parent_dir(path).await?;
    fs::write(path, json).await?;

    info!(%path, "Wrote JSON snapshot");
    Ok(ExportOutcome::Written {
        path: path.to_string(),
        rows: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    #[tokio::test]
    async fn test_snapshot_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hot.json");
        let records: Vec<Record> = ["first", "second"]
            .iter()
            .map(|t| Record {
                title: t.to_string(),
                url: format!("https://www.toutiao.com/trending/{t}"),
                published_at: Local::now(),
                read_count: 100,
                comment_count: 1,
                like_count: 5,
                source: "Toutiao".to_string(),
                category: "Uncategorized".to_string(),
                summary: String::new(),
            })
            .collect();

        write_records(&records, path.to_str().unwrap()).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let back: Vec<Record> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, records);
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hot.json");

        let outcome = write_records(&[], path.to_str().unwrap()).await.unwrap();

        assert_eq!(outcome, ExportOutcome::Skipped);
        assert!(!path.exists());
    }
}
