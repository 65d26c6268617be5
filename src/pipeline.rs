//! One pass over the hot board: fetch, normalize, validate, in feed order.
//!
//! Nothing in here fails the run. An exhausted fetch or a payload without a
//! usable `data` array yields an empty batch. Bad items are logged and skipped
//! one at a time.

use crate::fetcher::FetchJson;
use crate::models::Record;
use crate::normalize::RecordNormalizer;
use crate::utils::truncate_for_log;
use crate::validate::RecordValidator;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

/// Fetch `url` through `source` and return the accepted records in feed order.
///
/// Each entry of the payload's `data` array is normalized and then validated.
/// Entries that fail either step are logged with their index and skipped, so
/// one bad item never costs the rest of the batch.
///
/// # Arguments
///
/// * `source` - Where the JSON payload comes from, normally a
///   [`ResilientFetcher`](crate::fetcher::ResilientFetcher)
/// * `url` - The hot board endpoint
/// * `normalizer` - Maps raw entries to [`Record`]s
/// * `validator` - Decides which records are kept
///
/// # Returns
///
/// The accepted records, in the order the feed listed them. The result is
/// empty when the fetch is exhausted or the payload has no non-empty `data`
/// array; both cases are logged at `error` level.
#[instrument(level = "info", skip(source, normalizer, validator))]
pub async fn collect_records<S: FetchJson>(
    source: &S,
    url: &str,
    normalizer: &RecordNormalizer,
    validator: &RecordValidator,
) -> Vec<Record> {
    let payload = match source.fetch_json(url).await {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "No data this pass");
            return Vec::new();
        }
    };

    let items = match payload.get("data") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        Some(Value::Array(_)) => {
            error!(%url, "Feed returned an empty data array");
            return Vec::new();
        }
        other => {
            error!(
                %url,
                data = ?other.map(|v| truncate_for_log(&v.to_string(), 200)),
                "Feed payload has no data array"
            );
            return Vec::new();
        }
    };

    let mut accepted = Vec::with_capacity(items.len());
    let mut malformed = 0usize;
    let mut rejected = 0usize;

    for (index, item) in items.iter().enumerate() {
        let record = match normalizer.normalize_value(item) {
            Ok(record) => record,
            Err(e) => {
                malformed += 1;
                warn!(
                    index,
                    error = %e,
                    item = %truncate_for_log(&item.to_string(), 300),
                    "Skipping malformed item"
                );
                continue;
            }
        };

        match validator.accept(&record) {
            Ok(()) => {
                debug!(
                    index,
                    title = %record.title,
                    read_count = record.read_count,
                    "Accepted item"
                );
                accepted.push(record);
            }
            Err(reason) => {
                rejected += 1;
                debug!(index, title = %record.title, %reason, "Rejected item");
            }
        }
    }

    info!(
        total = items.len(),
        accepted = accepted.len(),
        malformed,
        rejected,
        "Hot board pass complete"
    );
    accepted
}
