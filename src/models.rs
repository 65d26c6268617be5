//! Data models for hot board items and their normalized representation.
//!
//! - [`RawItem`]: one untyped entry of the upstream `data` array
//! - [`Record`]: the canonical flat row handed to the exporters
//!
//! The upstream feed uses PascalCase keys (`Title`, `ClusterId`, `HotValue`, ...)
//! and changes shape without notice, so raw items are kept as plain JSON maps
//! and only [`Record`] is strongly typed.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the upstream `data` array, exactly as received.
pub type RawItem = Map<String, Value>;

/// Format used when a timestamp is rendered for humans (spreadsheet, logs).
pub const PUBLISHED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A normalized hot board entry.
///
/// Constructed only by [`crate::normalize::RecordNormalizer`]; nothing mutates
/// a record after that, it is either dropped by the validator or exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The headline shown on the hot board.
    pub title: String,
    /// Canonical article or trending-topic URL.
    pub url: String,
    /// When the item was normalized. The feed carries no reliable per-item time.
    pub published_at: DateTime<Local>,
    /// The engagement scalar (`HotValue`).
    pub read_count: u64,
    /// Derived from `read_count`.
    pub comment_count: u64,
    /// Derived from `read_count`.
    pub like_count: u64,
    /// Publishing outlet, or the platform name when none is given.
    pub source: String,
    pub category: String,
    /// The search phrase Toutiao associates with the topic.
    pub summary: String,
}

impl Record {
    /// `published_at` rendered with [`PUBLISHED_AT_FORMAT`].
    pub fn published_at_display(&self) -> String {
        self.published_at.format(PUBLISHED_AT_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Record {
        Record {
            title: "Test Article".to_string(),
            url: "https://www.toutiao.com/article/555".to_string(),
            published_at: Local.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap(),
            read_count: 1000,
            comment_count: 10,
            like_count: 50,
            source: "Toutiao".to_string(),
            category: "Uncategorized".to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn test_published_at_display() {
        assert_eq!(sample().published_at_display(), "2025-05-06 14:30:00");
    }

    #[test]
    fn test_record_serialization() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"read_count\":1000"));
        assert!(json.contains("article/555"));

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_raw_item_is_plain_json_map() {
        let item: RawItem = serde_json::from_str(r#"{"Title":"A","HotValue":"1000"}"#).unwrap();
        assert_eq!(item.get("Title").and_then(Value::as_str), Some("A"));
    }
}
