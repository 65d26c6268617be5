//! Acceptance rules for normalized records.

use crate::models::Record;
use thiserror::Error;
use tracing::info;

/// What to do with records whose engagement value is exactly zero.
///
/// The hot board reports 0 both for "no data" and for genuinely cold items, so
/// rejecting them also drops legitimately low-traffic entries. `Reject` is the
/// default; `--keep-zero-reads` switches to `Allow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroEngagementPolicy {
    #[default]
    Reject,
    Allow,
}

/// Why a record was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("empty title")]
    EmptyTitle,
    #[error("empty url")]
    EmptyUrl,
    #[error("zero engagement")]
    ZeroEngagement,
}

/// Decides which normalized records make it into the export.
///
/// A record needs a non-blank title and url. Its `read_count` must also be
/// non-zero unless the validator was built with [`ZeroEngagementPolicy::Allow`].
/// The checks never look at the comment or like counts because both are
/// derived from `read_count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordValidator {
    zero_engagement: ZeroEngagementPolicy,
}

impl RecordValidator {
    pub fn new(zero_engagement: ZeroEngagementPolicy) -> Self {
        Self { zero_engagement }
    }

    /// Check one record against the acceptance rules.
    ///
    /// # Arguments
    ///
    /// * `record` - A record produced by the normalizer
    ///
    /// # Returns
    ///
    /// `Ok(())` if the record should be exported, otherwise the first
    /// [`Rejection`] that applies. Title is checked before url, and url before
    /// engagement.
    pub fn accept(&self, record: &Record) -> Result<(), Rejection> {
        if record.title.trim().is_empty() {
            return Err(Rejection::EmptyTitle);
        }
        if record.url.trim().is_empty() {
            return Err(Rejection::EmptyUrl);
        }
        if record.read_count == 0 && self.zero_engagement == ZeroEngagementPolicy::Reject {
            info!(title = %record.title, "Skipping item without engagement");
            return Err(Rejection::ZeroEngagement);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn record(title: &str, url: &str, read_count: u64) -> Record {
        Record {
            title: title.to_string(),
            url: url.to_string(),
            published_at: Local::now(),
            read_count,
            comment_count: read_count / 100,
            like_count: read_count / 20,
            source: "Toutiao".to_string(),
            category: "Uncategorized".to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn test_accepts_complete_record() {
        let v = RecordValidator::default();
        let r = record("A", "https://www.toutiao.com/article/1", 1);
        assert_eq!(v.accept(&r), Ok(()));
    }

    #[test]
    fn test_zero_reads_rejected_by_default() {
        let v = RecordValidator::default();
        let r = record("A", "https://www.toutiao.com/article/1", 0);
        assert_eq!(v.accept(&r), Err(Rejection::ZeroEngagement));
    }

    #[test]
    fn test_zero_reads_allowed_by_policy() {
        let v = RecordValidator::new(ZeroEngagementPolicy::Allow);
        let r = record("A", "https://www.toutiao.com/article/1", 0);
        assert!(v.accept(&r).is_ok());
    }

    #[test]
    fn test_empty_title_and_url_rejected_regardless_of_policy() {
        let v = RecordValidator::new(ZeroEngagementPolicy::Allow);
        let blank_title = record("  ", "https://x.test", 5);
        assert_eq!(v.accept(&blank_title), Err(Rejection::EmptyTitle));
        assert_eq!(v.accept(&record("A", "", 5)), Err(Rejection::EmptyUrl));
    }

    #[test]
    fn test_rejection_reasons_read_as_log_text() {
        assert_eq!(Rejection::EmptyTitle.to_string(), "empty title");
        assert_eq!(Rejection::EmptyUrl.to_string(), "empty url");
        assert_eq!(Rejection::ZeroEngagement.to_string(), "zero engagement");
    }
}
