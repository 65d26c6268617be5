//! Small helpers shared by the fetcher, pipeline and exporters.
//!
//! - String truncation for log previews (UTF-8 safe, the feed is mostly CJK)
//! - JSON error classification for retry diagnostics
//! - Output path preparation

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` bytes are cut at the last character boundary at
/// or before `max`, and `"…(+N bytes)"` is appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A body cut off mid-transfer fails with an EOF error, as opposed to a body
/// that is complete but not JSON at all (an HTML challenge page, say).
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Make sure the directory that will hold `file_path` exists.
#[instrument(level = "info", skip_all, fields(path = %file_path))]
pub async fn ensure_parent_dir(file_path: &str) -> Result<(), Box<dyn Error>> {
    match Path::new(file_path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await?;
            info!(dir = %parent.display(), "Output directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}
