//! Raw hot board item → [`Record`].
//!
//! The upstream schema is loose: keys come and go, numbers arrive as strings,
//! and the outlet name sits in one of several places. Field lookup therefore goes
//! through [`FallbackChain`]: an ordered list of (path, extractor) candidates
//! where the first non-empty result wins.
//!
//! Normalization only rejects items that lack a title or cluster id. A missing
//! or garbled engagement value becomes 0, and dropping those is left to
//! [`crate::validate::RecordValidator`].

use crate::config::{DEFAULT_ARTICLE_BASE, DEFAULT_TRENDING_BASE, Settings};
use crate::models::{RawItem, Record};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_SOURCE: &str = "Toutiao";
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Comments are estimated as 1% of the engagement value.
const COMMENT_DIVISOR: u64 = 100;
/// Likes are estimated as 5% of the engagement value.
const LIKE_DIVISOR: u64 = 20;

static ARTICLE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/article/([^/?#]+)")
        .expect("article id pattern is valid")
});

/// Why an item could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The `data` entry is not a JSON object.
    #[error("item is not a JSON object")]
    NotAnObject,
    /// A required field is absent or blank.
    #[error("missing required field {0}")]
    MissingField(&'static str),
}

/// One step into a JSON value.
#[derive(Debug, Clone, Copy)]
pub enum PathStep {
    Key(&'static str),
    Index(usize),
}

/// Turns the value found at a candidate path into text, or declines.
pub type Extractor = fn(&Value) -> Option<String>;

#[derive(Debug, Clone)]
struct Candidate {
    path: &'static [PathStep],
    extract: Extractor,
}

/// Ordered field candidates; the first that yields a non-empty string wins.
#[derive(Debug, Clone, Default)]
pub struct FallbackChain {
    candidates: Vec<Candidate>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate. Later candidates are only tried if earlier ones yield nothing.
    pub fn then(mut self, path: &'static [PathStep], extract: Extractor) -> Self {
        self.candidates.push(Candidate { path, extract });
        self
    }

    /// Resolve the chain against one raw item.
    ///
    /// Candidates are tried in the order they were added. A candidate yields
    /// nothing when its path is missing, when a step hits the wrong JSON type,
    /// when its extractor declines, or when the extracted text is empty.
    ///
    /// # Arguments
    ///
    /// * `item` - The raw hot board entry to read from
    ///
    /// # Returns
    ///
    /// The text from the first candidate that yields a non-empty string, or
    /// `None` if every candidate comes up empty (including an empty chain).
    pub fn first(&self, item: &RawItem) -> Option<String> {
        self.candidates.iter().find_map(|c| {
            lookup(item, c.path)
                .and_then(c.extract)
                .filter(|s| !s.is_empty())
        })
    }
}

fn lookup<'a>(item: &'a RawItem, path: &[PathStep]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = match first {
        PathStep::Key(k) => item.get(*k)?,
        PathStep::Index(_) => return None,
    };
    for step in rest {
        current = match step {
            PathStep::Key(k) => current.as_object()?.get(*k)?,
            PathStep::Index(i) => current.as_array()?.get(*i)?,
        };
    }
    Some(current)
}

/// Trimmed strings and numbers; objects, arrays, booleans and null decline.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer from a JSON number or a decimal string.
///
/// Fractional numbers are truncated. Negative, non-finite and non-numeric
/// values give `None`.
pub fn engagement_value(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

const MEDIA_NAME: &[PathStep] = &[PathStep::Key("Media"), PathStep::Key("Name")];
const MEDIA: &[PathStep] = &[PathStep::Key("Media")];
const SOURCE: &[PathStep] = &[PathStep::Key("source")];
const SOURCE_NAME: &[PathStep] = &[PathStep::Key("SourceName")];
const INTEREST_CATEGORY: &[PathStep] = &[PathStep::Key("InterestCategory"), PathStep::Index(0)];
const CATEGORY_NAME: &[PathStep] = &[PathStep::Key("CategoryName")];
const TAG: &[PathStep] = &[PathStep::Key("tag")];
const TITLE: &[PathStep] = &[PathStep::Key("Title")];
const CLUSTER_ID: &[PathStep] = &[PathStep::Key("ClusterId")];
const QUERY_WORD: &[PathStep] = &[PathStep::Key("QueryWord")];

/// Maps raw hot board items to [`Record`]s.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    article_base: String,
    trending_base: String,
    title: FallbackChain,
    cluster_id: FallbackChain,
    source: FallbackChain,
    category: FallbackChain,
    summary: FallbackChain,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ARTICLE_BASE, DEFAULT_TRENDING_BASE)
    }
}

impl RecordNormalizer {
    /// `article_base` and `trending_base` are URL prefixes the id is appended to.
    pub fn new(article_base: &str, trending_base: &str) -> Self {
        Self {
            article_base: article_base.to_string(),
            trending_base: trending_base.to_string(),
            title: FallbackChain::new().then(TITLE, scalar_text),
            cluster_id: FallbackChain::new().then(CLUSTER_ID, scalar_text),
            source: FallbackChain::new()
                .then(MEDIA_NAME, scalar_text)
                .then(MEDIA, scalar_text)
                .then(SOURCE, scalar_text)
                .then(SOURCE_NAME, scalar_text),
            category: FallbackChain::new()
                .then(INTEREST_CATEGORY, scalar_text)
                .then(CATEGORY_NAME, scalar_text)
                .then(TAG, scalar_text),
            summary: FallbackChain::new().then(QUERY_WORD, scalar_text),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.article_base, &settings.trending_base)
    }

    /// Normalize one entry of the feed's `data` array.
    pub fn normalize_value(&self, item: &Value) -> Result<Record, NormalizeError> {
        match item {
            Value::Object(map) => self.normalize(map),
            _ => Err(NormalizeError::NotAnObject),
        }
    }

    pub fn normalize(&self, item: &RawItem) -> Result<Record, NormalizeError> {
        let title = self
            .title
            .first(item)
            .ok_or(NormalizeError::MissingField("Title"))?;
        let cluster_id = self
            .cluster_id
            .first(item)
            .ok_or(NormalizeError::MissingField("ClusterId"))?;

        let url = self.canonical_url(item, &cluster_id);
        let read_count = item.get("HotValue").and_then(engagement_value).unwrap_or(0);

        Ok(Record {
            title,
            url,
            published_at: Local::now(),
            read_count,
            comment_count: read_count / COMMENT_DIVISOR,
            like_count: read_count / LIKE_DIVISOR,
            source: self
                .source
                .first(item)
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            category: self
                .category
                .first(item)
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            summary: self.summary.first(item).unwrap_or_default(),
        })
    }

    /// Article URL when `Url` carries an `/article/<id>` segment, trending URL otherwise.
    fn canonical_url(&self, item: &RawItem, cluster_id: &str) -> String {
        let article_id = item
            .get("Url")
            .and_then(Value::as_str)
            .and_then(|u| ARTICLE_ID.captures_iter(u).last())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        match article_id {
            Some(id) => format!("{}{}", self.article_base, id),
            None => format!("{}{}", self.trending_base, cluster_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawItem {
        match v {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_article_url_and_derived_counts() {
        let item = raw(json!({
            "Title": "A",
            "ClusterId": "123",
            "HotValue": "1000",
            "Url": "https://www.toutiao.com/article/555/"
        }));
        let record = RecordNormalizer::default().normalize(&item).unwrap();

        assert!(record.url.ends_with("/article/555"));
        assert_eq!(record.url, "https://www.toutiao.com/article/555");
        assert_eq!(record.read_count, 1000);
        assert_eq!(record.comment_count, 10);
        assert_eq!(record.like_count, 50);
        assert_eq!(record.source, DEFAULT_SOURCE);
        assert_eq!(record.category, DEFAULT_CATEGORY);
        assert_eq!(record.summary, "");
    }

    #[test]
    fn test_empty_title_is_rejected() {
        let item = raw(json!({"Title": "", "ClusterId": "123", "HotValue": "1000"}));
        let err = RecordNormalizer::default().normalize(&item).unwrap_err();
        assert_eq!(err, NormalizeError::MissingField("Title"));
    }

    #[test]
    fn test_missing_cluster_id_is_rejected() {
        let item = raw(json!({"Title": "A", "ClusterId": null, "HotValue": "1000"}));
        let err = RecordNormalizer::default().normalize(&item).unwrap_err();
        assert_eq!(err, NormalizeError::MissingField("ClusterId"));
        assert_eq!(err.to_string(), "missing required field ClusterId");
    }

    #[test]
    fn test_numeric_cluster_id_and_trending_fallback() {
        let item = raw(json!({"Title": "A", "ClusterId": 7788, "HotValue": 42}));
        let record = RecordNormalizer::default().normalize(&item).unwrap();
        assert_eq!(record.url, "https://www.toutiao.com/trending/7788");
    }

    #[test]
    fn test_url_without_article_segment_uses_trending() {
        let item = raw(json!({
            "Title": "A",
            "ClusterId": "123",
            "Url": "https://www.toutiao.com/trending/999/?rank=1"
        }));
        let record = RecordNormalizer::default().normalize(&item).unwrap();
        assert_eq!(record.url, "https://www.toutiao.com/trending/123");
    }

    #[test]
    fn test_article_id_takes_last_segment_and_drops_query() {
        let normalizer = RecordNormalizer::default();

        let url_for = |url: &str| {
            let item = raw(json!({"Title": "A", "ClusterId": "1", "Url": url}));
            normalizer.normalize(&item).unwrap().url
        };

        assert_eq!(
            url_for("https://x.test/article/1/article/2/"),
            "https://www.toutiao.com/article/2"
        );
        assert_eq!(
            url_for("https://x.test/article/77?log_from=hot"),
            "https://www.toutiao.com/article/77"
        );
        assert_eq!(
            url_for("https://x.test/article/"),
            "https://www.toutiao.com/trending/1"
        );
    }

    #[test]
    fn test_unparsable_engagement_defaults_to_zero() {
        let normalizer = RecordNormalizer::default();
        for hot in [
            json!("n/a"),
            json!(-5),
            json!(null),
            json!({"v": 1}),
            json!("12.5"),
        ] {
            let item = raw(json!({"Title": "A", "ClusterId": "1", "HotValue": hot}));
            let record = normalizer.normalize(&item).unwrap();
            assert_eq!(record.read_count, 0);
            assert_eq!(record.comment_count, 0);
            assert_eq!(record.like_count, 0);
        }

        let absent = raw(json!({"Title": "A", "ClusterId": "1"}));
        assert_eq!(normalizer.normalize(&absent).unwrap().read_count, 0);
    }

    #[test]
    fn test_engagement_value_accepts_numbers_and_padded_strings() {
        assert_eq!(engagement_value(&json!(" 2500 ")), Some(2500));
        assert_eq!(engagement_value(&json!(2500)), Some(2500));
        assert_eq!(engagement_value(&json!(99.9)), Some(99));
        assert_eq!(engagement_value(&json!(true)), None);
    }

    #[test]
    fn test_derived_counts_floor() {
        let item = raw(json!({"Title": "A", "ClusterId": "1", "HotValue": "199"}));
        let record = RecordNormalizer::default().normalize(&item).unwrap();
        assert_eq!(record.comment_count, 1);
        assert_eq!(record.like_count, 9);
    }

    #[test]
    fn test_source_fallback_precedence() {
        let n = RecordNormalizer::default();

        let nested = raw(json!({
            "Title": "A", "ClusterId": "1",
            "Media": {"Name": "Xinhua"}, "source": "ignored", "SourceName": "ignored"
        }));
        assert_eq!(n.normalize(&nested).unwrap().source, "Xinhua");

        let flat = raw(json!({
            "Title": "A", "ClusterId": "1",
            "Media": "People's Daily", "source": "ignored"
        }));
        assert_eq!(n.normalize(&flat).unwrap().source, "People's Daily");

        let nameless_media = raw(json!({
            "Title": "A", "ClusterId": "1",
            "Media": {"Id": 3}, "SourceName": "CCTV"
        }));
        assert_eq!(n.normalize(&nameless_media).unwrap().source, "CCTV");

        let blank = raw(json!({"Title": "A", "ClusterId": "1", "Media": "", "source": "  "}));
        assert_eq!(n.normalize(&blank).unwrap().source, DEFAULT_SOURCE);
    }

    #[test]
    fn test_category_fallback_precedence() {
        let n = RecordNormalizer::default();

        let interest = raw(json!({
            "Title": "A", "ClusterId": "1",
            "InterestCategory": ["society", "finance"], "CategoryName": "ignored"
        }));
        assert_eq!(n.normalize(&interest).unwrap().category, "society");

        let empty_list = raw(json!({
            "Title": "A", "ClusterId": "1",
            "InterestCategory": [], "tag": "sports"
        }));
        assert_eq!(n.normalize(&empty_list).unwrap().category, "sports");

        let name = raw(json!({
            "Title": "A", "ClusterId": "1",
            "CategoryName": "tech", "tag": "ignored"
        }));
        assert_eq!(n.normalize(&name).unwrap().category, "tech");
    }

    #[test]
    fn test_summary_from_query_word() {
        let item = raw(json!({"Title": "A", "ClusterId": "1", "QueryWord": "heatwave"}));
        let record = RecordNormalizer::default().normalize(&item).unwrap();
        assert_eq!(record.summary, "heatwave");
    }

    #[test]
    fn test_normalize_value_rejects_non_objects() {
        let n = RecordNormalizer::default();
        let err = n.normalize_value(&json!("A")).unwrap_err();

        assert_eq!(err, NormalizeError::NotAnObject);
        assert_eq!(err.to_string(), "item is not a JSON object");
        let item = json!({"Title": "A", "ClusterId": "1"});
        assert!(n.normalize_value(&item).is_ok());
    }

    #[test]
    fn test_normalize_is_idempotent_except_timestamp() {
        let item = raw(json!({
            "Title": "A", "ClusterId": "123", "HotValue": "1000",
            "Url": "https://www.toutiao.com/article/555/", "Media": {"Name": "Xinhua"}
        }));
        let n = RecordNormalizer::default();
        let first = n.normalize(&item).unwrap();
        let mut second = n.normalize(&item).unwrap();

        second.published_at = first.published_at;
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_url_bases() {
        let n = RecordNormalizer::new("https://m.example.test/a/", "https://m.example.test/t/");
        let item = raw(json!({"Title": "A", "ClusterId": "9"}));
        let record = n.normalize(&item).unwrap();
        assert_eq!(record.url, "https://m.example.test/t/9");
    }

    #[test]
    fn test_fallback_chain_skips_blank_candidates() {
        const MISSING: &[PathStep] = &[PathStep::Key("missing")];
        const BLANK: &[PathStep] = &[PathStep::Key("blank")];
        const PRESENT: &[PathStep] = &[PathStep::Key("present")];

        let chain = FallbackChain::new()
            .then(MISSING, scalar_text)
            .then(BLANK, scalar_text)
            .then(PRESENT, scalar_text);
        let item = raw(json!({"blank": "   ", "present": " yes "}));

        assert_eq!(chain.first(&item).as_deref(), Some("yes"));
        assert_eq!(FallbackChain::new().first(&item), None);
    }
}
