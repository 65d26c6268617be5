//! Rate-limited, identity-rotating JSON fetcher with bounded retries.
//!
//! # Architecture
//!
//! - [`FetchJson`]: the seam the pipeline depends on
//! - [`ResilientFetcher`]: the HTTP implementation, composing
//!   [`RateLimiter`] and [`IdentityRotator`]
//!
//! # Retry Strategy
//!
//! Each logical fetch makes at most `max_retries` attempts. Every attempt waits
//! its turn on the global limiter and goes out under a freshly picked identity.
//! A failed attempt is followed by a delay that grows with the attempt number:
//! ```text
//! delay = backoff_base * (attempt + 1)
//! ```
//! There is no delay after the last attempt. Running out of attempts yields
//! [`FetchExhausted`], which callers treat as "no data this pass".

use crate::config::Settings;
use crate::identity::{Identity, IdentityRotator};
use crate::rate_limit::RateLimiter;
use crate::utils::{looks_truncated, truncate_for_log};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, COOKIE, ORIGIN, REFERER, USER_AGENT};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9,en;q=0.8";
const REFERER_VALUE: &str = "https://www.toutiao.com/";
const ORIGIN_VALUE: &str = "https://www.toutiao.com";

/// Something that can GET a URL and hand back a JSON object.
pub trait FetchJson {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchExhausted>;
}

/// Why a single attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// A client for the picked proxy could not be built.
    #[error("cannot build proxied client: {0}")]
    Client(#[source] reqwest::Error),
    /// Connect, TLS, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    /// The body is not JSON.
    #[error("invalid JSON body (truncated: {truncated}): {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        truncated: bool,
    },
    /// Valid JSON, but the top level is not an object.
    #[error("top-level JSON value is not an object")]
    NotAnObject,
}

impl AttemptError {
    /// Whether the failure plausibly lies with the proxy rather than the feed.
    pub fn counts_against_proxy(&self) -> bool {
        matches!(self, AttemptError::Transport(_) | AttemptError::Status(_))
    }
}

/// Every attempt of a logical fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gave up on {url} after {attempts} attempts (last error: {last_error})")]
pub struct FetchExhausted {
    pub url: String,
    pub attempts: u32,
    /// Rendered error of the final attempt.
    pub last_error: String,
}

/// HTTP fetcher combining the global limiter, identity rotation and retries.
pub struct ResilientFetcher {
    rotator: IdentityRotator,
    limiter: RateLimiter,
    direct: reqwest::Client,
    proxied: Mutex<HashMap<String, reqwest::Client>>,
    cookie: Option<String>,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
}

impl fmt::Debug for ResilientFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientFetcher")
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("backoff_base", &self.backoff_base)
            .field("min_interval", &self.limiter.min_interval())
            .field("active_proxies", &self.rotator.active_count())
            .finish()
    }
}

impl ResilientFetcher {
    /// Build a fetcher from resolved settings around an already-populated rotator.
    pub fn new(
        settings: &Settings,
        rotator: IdentityRotator,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let direct = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            rotator,
            limiter: RateLimiter::new(settings.min_interval),
            direct,
            proxied: Mutex::new(HashMap::new()),
            cookie: settings.cookie.clone(),
            timeout: settings.timeout,
            max_retries: settings.max_retries.max(1),
            backoff_base: settings.backoff_base,
        })
    }

    pub fn rotator(&self) -> &IdentityRotator {
        &self.rotator
    }

    /// GET `url` and return its top-level JSON object, retrying on failure.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Value, FetchExhausted> {
        let total_t0 = Instant::now();
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            self.limiter.wait_turn().await;
            let identity = self.rotator.pick();
            let attempt_t0 = Instant::now();

            match self.attempt(url, &identity).await {
                Ok(value) => {
                    info!(
                        attempt = attempt + 1,
                        max = self.max_retries,
                        proxy = identity.proxy.as_ref().map(|p| p.endpoint.as_str()),
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        "Fetch succeeded"
                    );
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        %url,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        proxy = identity.proxy.as_ref().map(|p| p.endpoint.as_str()),
                        elapsed_ms_attempt = attempt_t0.elapsed().as_millis(),
                        error = %e,
                        "Fetch attempt failed"
                    );
                    if e.counts_against_proxy() {
                        self.rotator.report_failure(&identity);
                    }
                    last_error = e.to_string();

                    if attempt + 1 < self.max_retries {
                        let delay = self.backoff_base * (attempt + 1);
                        debug!(?delay, "Backing off before retry");
                        sleep(delay).await;
                    }
                }
            }
        }

        error!(
            %url,
            attempts = self.max_retries,
            elapsed_ms_total = total_t0.elapsed().as_millis(),
            "Fetch exhausted retries"
        );
        Err(FetchExhausted {
            url: url.to_string(),
            attempts: self.max_retries,
            last_error,
        })
    }

    async fn attempt(&self, url: &str, identity: &Identity) -> Result<Value, AttemptError> {
        let client = self.client_for(identity)?;

        let mut request = client
            .get(url)
            .timeout(self.timeout)
            .header(USER_AGENT, identity.user_agent.as_str())
            .header(ACCEPT, ACCEPT_VALUE)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .header(REFERER, REFERER_VALUE)
            .header(ORIGIN, ORIGIN_VALUE)
            .header(CONNECTION, "keep-alive");
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.as_str());
        }

        let response = request.send().await.map_err(AttemptError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }

        let body = response.text().await.map_err(AttemptError::Transport)?;
        info!(
            status = status.as_u16(),
            bytes = body.len(),
            preview = %truncate_for_log(&body, 300),
            "Feed responded"
        );

        let value: Value = serde_json::from_str(&body).map_err(|source| AttemptError::Decode {
            truncated: looks_truncated(&source),
            source,
        })?;
        if !value.is_object() {
            return Err(AttemptError::NotAnObject);
        }
        Ok(value)
    }

    fn client_for(&self, identity: &Identity) -> Result<reqwest::Client, AttemptError> {
        let Some(proxy) = &identity.proxy else {
            return Ok(self.direct.clone());
        };

        let mut cache = self.proxied.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = cache.get(&proxy.endpoint) {
            return Ok(client.clone());
        }
        let client = reqwest::Proxy::all(proxy.endpoint.as_str())
            .and_then(|p| reqwest::Client::builder().proxy(p).build())
            .map_err(AttemptError::Client)?;
        cache.insert(proxy.endpoint.clone(), client.clone());
        Ok(client)
    }
}

impl FetchJson for ResilientFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchExhausted> {
        self.fetch(url).await
    }
}
