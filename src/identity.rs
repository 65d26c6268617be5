//! Outbound identity rotation: user-agent choice and a failure-counted proxy pool.
//!
//! Every request gets a fresh [`Identity`] from [`IdentityRotator::pick`]. When a
//! request through a proxy fails, the caller hands the identity back through
//! [`IdentityRotator::report_failure`]; once a proxy has failed
//! `failure_threshold` times it is evicted and never picked again.
//!
//! The pool sits behind a mutex so the rotator can be shared across tasks even
//! though the pipeline itself issues one request at a time.

use rand::seq::IndexedRandom;
use rand::{Rng, rng};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use url::Url;

/// Browser signatures used when the configuration supplies none.
pub const FALLBACK_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15",
];

/// A proxy as handed out inside an [`Identity`].
///
/// `id` is unique per registration, so two registrations of the same endpoint
/// are accounted separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHandle {
    pub id: u64,
    pub endpoint: String,
}

/// The outbound identity for one request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_agent: String,
    /// `None` means the pool was empty: go out directly.
    pub proxy: Option<ProxyHandle>,
}

#[derive(Debug)]
struct ProxyEntry {
    id: u64,
    endpoint: String,
    failures: u32,
}

/// Picks user-agents and proxies, and evicts proxies that keep failing.
#[derive(Debug)]
pub struct IdentityRotator {
    user_agents: Vec<String>,
    failure_threshold: u32,
    pool: Mutex<Vec<ProxyEntry>>,
    next_id: AtomicU64,
}

impl IdentityRotator {
    /// `user_agents` may be empty, in which case [`FALLBACK_USER_AGENTS`] is used.
    /// A `failure_threshold` of 0 is treated as 1.
    pub fn new(user_agents: Vec<String>, failure_threshold: u32) -> Self {
        let user_agents = if user_agents.is_empty() {
            FALLBACK_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            user_agents
        };
        Self {
            user_agents,
            failure_threshold: failure_threshold.max(1),
            pool: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Add a proxy to the pool with a clean failure count.
    ///
    /// Bare `host:port` endpoints are taken as `http://host:port`. Endpoints
    /// that still don't parse as URLs are refused with `None`.
    pub fn register(&self, endpoint: &str) -> Option<ProxyHandle> {
        let endpoint = match normalize_proxy_endpoint(endpoint) {
            Some(e) => e,
            None => {
                warn!(%endpoint, "Ignoring unparsable proxy endpoint");
                return None;
            }
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_pool().push(ProxyEntry {
            id,
            endpoint: endpoint.clone(),
            failures: 0,
        });
        debug!(id, %endpoint, "Registered proxy");
        Some(ProxyHandle { id, endpoint })
    }

    /// A random user-agent plus a random live proxy, if there is one.
    pub fn pick(&self) -> Identity {
        let mut rng = rng();
        let user_agent = self
            .user_agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_USER_AGENTS[0].to_string());

        let pool = self.lock_pool();
        let proxy = if pool.is_empty() {
            None
        } else {
            let entry = &pool[rng.random_range(0..pool.len())];
            Some(ProxyHandle {
                id: entry.id,
                endpoint: entry.endpoint.clone(),
            })
        };
        Identity { user_agent, proxy }
    }

    /// Count one failure against the identity's proxy.
    ///
    /// Returns `true` only for the call that evicted the proxy. Identities
    /// without a proxy, and proxies that are already gone, are ignored.
    pub fn report_failure(&self, identity: &Identity) -> bool {
        let Some(proxy) = &identity.proxy else {
            return false;
        };

        let mut pool = self.lock_pool();
        let Some(pos) = pool.iter().position(|e| e.id == proxy.id) else {
            debug!(
                id = proxy.id,
                "Failure reported for a proxy no longer in the pool"
            );
            return false;
        };

        pool[pos].failures += 1;
        let failures = pool[pos].failures;
        if failures >= self.failure_threshold {
            let evicted = pool.remove(pos);
            info!(
                id = evicted.id,
                endpoint = %evicted.endpoint,
                failures,
                remaining = pool.len(),
                "Evicted proxy after repeated failures"
            );
            true
        } else {
            warn!(
                id = proxy.id,
                endpoint = %proxy.endpoint,
                failures,
                threshold = self.failure_threshold,
                "Proxy failure recorded"
            );
            false
        }
    }

    /// Number of proxies still in rotation.
    pub fn active_count(&self) -> usize {
        self.lock_pool().len()
    }

    // A poisoned pool still holds consistent entries; keep using it.
    fn lock_pool(&self) -> std::sync::MutexGuard<'_, Vec<ProxyEntry>> {
        self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn normalize_proxy_endpoint(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let parsed = Url::parse(&candidate).ok()?;
    parsed.host_str()?;
    Some(candidate)
}
