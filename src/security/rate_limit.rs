//! Fixed-window rate limiting with tiered limits.
//!
//! Windows are contiguous, fixed-length buckets computed by truncating
//! wall-clock time to the window size, so every gateway instance sharing the
//! counter store agrees on window boundaries without coordination; small
//! clock skew only shifts which window a borderline request lands in.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::config::{RateLimitConfig, RouteClass};
use crate::security::identity::{ClientKey, Tier};
use crate::security::store::CounterStore;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Seconds until the current window rolls over; meaningful when denied.
    pub retry_after_secs: u64,
}

impl RateLimitDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after_secs: 0,
        }
    }
}

/// Admission interface the dispatcher depends on; substitutable in tests.
#[async_trait]
pub trait RateLimit: Send + Sync {
    async fn admit(&self, client: &ClientKey, class: RouteClass) -> RateLimitDecision;
}

/// Fixed-window limiter over a shared [`CounterStore`].
///
/// Tier settings are swappable at runtime for config hot reload; the store
/// is fixed for the process lifetime.
pub struct FixedWindowLimiter {
    store: Arc<dyn CounterStore>,
    settings: ArcSwap<RateLimitConfig>,
}

impl FixedWindowLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            settings: ArcSwap::from_pointee(config),
        }
    }

    /// Replace tier settings (config reload path).
    pub fn update_settings(&self, config: RateLimitConfig) {
        self.settings.store(Arc::new(config));
    }

    fn limit_for(config: &RateLimitConfig, tier: Tier, class: RouteClass) -> u64 {
        // Search routes are expensive regardless of who calls them.
        if class == RouteClass::Search {
            return config.search_limit;
        }
        match tier {
            Tier::Anonymous => config.anonymous_limit,
            Tier::Authenticated => config.authenticated_limit,
        }
    }

    fn now_epoch_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RateLimit for FixedWindowLimiter {
    async fn admit(&self, client: &ClientKey, class: RouteClass) -> RateLimitDecision {
        let config = self.settings.load();
        if !config.enabled {
            return RateLimitDecision::allowed();
        }

        let window = config.window_secs.max(1);
        let now = Self::now_epoch_secs();
        let window_start = now - (now % window);
        let retry_after_secs = (window_start + window - now).max(1);

        let key = format!("{}:{}:{}", client.key, class, window_start);
        let count = self
            .store
            .incr(&key, Duration::from_secs(retry_after_secs))
            .await;

        let limit = Self::limit_for(&config, client.tier, class);
        if count <= limit {
            RateLimitDecision::allowed()
        } else {
            tracing::warn!(
                client = %client.key,
                class = %class,
                count,
                limit,
                "Rate limit exceeded"
            );
            RateLimitDecision {
                allowed: false,
                retry_after_secs,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::store::InMemoryCounterStore;

    fn limiter(config: RateLimitConfig) -> FixedWindowLimiter {
        FixedWindowLimiter::new(Arc::new(InMemoryCounterStore::new()), config)
    }

    fn anon() -> ClientKey {
        ClientKey::anonymous("1.2.3.4:9999".parse().unwrap())
    }

    #[tokio::test]
    async fn test_limit_boundary() {
        let lim = limiter(RateLimitConfig {
            enabled: true,
            window_secs: 60,
            anonymous_limit: 3,
            authenticated_limit: 10,
            search_limit: 2,
        });

        // The request that reaches exactly the limit is still admitted.
        for _ in 0..3 {
            assert!(lim.admit(&anon(), RouteClass::Default).await.allowed);
        }
        let denied = lim.admit(&anon(), RouteClass::Default).await;
        assert!(!denied.allowed);
        assert!(denied.retry_after_secs > 0);
    }

    #[tokio::test]
    async fn test_identity_separation() {
        let lim = limiter(RateLimitConfig {
            enabled: true,
            window_secs: 60,
            anonymous_limit: 1,
            authenticated_limit: 1,
            search_limit: 1,
        });

        assert!(lim.admit(&anon(), RouteClass::Default).await.allowed);
        assert!(!lim.admit(&anon(), RouteClass::Default).await.allowed);

        // A different identity has its own counter.
        let user = ClientKey::authenticated("abc");
        assert!(lim.admit(&user, RouteClass::Default).await.allowed);
    }

    #[tokio::test]
    async fn test_search_tier_is_stricter() {
        let lim = limiter(RateLimitConfig {
            enabled: true,
            window_secs: 60,
            anonymous_limit: 10,
            authenticated_limit: 10,
            search_limit: 1,
        });

        let user = ClientKey::authenticated("abc");
        assert!(lim.admit(&user, RouteClass::Search).await.allowed);
        assert!(!lim.admit(&user, RouteClass::Search).await.allowed);
        // The default-class counter for the same user is untouched.
        assert!(lim.admit(&user, RouteClass::Default).await.allowed);
    }

    #[tokio::test]
    async fn test_window_rollover_admits_again() {
        let lim = limiter(RateLimitConfig {
            enabled: true,
            window_secs: 1,
            anonymous_limit: 1,
            authenticated_limit: 1,
            search_limit: 1,
        });

        assert!(lim.admit(&anon(), RouteClass::Default).await.allowed);
        assert!(!lim.admit(&anon(), RouteClass::Default).await.allowed);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(lim.admit(&anon(), RouteClass::Default).await.allowed);
    }

    #[tokio::test]
    async fn test_disabled_admits_everything() {
        let lim = limiter(RateLimitConfig {
            enabled: false,
            window_secs: 60,
            anonymous_limit: 1,
            authenticated_limit: 1,
            search_limit: 1,
        });
        for _ in 0..100 {
            assert!(lim.admit(&anon(), RouteClass::Default).await.allowed);
        }
    }

    #[tokio::test]
    async fn test_settings_update_applies() {
        let lim = limiter(RateLimitConfig {
            enabled: true,
            window_secs: 60,
            anonymous_limit: 1,
            authenticated_limit: 1,
            search_limit: 1,
        });
        assert!(lim.admit(&anon(), RouteClass::Default).await.allowed);
        assert!(!lim.admit(&anon(), RouteClass::Default).await.allowed);

        let mut updated = RateLimitConfig::default();
        updated.enabled = false;
        lim.update_settings(updated);
        assert!(lim.admit(&anon(), RouteClass::Default).await.allowed);
    }
}
