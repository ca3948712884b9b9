//! Session token cache.
//!
//! The cache maps a bearer token to the owner identity it was last
//! validated as, so a warm token skips signature verification. It is an
//! optimization only: every operation degrades to a miss on failure, and
//! a miss just means the validator runs again.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use stockbook_core::OwnerId;
use tracing::warn;

/// Fallback session lifetime when none is configured.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 300;

pub trait TokenCache: Send + Sync {
    /// Owner this token last resolved to, if the entry is still live.
    fn get(&self, token: &str) -> Option<OwnerId>;

    /// Stores or refreshes the mapping with a full lifetime.
    fn put(&self, token: &str, owner: &OwnerId);

    /// Drops the mapping, ending the cached session.
    fn remove(&self, token: &str);
}

/// Process-local cache with per-entry expiry. Expired entries are purged
/// lazily when touched.
pub struct InMemoryTokenCache {
    entries: RwLock<HashMap<String, (OwnerId, DateTime<Utc>)>>,
    ttl: Duration,
}

impl InMemoryTokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for InMemoryTokenCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }
}

impl TokenCache for InMemoryTokenCache {
    fn get(&self, token: &str) -> Option<OwnerId> {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("session cache lock poisoned, treating as miss");
                return None;
            }
        };
        match entries.get(token) {
            Some((owner, expires_at)) if *expires_at > Utc::now() => Some(owner.clone()),
            Some(_) => {
                entries.remove(token);
                None
            }
            None => None,
        }
    }

    fn put(&self, token: &str, owner: &OwnerId) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(token.to_owned(), (owner.clone(), Utc::now() + self.ttl));
            }
            Err(_) => warn!("session cache lock poisoned, dropping write"),
        }
    }

    fn remove(&self, token: &str) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.remove(token);
            }
            Err(_) => warn!("session cache lock poisoned, dropping removal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> OwnerId {
        OwnerId::from_static("u1")
    }

    #[test]
    fn round_trips_within_ttl() {
        let cache = InMemoryTokenCache::default();
        cache.put("tok", &owner());
        assert_eq!(cache.get("tok"), Some(owner()));
    }

    #[test]
    fn expires_entries() {
        let cache = InMemoryTokenCache::new(Duration::seconds(0));
        cache.put("tok", &owner());
        assert_eq!(cache.get("tok"), None);
    }

    #[test]
    fn putting_again_slides_the_expiry() {
        let cache = InMemoryTokenCache::new(Duration::seconds(60));
        cache.put("tok", &owner());
        cache.put("tok", &owner());
        assert_eq!(cache.get("tok"), Some(owner()));
    }

    #[test]
    fn removal_ends_the_session() {
        let cache = InMemoryTokenCache::default();
        cache.put("tok", &owner());
        cache.remove("tok");
        assert_eq!(cache.get("tok"), None);
    }

    #[test]
    fn unknown_tokens_miss() {
        let cache = InMemoryTokenCache::default();
        assert_eq!(cache.get("never-seen"), None);
    }
}
