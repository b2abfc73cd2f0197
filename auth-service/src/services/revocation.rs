//! In-memory registry of revoked token identifiers.

use chrono::Utc;
use dashmap::DashMap;

/// Tracks jtis that were invalidated before their natural expiry.
///
/// Tokens are otherwise stateless and self-verifying; this set is what
/// gives logout and refresh rotation immediate effect. A record is only
/// meaningful until the token's own expiry, after that the expiry check
/// rejects the token anyway, so pruning is housekeeping, not correctness.
///
/// DashMap shards give concurrent reads with per-key serialized writes, no
/// global lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    revoked: DashMap<String, i64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            revoked: DashMap::new(),
        }
    }

    /// Record a jti as revoked until `expires_at` (Unix timestamp).
    pub fn invalidate(&self, jti: &str, expires_at: i64) {
        self.revoked.insert(jti.to_string(), expires_at);
    }

    /// Record a jti as revoked, failing when it already was. This is how
    /// refresh rotation claims a token exactly once under concurrent
    /// replay.
    pub fn invalidate_once(&self, jti: &str, expires_at: i64) -> bool {
        match self.revoked.entry(jti.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        }
    }

    /// O(1) lookup consulted on every token verification.
    pub fn is_invalidated(&self, jti: &str) -> bool {
        match self.revoked.get(jti) {
            Some(entry) => *entry.value() > Utc::now().timestamp(),
            None => false,
        }
    }

    /// Drop records whose tokens have expired on their own.
    pub fn prune_expired(&self) {
        let now = Utc::now().timestamp();
        let before = self.revoked.len();
        self.revoked.retain(|_, expires_at| *expires_at > now);
        let dropped = before.saturating_sub(self.revoked.len());
        if dropped > 0 {
            tracing::debug!(dropped, "Pruned expired revocation records");
        }
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_jti_is_reported_until_expiry() {
        let registry = SessionRegistry::new();
        let future = Utc::now().timestamp() + 3600;

        registry.invalidate("jti-1", future);

        assert!(registry.is_invalidated("jti-1"));
        assert!(!registry.is_invalidated("jti-2"));
    }

    #[test]
    fn expired_record_counts_as_absent() {
        let registry = SessionRegistry::new();
        let past = Utc::now().timestamp() - 1;

        registry.invalidate("jti-1", past);

        assert!(!registry.is_invalidated("jti-1"));
    }

    #[test]
    fn invalidate_once_claims_a_jti_exactly_once() {
        let registry = SessionRegistry::new();
        let future = Utc::now().timestamp() + 3600;

        assert!(registry.invalidate_once("jti-1", future));
        assert!(!registry.invalidate_once("jti-1", future));
    }

    #[test]
    fn prune_drops_only_expired_records() {
        let registry = SessionRegistry::new();
        let now = Utc::now().timestamp();

        registry.invalidate("old", now - 10);
        registry.invalidate("live", now + 3600);

        registry.prune_expired();

        assert_eq!(registry.len(), 1);
        assert!(registry.is_invalidated("live"));
    }
}
