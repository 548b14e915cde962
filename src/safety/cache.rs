//! Time-boxed cache for externally sourced token-safety findings
//!
//! Only findings are cached. Decode results never are: identical bytes can
//! come back attached to a different intent.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::finding::SafetyFinding;

/// Default lifetime of a cached scan
pub const DEFAULT_FINDINGS_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedFindings {
    findings: Vec<SafetyFinding>,
    stored_at: Instant,
}

/// mint -> findings, each entry expiring after `ttl`
pub struct FindingsCache {
    entries: DashMap<String, CachedFindings>,
    ttl: Duration,
}

impl FindingsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached findings for `mint`, evicting the entry if it has expired
    pub fn get(&self, mint: &str) -> Option<Vec<SafetyFinding>> {
        let fresh = self.entries.get(mint).and_then(|entry| {
            if self.is_expired(entry.value()) {
                None
            } else {
                Some(entry.value().findings.clone())
            }
        });

        if fresh.is_none() && self.entries.remove_if(mint, |_, e| self.is_expired(e)).is_some() {
            debug!(mint = %mint, "Evicted expired safety findings");
        }
        fresh
    }

    pub fn insert(&self, mint: &str, findings: Vec<SafetyFinding>) {
        self.entries.insert(
            mint.to_string(),
            CachedFindings {
                findings,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, mint: &str) {
        self.entries.remove(mint);
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired safety findings");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CachedFindings) -> bool {
        entry.stored_at.elapsed() >= self.ttl
    }
}

impl Default for FindingsCache {
    fn default() -> Self {
        Self::new(DEFAULT_FINDINGS_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::finding::{FindingLevel, Verification};

    fn findings() -> Vec<SafetyFinding> {
        vec![SafetyFinding::new(
            "liquidity",
            FindingLevel::Warning,
            Verification::Verified,
            "Liquidity below $10k",
        )]
    }

    #[test]
    fn test_insert_and_get() {
        let cache = FindingsCache::default();
        cache.insert("mint1", findings());

        assert_eq!(cache.get("mint1"), Some(findings()));
        assert_eq!(cache.get("mint2"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_ttl_always_expired() {
        let cache = FindingsCache::new(Duration::ZERO);
        cache.insert("mint1", findings());

        assert_eq!(cache.get("mint1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = FindingsCache::new(Duration::ZERO);
        cache.insert("a", findings());
        cache.insert("b", findings());

        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());

        let cache = FindingsCache::default();
        cache.insert("a", findings());
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate() {
        let cache = FindingsCache::default();
        cache.insert("mint1", findings());
        cache.invalidate("mint1");
        assert_eq!(cache.get("mint1"), None);
    }
}
