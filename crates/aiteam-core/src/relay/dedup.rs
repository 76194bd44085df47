use std::collections::HashMap;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a message body
pub fn body_digest(body: &str) -> String {
    Sha256::digest(body.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Content hashes of already-relayed messages with their last-seen time.
///
/// Private to one relay run. Entries older than the TTL are dropped by
/// [`DedupCache::evict`]; a zero TTL keeps everything.
#[derive(Debug)]
pub struct DedupCache {
    seen: HashMap<String, Instant>,
    ttl: Duration,
}

impl DedupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            ttl,
        }
    }

    /// Forget entries last seen more than the TTL before `now`
    pub fn evict(&mut self, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        let ttl = self.ttl;
        self.seen
            .retain(|_, seen| now.saturating_duration_since(*seen) <= ttl);
    }

    /// Remember `body` without asking whether it was new
    pub fn record(&mut self, body: &str, now: Instant) {
        self.seen.insert(body_digest(body), now);
    }

    /// Record `body`; returns `true` when it was not cached yet
    pub fn check_and_record(&mut self, body: &str, now: Instant) -> bool {
        let key = body_digest(body);
        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, now);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
