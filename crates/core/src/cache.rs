//! Fingerprint-keyed, short-TTL cache for composed recommendation payloads.
//!
//! An explicit, injected component: every server (or test) owns its own
//! instance, nothing is process-global. Concurrent writers for the same
//! fingerprint race last-writer-wins; recomputation is idempotent and cheap,
//! so correctness does not depend on exactly-once population. Eviction is
//! lazy on lookup — there is no background sweep.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::recommendation::{Constraints, Intent, RecommendationPayload};
use crate::geo::Coordinates;

pub const DEFAULT_TTL_SECS: u64 = 90;

/// Stable cache key over the request parameters that shape a payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

#[derive(Serialize)]
struct FingerprintParts<'a> {
    location: &'a Option<Coordinates>,
    constraints: &'a Option<Constraints>,
    intent: &'a Option<Intent>,
    limit: usize,
}

impl Fingerprint {
    pub fn compute(
        location: &Option<Coordinates>,
        constraints: &Option<Constraints>,
        intent: &Option<Intent>,
        limit: usize,
    ) -> Self {
        let parts = FingerprintParts { location, constraints, intent, limit };
        // Struct-ordered JSON is a stable serialization for these shapes.
        let bytes = serde_json::to_vec(&parts).expect("fingerprint parts always serialize");
        Self(blake3::hash(&bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct CacheEntry {
    payload: RecommendationPayload,
    expires_at: DateTime<Utc>,
}

pub struct RecommendationCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl RecommendationCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<RecommendationPayload> {
        self.get_at(fingerprint, Utc::now())
    }

    /// Lookup against an explicit clock. An entry past its expiry is removed
    /// and reported as a miss.
    pub fn get_at(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Option<RecommendationPayload> {
        {
            let entries = self.entries.read().expect("cache lock poisoned");
            match entries.get(fingerprint.as_str()) {
                Some(entry) if entry.expires_at >= now => return Some(entry.payload.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write().expect("cache lock poisoned");
        // Re-check under the write lock; a concurrent writer may have
        // refreshed the entry.
        if entries.get(fingerprint.as_str()).is_some_and(|e| e.expires_at < now) {
            entries.remove(fingerprint.as_str());
        }
        None
    }

    pub fn insert(&self, fingerprint: &Fingerprint, payload: RecommendationPayload) {
        self.insert_at(fingerprint, payload, Utc::now());
    }

    pub fn insert_at(
        &self,
        fingerprint: &Fingerprint,
        payload: RecommendationPayload,
        now: DateTime<Utc>,
    ) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            fingerprint.as_str().to_owned(),
            CacheEntry { payload, expires_at: now + self.ttl },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
