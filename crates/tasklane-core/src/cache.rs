//! Response cache with TTL, generation-based invalidation and request
//! coalescing
//!
//! Entries are keyed by request kind + subject id (+ question hash for
//! answers). An entry is served only while it is younger than its TTL and
//! its generation matches the subject's current generation. Bumping the
//! generation orphans every older entry at once; orphans are dropped on the
//! next lookup or by [`ResponseCache::sweep`].
//!
//! Concurrent misses for the same key share one in-flight fill. The fill
//! runs as a detached task, so a caller that stops waiting never cancels it
//! and the result still lands in the cache. Failures are handed to every
//! waiter and never cached.

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::GatewayError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result delivered to every caller waiting on a fill
pub type FillResult = Result<Artifact, GatewayError>;

type SharedFill = Shared<BoxFuture<'static, FillResult>>;

/// Cache key: request kind + subject id (+ normalized question hash)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ArtifactKind,
    subject_id: String,
    input_hash: Option<String>,
}

impl CacheKey {
    /// Key for a subject's summary
    #[must_use]
    pub fn summary(subject_id: &str) -> Self {
        Self {
            kind: ArtifactKind::Summary,
            subject_id: subject_id.to_string(),
            input_hash: None,
        }
    }

    /// Key for an answer. Questions differing only in case or whitespace
    /// share a key.
    #[must_use]
    pub fn answer(subject_id: &str, question: &str) -> Self {
        let normalized = question
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let digest = Sha256::digest(normalized.as_bytes());
        Self {
            kind: ArtifactKind::Answer,
            subject_id: subject_id.to_string(),
            input_hash: Some(format!("{digest:x}")),
        }
    }

    /// Subject this key belongs to
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Request kind
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.input_hash {
            Some(hash) => write!(f, "{}:{}:{}", self.kind, self.subject_id, &hash[..12]),
            None => write!(f, "{}:{}", self.kind, self.subject_id),
        }
    }
}

/// Never mutated in place; a new fill replaces it wholesale.
#[derive(Debug, Clone)]
struct CacheEntry {
    artifact: Artifact,
    created_at: Instant,
    ttl: Duration,
    generation: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.created_at + self.ttl
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SubjectGeneration {
    generation: u64,
    /// Last revision marker reported by persistence
    revision: Option<u64>,
}

/// Where a `join_or_fill` result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillSource {
    /// A valid entry appeared before this caller could start a fill
    Cache,
    /// Joined a fill another caller started
    Coalesced,
    /// This caller started the fill
    Leader,
}

/// Key → artifact store for expensive AI outputs
pub struct ResponseCache {
    ttl: Duration,
    entries: DashMap<CacheKey, CacheEntry>,
    generations: DashMap<String, SubjectGeneration>,
    in_flight: DashMap<(CacheKey, u64), SharedFill>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .field("subjects", &self.generations.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl ResponseCache {
    /// Create a cache whose entries live for `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            generations: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Default entry lifetime
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current generation of a subject
    #[must_use]
    pub fn generation(&self, subject_id: &str) -> u64 {
        self.generations
            .get(subject_id)
            .map(|g| g.generation)
            .unwrap_or(0)
    }

    /// Valid artifact for `key`, if any. Stale or orphaned entries are
    /// removed on the way.
    pub fn lookup(&self, key: &CacheKey) -> Option<Artifact> {
        let now = Instant::now();
        let current = self.generation(&key.subject_id);

        let stale = match self.entries.get(key) {
            Some(entry) if entry.generation == current && entry.is_fresh(now) => {
                return Some(entry.artifact.clone());
            }
            Some(_) => true,
            None => false,
        };

        if stale {
            self.entries.remove_if(key, |_, entry| {
                entry.generation != current || !entry.is_fresh(now)
            });
        }
        None
    }

    /// Store an artifact against the subject's current generation
    pub fn store(&self, key: CacheKey, artifact: Artifact) {
        let generation = self.generation(&key.subject_id);
        self.store_at(key, artifact, generation, self.ttl);
    }

    /// Store with an explicit TTL
    pub fn store_with_ttl(&self, key: CacheKey, artifact: Artifact, ttl: Duration) {
        let generation = self.generation(&key.subject_id);
        self.store_at(key, artifact, generation, ttl);
    }

    fn store_at(&self, key: CacheKey, artifact: Artifact, generation: u64, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                artifact,
                created_at: Instant::now(),
                ttl,
                generation,
            },
        );
    }

    /// Bump the subject's generation, orphaning all of its entries.
    /// Returns the new generation.
    pub fn invalidate(&self, subject_id: &str) -> u64 {
        let mut entry = self.generations.entry(subject_id.to_string()).or_default();
        entry.generation += 1;
        debug!(subject_id, generation = entry.generation, "Cache generation bumped");
        entry.generation
    }

    /// Record the persistence layer's revision marker for a subject,
    /// invalidating when it differs from the last one seen.
    /// Returns true when this caused an invalidation.
    pub fn observe_revision(&self, subject_id: &str, revision: u64) -> bool {
        let mut entry = self.generations.entry(subject_id.to_string()).or_default();
        let changed = entry.revision.is_some_and(|seen| seen != revision);
        if changed {
            entry.generation += 1;
            debug!(
                subject_id,
                revision,
                generation = entry.generation,
                "Subject revision changed, cache generation bumped"
            );
        }
        entry.revision = Some(revision);
        changed
    }

    /// Serve from cache, join an in-flight fill for the same key, or start
    /// a new fill.
    ///
    /// `admit` runs only when this caller is about to start a fill; an
    /// error from it is returned without registering anything. Callers who
    /// join an existing fill never run `admit`.
    pub async fn join_or_fill<A, F>(
        self: &Arc<Self>,
        key: CacheKey,
        admit: A,
        fill: F,
    ) -> (FillResult, FillSource)
    where
        A: FnOnce() -> Result<(), GatewayError>,
        F: Future<Output = FillResult> + Send + 'static,
    {
        let generation = self.generation(&key.subject_id);
        let flight_key = (key.clone(), generation);

        let (shared, source) = match self.in_flight.entry(flight_key.clone()) {
            Entry::Occupied(occupied) => (occupied.get().clone(), FillSource::Coalesced),
            Entry::Vacant(vacant) => {
                // A fill may have completed between the caller's lookup and now
                if let Some(artifact) = self.lookup(&key) {
                    return (Ok(artifact), FillSource::Cache);
                }
                if let Err(e) = admit() {
                    return (Err(e), FillSource::Leader);
                }

                let cache = Arc::clone(self);
                let handle = tokio::spawn(async move {
                    let result = fill.await;
                    if let Ok(artifact) = &result {
                        cache.store_at(key, artifact.clone(), generation, cache.ttl);
                    }
                    cache.in_flight.remove(&flight_key);
                    result
                });

                let shared = async move {
                    handle.await.unwrap_or_else(|e| {
                        warn!(error = %e, "Cache fill task failed");
                        Err(GatewayError::ProviderError(format!("fill task failed: {e}")))
                    })
                }
                .boxed()
                .shared();

                vacant.insert(shared.clone());
                (shared, FillSource::Leader)
            }
        };

        (shared.await, source)
    }

    /// Drop expired and orphaned entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            entry.is_fresh(now) && entry.generation == self.generation(&key.subject_id)
        });
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries (valid or not yet reclaimed)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of fills currently running
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
