//! Process-wide TTL cache of built street graphs.
//!
//! Building a graph for a busy area is the expensive part of a request, so
//! repeated solves over the same rounded bounding box and options reuse one
//! build until it expires. The clock is injectable so tests control expiry
//! deterministically. Two concurrent misses on the same key may both build;
//! correctness is unaffected because the build is a pure function of its
//! inputs, and the second result simply replaces the first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::debug;

use crate::graph::StreetGraph;
use crate::{BoundingBox, RoutingOptions};

/// Source of monotonic time for cache expiry.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock time, the production clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    graph: Arc<StreetGraph>,
    built_at: Instant,
}

/// TTL-bounded cache of built graphs, keyed by area key.
pub struct GraphCache<C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl GraphCache<SystemClock> {
    /// Cache with the given time-to-live and the system clock.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> GraphCache<C> {
    /// Cache with an injected clock, for deterministic expiry in tests.
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached graph for `key`, or build, store and return a
    /// fresh one when the entry is missing or older than the TTL.
    pub fn get_or_build<F>(&self, key: &str, build: F) -> Arc<StreetGraph>
    where
        F: FnOnce() -> StreetGraph,
    {
        let now = self.clock.now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(key)
            && now.duration_since(entry.built_at) < self.ttl
        {
            return Arc::clone(&entry.graph);
        }

        debug!("Graph cache miss for key {key}; building");
        let graph = Arc::new(build());
        entries.insert(
            key.to_owned(),
            CacheEntry {
                graph: Arc::clone(&graph),
                built_at: now,
            },
        );
        graph
    }

    /// Number of entries currently stored, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key for an area: the bounding box rounded to four decimal places
/// (~11 m, so nearby viewports share a build) joined with the serialised
/// routing options, which change the flags baked into the graph.
#[must_use]
pub fn area_key(bbox: &BoundingBox, options: &RoutingOptions) -> String {
    let opts = serde_json::to_string(options).unwrap_or_default();
    format!(
        "{:.4},{:.4},{:.4},{:.4}|{opts}",
        bbox.south, bbox.west, bbox.north, bbox.east
    )
}
