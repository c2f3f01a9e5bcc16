use dashmap::DashMap;
use std::time::Instant;

use super::dart::DartRouter;
use crate::query::pattern::Pattern;

/// Decaying popularity score per key pattern.
///
/// Scores decay exponentially with the hours since the pattern was last seen;
/// patterns already above the threshold accrue a logarithmic bonus on top of
/// the base increment, so sustained hot spots pull ahead of bursts.
pub struct PopularityTracker {
    entries: DashMap<String, PopularityEntry>,
    decay_factor: f64,
    threshold: f64,
    base_replication: usize,
    max_replication: usize,
}

struct PopularityEntry {
    score: f64,
    last_access: Instant,
}

impl PopularityTracker {
    pub fn new(
        base_replication: usize,
        max_replication: usize,
        threshold: f64,
        decay_factor: f64,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            decay_factor,
            threshold,
            base_replication,
            max_replication,
        }
    }

    fn decayed_score(&self, entry: &PopularityEntry, now: Instant) -> f64 {
        let hours = now.duration_since(entry.last_access).as_secs_f64() / 3600.0;
        entry.score * (-self.decay_factor * hours).exp()
    }

    /// Records one observation of `key_pattern`, decaying the stored score
    /// first and applying the rich-get-richer bonus above the threshold.
    pub fn record_query(&self, key_pattern: &str) {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key_pattern.to_string())
            .or_insert_with(|| PopularityEntry {
                score: 0.0,
                last_access: now,
            });

        let current = self.decayed_score(&entry, now);
        let mut increment = 1.0;
        if current > self.threshold {
            increment *= 1.0 + (current / self.threshold).log10();
        }
        entry.score = current + increment;
        entry.last_access = now;
    }

    /// The current (decayed) score for a pattern; zero when never seen.
    pub fn popularity(&self, key_pattern: &str) -> f64 {
        match self.entries.get(key_pattern) {
            Some(entry) => self.decayed_score(&entry, Instant::now()),
            None => 0.0,
        }
    }

    /// The effective replication factor for a pattern:
    /// `base + floor(log10(score / threshold))` once the score exceeds the
    /// threshold, capped at the configured maximum.
    pub fn replication_factor_for(&self, key_pattern: &str) -> usize {
        let score = self.popularity(key_pattern);
        if score < self.threshold {
            return self.base_replication;
        }
        let boost = (score / self.threshold).log10() as usize;
        (self.base_replication + boost).min(self.max_replication)
    }

    /// Forgets every score, e.g. between benchmark phases.
    pub fn reset(&self) {
        self.entries.clear();
    }

    /// All patterns with a meaningful score, hottest first.
    pub fn sorted_by_popularity(&self) -> Vec<(String, f64)> {
        let now = Instant::now();
        let mut scores: Vec<(String, f64)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), self.decayed_score(&entry, now)))
            .filter(|(_, score)| *score > 0.01)
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores
    }
}

/// A [`DartRouter`] that widens the replica set of popular exact keys.
///
/// The tracker is owned by the router and injected at construction; routing
/// behaviour is otherwise identical to the base router.
pub struct AdaptiveDartRouter {
    inner: DartRouter,
    tracker: PopularityTracker,
    enabled: bool,
}

impl AdaptiveDartRouter {
    pub fn new(inner: DartRouter, tracker: PopularityTracker) -> Self {
        Self {
            inner,
            tracker,
            enabled: true,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        tracing::info!(
            "adaptive replication {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn inner(&self) -> &DartRouter {
        &self.inner
    }

    pub fn tracker(&self) -> &PopularityTracker {
        &self.tracker
    }

    /// Exact-key destinations widened by the pattern's popularity: the vnode
    /// primary plus up to `adaptive_factor` ring replicas.
    pub fn partitions_for_key(&self, key: &str) -> Vec<usize> {
        if !self.enabled {
            return self.inner.partitions_for_key(key);
        }
        let factor = self.tracker.replication_factor_for(key);
        let primary = self.inner.partition_for_vnode(self.inner.vnode_for_key(key));
        let mut partitions = vec![primary];
        for partition in self.inner.ring_replicas(key, factor) {
            if partitions.len() >= factor + 1 {
                break;
            }
            if !partitions.contains(&partition) {
                partitions.push(partition);
            }
        }
        partitions
    }

    /// Destination set for a parsed key-side pattern, recording the pattern's
    /// literal in the popularity tracker along the way.
    pub fn destinations(&self, key_pattern: &Pattern) -> Vec<usize> {
        if self.enabled
            && let Some(literal) = key_pattern.literal()
        {
            self.tracker.record_query(literal);
        }
        match key_pattern {
            Pattern::Exact(k) => self.partitions_for_key(k),
            other => self.inner.destinations(other),
        }
    }
}
