//! The segmented LRU engine.
//!
//! [`TieredCache`] ranks resident object parts across [`TIER_COUNT`]
//! recency tiers. Tier 0 holds the most recently useful parts; new
//! admissions enter at the front of the coldest tier and climb one tier
//! per recorded use, so a single burst of hits cannot displace long-lived
//! hot parts.
//!
//! # Capacity
//!
//! A zone configured for `storage_objects` parts gives each tier a
//! capacity of `storage_objects / TIER_COUNT`; the division remainder is
//! deliberately left unused so the tiers stay equal-sized.
//!
//! # Locking
//!
//! One mutex guards the whole state: tier lists, lookup index and the
//! request/hit counters mutated on the hot path. Tier and index updates
//! must land atomically, so finer-grained locking would buy nothing. No
//! operation blocks inside the critical section; eviction notices are
//! handed to a non-blocking [`RemovalSink`].

use crate::config::CacheZoneConfig;
use crate::error::{CacheError, CacheResult};
use crate::list::{NodeId, TierList};
use crate::object::{ObjectIndex, ObjectIndexHash};
use crate::sink::RemovalSink;
use crate::stats::CacheStats;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, error, info};

/// Number of recency tiers. Tier 0 is the hottest; tier `TIER_COUNT - 1`
/// is where new admissions land.
pub const TIER_COUNT: usize = 4;

/// Evictions a resize-down trimmer performs per lock hold, so concurrent
/// lookups and promotions keep interleaving while a large trim runs.
const TRIM_BATCH: usize = 64;

/// Where a resident fingerprint lives.
#[derive(Debug, Clone, Copy)]
struct Entry {
    tier: usize,
    node: NodeId,
}

/// Mutex-protected engine state.
struct TierState {
    tiers: [TierList<ObjectIndex>; TIER_COUNT],
    lookup: AHashMap<ObjectIndexHash, Entry>,

    /// Per-tier capacity: `storage_objects / TIER_COUNT`.
    tier_capacity: usize,
    part_size: u64,

    /// A resize-down trimmer is running; tiers may transiently exceed
    /// `tier_capacity` until it converges.
    trim_pending: bool,

    requests: u64,
    hits: u64,
}

impl TierState {
    fn new(storage_objects: u64, part_size: u64) -> Self {
        Self {
            tiers: std::array::from_fn(|_| TierList::new()),
            lookup: AHashMap::new(),
            tier_capacity: (storage_objects / TIER_COUNT as u64) as usize,
            part_size,
            trim_pending: false,
            requests: 0,
            hits: 0,
        }
    }

    fn objects(&self) -> u64 {
        self.tiers.iter().map(|tier| tier.len() as u64).sum()
    }

    /// Admit a part into the coldest tier. Assumes the lock is held, so
    /// the promote-on-miss path can admit inside its own critical
    /// section.
    fn admit(&mut self, sink: &Arc<dyn RemovalSink>, oi: &ObjectIndex) -> CacheResult<()> {
        let fingerprint = oi.fingerprint();
        if self.lookup.contains_key(&fingerprint) {
            return Err(CacheError::AlreadyInCache);
        }

        let coldest = TIER_COUNT - 1;
        if self.tiers[coldest].len() >= self.tier_capacity {
            self.reclaim_coldest_slot(sink);
        }

        let node = self.tiers[coldest].push_front(oi.clone());
        self.lookup.insert(
            fingerprint,
            Entry {
                tier: coldest,
                node,
            },
        );
        info!(part = %oi, "storing part in cache");
        Ok(())
    }

    /// Make room for one admission in a full coldest tier.
    ///
    /// If some warmer tier has slack, the front of every tier below it is
    /// cascaded one tier up (to that tier's back), freeing exactly one
    /// slot at the bottom without evicting anything. Only when every tier
    /// is full does the globally coldest part get evicted.
    fn reclaim_coldest_slot(&mut self, sink: &Arc<dyn RemovalSink>) {
        let coldest = TIER_COUNT - 1;
        if self.tiers[coldest].is_empty() {
            error!("coldest tier is empty while reclaiming space in it");
            return;
        }

        let slack = (0..coldest)
            .rev()
            .find(|&tier| self.tiers[tier].len() < self.tier_capacity);

        let Some(slack) = slack else {
            // Every tier is full: drop the back of the coldest tier.
            self.evict_coldest(sink);
            return;
        };

        for tier in ((slack + 1)..=coldest).rev() {
            let Some(part) = self.tiers[tier].pop_front() else {
                continue;
            };
            let fingerprint = part.fingerprint();
            let node = self.tiers[tier - 1].push_back(part);
            match self.lookup.get_mut(&fingerprint) {
                Some(entry) => {
                    entry.tier = tier - 1;
                    entry.node = node;
                }
                None => error!("tier list part missing from the lookup index"),
            }
        }
    }

    /// Evict the back of the coldest tier and publish it on the sink.
    fn evict_coldest(&mut self, sink: &Arc<dyn RemovalSink>) {
        let Some(part) = self.tiers[TIER_COUNT - 1].pop_back() else {
            return;
        };
        self.lookup.remove(&part.fingerprint());
        publish_eviction(sink, part);
    }

    /// Move a part one tier up, or to the front of tier 0. A miss admits.
    fn promote(&mut self, sink: &Arc<dyn RemovalSink>, oi: &ObjectIndex) {
        let fingerprint = oi.fingerprint();
        let Some(entry) = self.lookup.get(&fingerprint).copied() else {
            // Not resident yet: admission, inside this same critical
            // section so a racing promote of the same part cannot
            // double-admit.
            if let Err(e) = self.admit(sink, oi) {
                error!(part = %oi, error = %e, "admitting part on promote miss failed");
            }
            return;
        };

        if entry.tier == 0 {
            // Nowhere to climb; refresh the position within the tier.
            self.tiers[0].move_to_front(entry.node);
            return;
        }

        let upper = entry.tier - 1;
        if self.tiers[upper].len() >= self.tier_capacity {
            // The upper tier is full: swap with its coldest member so no
            // resident part is lost to a promotion.
            if let Some(displaced) = self.tiers[upper].pop_back() {
                let displaced_fingerprint = displaced.fingerprint();
                let node = self.tiers[entry.tier].push_front(displaced);
                match self.lookup.get_mut(&displaced_fingerprint) {
                    Some(displaced_entry) => {
                        displaced_entry.tier = entry.tier;
                        displaced_entry.node = node;
                    }
                    None => error!("tier list part missing from the lookup index"),
                }
            }
        }

        let Some(part) = self.tiers[entry.tier].remove(entry.node) else {
            error!("lookup index points at a vacant tier node");
            return;
        };
        let node = self.tiers[upper].push_front(part);
        self.lookup.insert(fingerprint, Entry { tier: upper, node });
    }

    /// Full consistency scan; panics on violation. Debug builds run this
    /// after every mutation, production constructions skip it.
    fn verify(&self) {
        let resident: usize = self.tiers.iter().map(TierList::len).sum();
        if resident != self.lookup.len() {
            error!(
                resident,
                indexed = self.lookup.len(),
                "tier contents and lookup index diverge"
            );
            panic!("cache invariant violated: tier contents and lookup index diverge");
        }

        if !self.trim_pending {
            for (tier, list) in self.tiers.iter().enumerate() {
                if list.len() > self.tier_capacity {
                    error!(
                        tier,
                        len = list.len(),
                        capacity = self.tier_capacity,
                        "tier over capacity"
                    );
                    panic!("cache invariant violated: tier {tier} over capacity");
                }
            }
        }

        for (fingerprint, entry) in &self.lookup {
            match self.tiers[entry.tier].get(entry.node) {
                Some(part) if part.fingerprint() == *fingerprint => {}
                _ => {
                    error!(tier = entry.tier, "lookup entry does not match its tier node");
                    panic!("cache invariant violated: lookup entry does not match its tier node");
                }
            }
        }
    }
}

/// Publish one eviction, tolerating a refusing sink.
///
/// The eviction is logically complete either way; the storage layer
/// reconciles parts the cache no longer tracks.
fn publish_eviction(sink: &Arc<dyn RemovalSink>, part: ObjectIndex) {
    debug!(part = %part, "evicting part");
    if let Err(e) = sink.remove(part) {
        error!(error = %e, "removal sink refused an eviction notice");
    }
}

/// Segmented LRU over [`TIER_COUNT`] recency tiers.
///
/// All operations are safe to call from any thread; callers hold only
/// value-typed [`ObjectIndex`] copies and never references into the
/// cache.
pub struct TieredCache {
    state: Arc<Mutex<TierState>>,
    sink: Arc<dyn RemovalSink>,
    check_invariants: bool,
    shutdown: Arc<AtomicBool>,
}

impl TieredCache {
    /// Start building a cache for `config`, announcing evictions on
    /// `sink`.
    pub fn builder(config: &CacheZoneConfig, sink: Arc<dyn RemovalSink>) -> TieredCacheBuilder {
        TieredCacheBuilder {
            storage_objects: config.storage_objects,
            part_size: config.part_size,
            sink,
            check_invariants: cfg!(debug_assertions),
        }
    }

    /// Whether this part is resident. Counts a request, and a hit when
    /// resident; does not change recency.
    pub fn lookup(&self, oi: &ObjectIndex) -> bool {
        let mut state = self.state.lock();
        state.requests += 1;
        let hit = state.lookup.contains_key(&oi.fingerprint());
        if hit {
            state.hits += 1;
        }
        hit
    }

    /// Admission hint for a part that has just been stored.
    ///
    /// Admits the part if it is new and reports whether the storage layer
    /// should keep its bytes. The current policy keeps everything.
    pub fn should_keep(&self, oi: &ObjectIndex) -> bool {
        match self.add_object(oi) {
            Ok(()) | Err(CacheError::AlreadyInCache) => {}
            Err(e) => error!(part = %oi, error = %e, "storing part failed"),
        }
        true
    }

    /// Admit a new part at the front of the coldest tier.
    ///
    /// If the coldest tier is full, slack from warmer tiers is cascaded
    /// down first; if every tier is full, the globally coldest part is
    /// evicted and published on the removal sink.
    ///
    /// # Errors
    ///
    /// [`CacheError::AlreadyInCache`] if the fingerprint is resident.
    pub fn add_object(&self, oi: &ObjectIndex) -> CacheResult<()> {
        let mut state = self.state.lock();
        let result = state.admit(&self.sink, oi);
        if self.check_invariants {
            state.verify();
        }
        result
    }

    /// Record a use of this part.
    ///
    /// A resident part climbs exactly one tier (swapping with the coldest
    /// member of a full upper tier), or moves to the front of tier 0 if
    /// it is already there. A part that is not resident is admitted.
    pub fn promote_object(&self, oi: &ObjectIndex) {
        let mut state = self.state.lock();
        state.promote(&self.sink, oi);
        if self.check_invariants {
            state.verify();
        }
    }

    /// Forcibly evict parts. Non-resident entries are silently ignored
    /// and the removal sink is not notified; the caller is already
    /// driving the removal.
    pub fn remove(&self, ois: &[ObjectIndex]) {
        let mut state = self.state.lock();
        for oi in ois {
            if let Some(entry) = state.lookup.remove(&oi.fingerprint()) {
                state.tiers[entry.tier].remove(entry.node);
            }
        }
        if self.check_invariants {
            state.verify();
        }
    }

    /// Bytes represented by the currently resident parts.
    pub fn consumed_size(&self) -> u64 {
        let state = self.state.lock();
        state.objects() * state.part_size
    }

    /// Snapshot of the request/hit counters and the residency gauge.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            objects: state.objects(),
            requests: state.requests,
            hits: state.hits,
        }
    }

    /// Live length of every tier, hottest first.
    pub fn tier_sizes(&self) -> [usize; TIER_COUNT] {
        let state = self.state.lock();
        std::array::from_fn(|tier| state.tiers[tier].len())
    }

    /// Apply a new part size and storage-object budget while traffic
    /// continues.
    ///
    /// Growing takes effect immediately. Shrinking also takes effect
    /// immediately for admissions, and a detached trimmer thread evicts
    /// from the back of each over-full tier, coldest tier first, until
    /// every tier fits again; tiers may transiently exceed the new
    /// capacity until it converges. Evictions made by the trimmer are
    /// published on the removal sink.
    pub fn change_config(&self, new_part_size: u64, new_storage_objects: u64) {
        let new_capacity = (new_storage_objects / TIER_COUNT as u64) as usize;
        let start_trimmer = {
            let mut state = self.state.lock();
            state.part_size = new_part_size;
            state.tier_capacity = new_capacity;
            let over_capacity = state
                .tiers
                .iter()
                .any(|tier| tier.len() > new_capacity);
            let start = over_capacity && !state.trim_pending;
            if start {
                state.trim_pending = true;
            }
            start
        };
        if start_trimmer {
            self.spawn_trimmer();
        }
    }

    fn spawn_trimmer(&self) {
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        let shutdown = Arc::clone(&self.shutdown);
        let spawned = thread::Builder::new()
            .name("cache-trim".to_string())
            .spawn(move || trim_loop(&state, &sink, &shutdown));
        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn the resize-down trimmer");
            self.state.lock().trim_pending = false;
        }
    }
}

impl Drop for TieredCache {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Body of the resize-down trimmer thread.
///
/// Each pass holds the lock for at most [`TRIM_BATCH`] evictions and then
/// yields, so traffic interleaves with a large trim. The trimmer exits
/// once every tier fits the capacity it re-reads under the lock, which
/// also picks up any further resize that happened while it ran.
fn trim_loop(state: &Mutex<TierState>, sink: &Arc<dyn RemovalSink>, shutdown: &AtomicBool) {
    debug!("resize-down trimmer started");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let mut st = state.lock();
        let mut evicted = 0;
        'tiers: for tier in (0..TIER_COUNT).rev() {
            while st.tiers[tier].len() > st.tier_capacity {
                let Some(part) = st.tiers[tier].pop_back() else {
                    break;
                };
                st.lookup.remove(&part.fingerprint());
                publish_eviction(sink, part);
                evicted += 1;
                if evicted == TRIM_BATCH {
                    break 'tiers;
                }
            }
        }
        if evicted == 0 {
            st.trim_pending = false;
            debug!("resize-down trimmer finished");
            return;
        }
        drop(st);
        thread::yield_now();
    }
}

/// Builder for [`TieredCache`].
pub struct TieredCacheBuilder {
    storage_objects: u64,
    part_size: u64,
    sink: Arc<dyn RemovalSink>,
    check_invariants: bool,
}

impl TieredCacheBuilder {
    /// Enable or disable the per-operation consistency scan. Defaults to
    /// on in debug builds and off in release builds; a violation panics.
    pub fn check_invariants(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    /// Build the cache.
    pub fn build(self) -> TieredCache {
        TieredCache {
            state: Arc::new(Mutex::new(TierState::new(
                self.storage_objects,
                self.part_size,
            ))),
            sink: self.sink,
            check_invariants: self.check_invariants,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectId;
    use crate::sink::SinkError;
    use std::time::{Duration, Instant};

    fn zone_config() -> CacheZoneConfig {
        CacheZoneConfig {
            id: "default".to_string(),
            path: "/some/path".to_string(),
            storage_objects: 30, // 4 tiers of 7, effective capacity 28
            part_size: 2 * 1024 * 1024,
            algorithm: "lru".to_string(),
        }
    }

    fn noop_sink() -> Arc<dyn RemovalSink> {
        Arc::new(|_evicted: ObjectIndex| Ok::<(), SinkError>(()))
    }

    /// Sink that records every notification it receives.
    fn recording_sink() -> (Arc<dyn RemovalSink>, Arc<Mutex<Vec<ObjectIndex>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&log);
        let sink: Arc<dyn RemovalSink> = Arc::new(move |evicted: ObjectIndex| {
            sink_log.lock().push(evicted);
            Ok::<(), SinkError>(())
        });
        (sink, log)
    }

    fn new_cache() -> TieredCache {
        TieredCache::builder(&zone_config(), noop_sink())
            .check_invariants(true)
            .build()
    }

    fn part(path: &str, n: u32) -> ObjectIndex {
        ObjectIndex::new(ObjectId::new("1.1", path), n)
    }

    fn tier_of(cache: &TieredCache, oi: &ObjectIndex) -> Option<usize> {
        let state = cache.state.lock();
        state.lookup.get(&oi.fingerprint()).map(|entry| entry.tier)
    }

    fn front_of_tier(cache: &TieredCache, tier: usize) -> Option<ObjectIndex> {
        let state = cache.state.lock();
        state.tiers[tier].front().cloned()
    }

    fn back_of_tier(cache: &TieredCache, tier: usize) -> Option<ObjectIndex> {
        let state = cache.state.lock();
        state.tiers[tier].back().cloned()
    }

    /// Fill the cache to its effective capacity with a known layout:
    /// parts 0-6 in tier 0, 7-13 in tier 1, 14-20 in tier 2 and 21-27 in
    /// tier 3, each tier ordered most recently promoted first.
    fn fill_cache(cache: &TieredCache) {
        let per_tier = zone_config().storage_objects as u32 / TIER_COUNT as u32;
        let effective = per_tier * TIER_COUNT as u32;
        for i in 0..effective {
            let oi = part("/path/to/many/objects", i);
            for _ in 0..(TIER_COUNT as u32 - i / per_tier) {
                cache.promote_object(&oi);
            }
        }
        assert_eq!(cache.stats().objects, effective as u64, "cache not full");
    }

    #[test]
    fn test_lookup_and_remove() {
        let cache = new_cache();
        let oi = part("/path", 3);

        assert!(!cache.lookup(&oi));
        cache.add_object(&oi).unwrap();
        assert!(cache.lookup(&oi));

        cache.remove(std::slice::from_ref(&oi));
        assert!(!cache.lookup(&oi));
    }

    #[test]
    fn test_lookup_counts_requests_and_hits() {
        let cache = new_cache();
        let oi = part("/path", 0);

        assert!(!cache.lookup(&oi));
        let stats = cache.stats();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.hits, 0);

        cache.add_object(&oi).unwrap();
        assert!(cache.lookup(&oi));
        let stats = cache.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_add_places_part_at_coldest_front() {
        let cache = new_cache();
        let oi = part("/path", 3);

        cache.add_object(&oi).unwrap();
        assert_eq!(cache.stats().objects, 1);
        assert_eq!(tier_of(&cache, &oi), Some(TIER_COUNT - 1));
        assert_eq!(front_of_tier(&cache, TIER_COUNT - 1), Some(oi));
    }

    #[test]
    fn test_double_add_is_rejected() {
        let cache = new_cache();
        let oi = part("/path", 0);

        cache.add_object(&oi).unwrap();
        assert_eq!(cache.add_object(&oi), Err(CacheError::AlreadyInCache));
        assert_eq!(cache.stats().objects, 1);
    }

    #[test]
    fn test_consumed_size() {
        let cache = new_cache();
        cache.add_object(&part("/path", 0)).unwrap();
        for i in 0..16 {
            cache.add_object(&part("/path/to/other/object", i)).unwrap();
        }
        assert_eq!(cache.stats().objects, 17);
        assert_eq!(cache.consumed_size(), 17 * zone_config().part_size);
    }

    #[test]
    fn test_should_keep_admits_and_is_idempotent() {
        let cache = new_cache();
        let oi = part("/path", 3);

        assert!(cache.should_keep(&oi));
        assert_eq!(cache.stats().objects, 1);
        assert!(cache.should_keep(&oi));
        assert_eq!(cache.stats().objects, 1);
    }

    #[test]
    fn test_promotions_in_empty_cache() {
        let cache = new_cache();
        let oi = part("/path", 3);

        // Miss-promote admits into the coldest tier.
        cache.promote_object(&oi);
        assert_eq!(cache.stats().objects, 1);
        assert_eq!(tier_of(&cache, &oi), Some(TIER_COUNT - 1));

        // Each further promotion climbs exactly one tier.
        cache.promote_object(&oi);
        assert_eq!(tier_of(&cache, &oi), Some(TIER_COUNT - 2));

        for _ in 0..TIER_COUNT {
            cache.promote_object(&oi);
        }
        assert_eq!(tier_of(&cache, &oi), Some(0));
        assert_eq!(front_of_tier(&cache, 0), Some(oi));
    }

    #[test]
    fn test_promotion_in_full_cache() {
        let cache = new_cache();
        fill_cache(&cache);

        let oi = part("/path/to/tested/object", 0);
        for expected_tier in (0..TIER_COUNT).rev() {
            cache.promote_object(&oi);
            assert_eq!(
                tier_of(&cache, &oi),
                Some(expected_tier),
                "part not in the expected tier"
            );
        }
        // Promotion never increased the total residency.
        assert_eq!(cache.stats().objects, 28);
    }

    #[test]
    fn test_promote_swap_preserves_tier_sizes() {
        let cache = new_cache();
        fill_cache(&cache);
        assert_eq!(cache.tier_sizes(), [7, 7, 7, 7]);

        // Back of tier 3 is part 21, back of tier 2 is part 14.
        let promoted = part("/path/to/many/objects", 21);
        let displaced = part("/path/to/many/objects", 14);
        assert_eq!(back_of_tier(&cache, 3).as_ref(), Some(&promoted));
        assert_eq!(back_of_tier(&cache, 2).as_ref(), Some(&displaced));

        cache.promote_object(&promoted);

        assert_eq!(cache.tier_sizes(), [7, 7, 7, 7]);
        assert_eq!(tier_of(&cache, &promoted), Some(2));
        assert_eq!(front_of_tier(&cache, 2), Some(promoted));
        assert_eq!(tier_of(&cache, &displaced), Some(3));
        assert_eq!(front_of_tier(&cache, 3), Some(displaced));
    }

    #[test]
    fn test_promotion_to_the_front_of_the_list() {
        let cache = new_cache();
        fill_cache(&cache);

        let first = part("/path/to/tested/object", 0);
        let second = part("/path/to/tested/object", 1);
        for _ in 0..TIER_COUNT {
            cache.promote_object(&first);
            cache.promote_object(&second);
        }

        cache.promote_object(&first);
        assert_eq!(front_of_tier(&cache, 0).as_ref(), Some(&first));

        cache.promote_object(&second);
        assert_eq!(front_of_tier(&cache, 0).as_ref(), Some(&second));
    }

    #[test]
    fn test_admission_cascades_slack_upward() {
        let cache = new_cache();
        for i in 0..8 {
            cache.add_object(&part("/path", i)).unwrap();
        }

        // The 8th admission moved the coldest tier's front (part 6) to
        // the back of tier 2 instead of evicting anything.
        assert_eq!(cache.tier_sizes(), [0, 0, 1, 7]);
        assert_eq!(tier_of(&cache, &part("/path", 6)), Some(2));
        assert_eq!(front_of_tier(&cache, 3), Some(part("/path", 7)));
        assert_eq!(back_of_tier(&cache, 3), Some(part("/path", 0)));
    }

    #[test]
    fn test_full_cache_evicts_oldest_admitted() {
        let (sink, log) = recording_sink();
        let cache = TieredCache::builder(&zone_config(), sink)
            .check_invariants(true)
            .build();

        for i in 0..28 {
            cache.add_object(&part("/path", i)).unwrap();
        }
        assert_eq!(cache.tier_sizes(), [7, 7, 7, 7]);
        assert!(log.lock().is_empty());

        cache.add_object(&part("/path", 28)).unwrap();

        let evicted = log.lock();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0], part("/path", 0));
        assert_eq!(cache.stats().objects, 28);
    }

    #[test]
    fn test_remove_does_not_notify_sink() {
        let (sink, log) = recording_sink();
        let cache = TieredCache::builder(&zone_config(), sink)
            .check_invariants(true)
            .build();

        let a = part("/path", 0);
        let b = part("/path", 1);
        cache.add_object(&a).unwrap();
        cache.add_object(&b).unwrap();

        let missing = part("/path", 9);
        cache.remove(&[a, missing, b]);

        assert_eq!(cache.stats().objects, 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_undersized_zone_evicts_on_every_admission() {
        let config = CacheZoneConfig {
            storage_objects: 2, // below TIER_COUNT: per-tier capacity 0
            ..zone_config()
        };
        let (sink, log) = recording_sink();
        // The per-tier bound cannot hold with zero capacity, so the
        // consistency scan stays off.
        let cache = TieredCache::builder(&config, sink)
            .check_invariants(false)
            .build();

        // Admission still succeeds and the part is resident; each new
        // admission evicts the previous one, so exactly one part stays.
        let first = part("/path", 0);
        cache.add_object(&first).unwrap();
        assert_eq!(cache.stats().objects, 1);
        assert!(cache.lookup(&first));
        assert!(log.lock().is_empty());

        let second = part("/path", 1);
        cache.add_object(&second).unwrap();
        assert_eq!(cache.stats().objects, 1);
        assert!(!cache.lookup(&first));
        assert!(cache.lookup(&second));
        assert_eq!(*log.lock(), vec![first]);

        assert_eq!(cache.add_object(&second), Err(CacheError::AlreadyInCache));
    }

    #[test]
    fn test_resize_up_makes_room() {
        let cache = new_cache();
        fill_cache(&cache);
        let old_size = cache.stats().objects;

        cache.change_config(10, old_size + 20);
        cache.promote_object(&part("/path/to/tested/object", 0));
        assert_eq!(cache.stats().objects, old_size + 1);
    }

    #[test]
    fn test_resize_down_trims_coldest_first() {
        let (sink, log) = recording_sink();
        let cache = TieredCache::builder(&zone_config(), sink)
            .check_invariants(true)
            .build();
        fill_cache(&cache);
        let old_size = cache.stats().objects;

        cache.change_config(2, old_size / 2); // new per-tier capacity: 3
        let expected = (old_size / 2 / TIER_COUNT as u64) * TIER_COUNT as u64;

        let deadline = Instant::now() + Duration::from_secs(5);
        while cache.stats().objects > expected {
            assert!(Instant::now() < deadline, "trimmer did not converge");
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(cache.tier_sizes(), [3, 3, 3, 3]);
        let evicted = log.lock();
        assert_eq!(evicted.len() as u64, old_size - expected);
        // Coldest tier first: the first evictions all come from the
        // layout's tier-3 backs (parts 21-24), oldest first.
        assert_eq!(evicted[0], part("/path/to/many/objects", 21));
        assert_eq!(evicted[1], part("/path/to/many/objects", 22));
    }

    #[test]
    fn test_promote_back_of_each_tier() {
        let cache = new_cache();
        fill_cache(&cache);

        for i in 0..30 {
            let tier = i % TIER_COUNT;
            let Some(oi) = back_of_tier(&cache, tier) else {
                continue;
            };
            cache.promote_object(&oi);
            assert_eq!(cache.stats().objects, 28);
        }
    }

    #[test]
    fn test_promote_back_of_each_tier_after_resize() {
        let cache = new_cache();
        fill_cache(&cache);
        cache.change_config(1, zone_config().storage_objects / 2);

        for i in 0..30 {
            let tier = i % TIER_COUNT;
            let Some(oi) = back_of_tier(&cache, tier) else {
                continue;
            };
            cache.promote_object(&oi);
        }
    }
}
