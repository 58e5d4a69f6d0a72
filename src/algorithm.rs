//! The seam between a cache zone's algorithm and the rest of the proxy.
//!
//! Request handlers consult [`CacheAlgorithm::lookup`] and call
//! [`CacheAlgorithm::promote_object`] on hits; after fetching a missing
//! part from upstream the storage layer asks
//! [`CacheAlgorithm::should_keep`]. Each zone names its algorithm in
//! configuration and [`new_cache_algorithm`] constructs it.

use crate::cache::TieredCache;
use crate::config::CacheZoneConfig;
use crate::error::{CacheError, CacheResult};
use crate::object::ObjectIndex;
use crate::sink::RemovalSink;
use crate::stats::CacheStats;
use std::sync::Arc;

/// Cache-algorithm interface the proxy's HTTP and storage layers call.
///
/// One instance per cache zone, shared across worker threads.
pub trait CacheAlgorithm: Send + Sync {
    /// Whether this part is resident. Counts toward request/hit stats.
    fn lookup(&self, index: &ObjectIndex) -> bool;

    /// Admission hint for a part that has just been stored. Reports
    /// whether the storage layer should keep the part's bytes.
    fn should_keep(&self, index: &ObjectIndex) -> bool;

    /// Admit a new part.
    ///
    /// # Errors
    ///
    /// [`CacheError::AlreadyInCache`] if the part is resident.
    fn add_object(&self, index: &ObjectIndex) -> CacheResult<()>;

    /// Record that this part served a client request.
    fn promote_object(&self, index: &ObjectIndex);

    /// Forcibly evict parts; non-resident entries are ignored and the
    /// removal sink is not notified.
    fn remove(&self, indexes: &[ObjectIndex]);

    /// Bytes represented by the currently resident parts.
    fn consumed_size(&self) -> u64;

    /// Snapshot of the algorithm's counters.
    fn stats(&self) -> CacheStats;

    /// Apply a new part size and storage-object budget at runtime.
    fn change_config(&self, part_size: u64, storage_objects: u64);
}

impl CacheAlgorithm for TieredCache {
    fn lookup(&self, index: &ObjectIndex) -> bool {
        TieredCache::lookup(self, index)
    }

    fn should_keep(&self, index: &ObjectIndex) -> bool {
        TieredCache::should_keep(self, index)
    }

    fn add_object(&self, index: &ObjectIndex) -> CacheResult<()> {
        TieredCache::add_object(self, index)
    }

    fn promote_object(&self, index: &ObjectIndex) {
        TieredCache::promote_object(self, index)
    }

    fn remove(&self, indexes: &[ObjectIndex]) {
        TieredCache::remove(self, indexes)
    }

    fn consumed_size(&self) -> u64 {
        TieredCache::consumed_size(self)
    }

    fn stats(&self) -> CacheStats {
        TieredCache::stats(self)
    }

    fn change_config(&self, part_size: u64, storage_objects: u64) {
        TieredCache::change_config(self, part_size, storage_objects)
    }
}

/// Construct the cache algorithm a zone's configuration names.
///
/// # Errors
///
/// [`CacheError::UnknownAlgorithm`] if no algorithm is registered under
/// the configured name.
pub fn new_cache_algorithm(
    config: &CacheZoneConfig,
    sink: Arc<dyn RemovalSink>,
) -> CacheResult<Arc<dyn CacheAlgorithm>> {
    match config.algorithm.as_str() {
        "lru" => Ok(Arc::new(TieredCache::builder(config, sink).build())),
        other => Err(CacheError::UnknownAlgorithm(other.to_string())),
    }
}
