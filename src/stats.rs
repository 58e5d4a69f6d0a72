//! Point-in-time cache statistics.

/// Snapshot of a cache algorithm's counters.
///
/// `requests` and `hits` are monotonic; `objects` is the live residency
/// gauge at the instant of the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of object parts currently resident.
    pub objects: u64,
    /// Total lookups observed.
    pub requests: u64,
    /// Lookups that found a resident part.
    pub hits: u64,
}

impl CacheStats {
    /// Hit rate as a percentage (0.0 - 100.0).
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            (self.hits as f64 / self.requests as f64) * 100.0
        }
    }
}
