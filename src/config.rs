//! Cache zone configuration.

use serde::Deserialize;

/// Configuration for one cache zone.
///
/// The proxy configuration carries one such section per zone; the zone's
/// cache algorithm is constructed from it and receives part-size and
/// storage-object updates through `change_config` on reload.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheZoneConfig {
    /// Zone identifier, unique across the proxy configuration.
    pub id: String,

    /// Filesystem root of the zone's storage.
    pub path: String,

    /// Total number of object parts the zone may keep resident.
    #[serde(default = "CacheZoneConfig::default_storage_objects")]
    pub storage_objects: u64,

    /// Size of one object part in bytes.
    #[serde(default = "CacheZoneConfig::default_part_size")]
    pub part_size: u64,

    /// Cache algorithm name. `"lru"` is the only built-in.
    #[serde(default = "CacheZoneConfig::default_algorithm")]
    pub algorithm: String,
}

impl CacheZoneConfig {
    fn default_storage_objects() -> u64 {
        1024
    }

    fn default_part_size() -> u64 {
        2 * 1024 * 1024 // 2MB
    }

    fn default_algorithm() -> String {
        "lru".to_string()
    }
}
