//! tiered-lru: segmented LRU cache algorithm for an HTTP caching proxy.
//!
//! Every cache zone of the proxy owns one cache-algorithm instance that
//! decides which object *parts* stay resident and in what recency order.
//! This crate implements the segmented (tiered) LRU the proxy ships by
//! default:
//!
//! - **Identity**: [`ObjectId`] / [`ObjectIndex`] value types with
//!   process-stable fingerprints
//! - **Configuration**: [`CacheZoneConfig`], one section per zone
//! - **Engine**: [`TieredCache`], the tiered recency ranking
//! - **Seam**: [`CacheAlgorithm`], the object-safe interface the HTTP and
//!   storage layers call, plus [`new_cache_algorithm`] for by-name
//!   construction
//! - **Outbound**: [`RemovalSink`], where eviction notices go
//!
//! # Architecture
//!
//! ```text
//!                  +-----------------------------+
//!                  |        Lookup index         |
//!                  | (fingerprint -> tier, node) |
//!                  +--------------+--------------+
//!                                 |
//!                                 v
//!                   +------------------------+
//!                   | Tier 0 (hottest)       |
//!                   +------------------------+
//!                   | Tier 1                 |
//!                   +------------------------+
//!                   | Tier 2                 |
//!                   +------------------------+
//!                   | Tier 3 (admissions)    |
//!                   +-----------+------------+
//!                               | evict
//!                               v
//!                        +-------------+
//!                        | RemovalSink |  -> storage layer deletes parts
//!                        +-------------+
//! ```
//!
//! New parts enter at the front of the coldest tier. Each use promotes a
//! part by at most one tier, so a single burst of hits cannot push an
//! item past long-lived hot parts. When the coldest tier is full, slack
//! in warmer tiers is cascaded downward; only when every tier is full is
//! the globally coldest part evicted and announced on the sink.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tiered_lru::{CacheZoneConfig, ObjectId, ObjectIndex, SinkError, new_cache_algorithm};
//!
//! let config = CacheZoneConfig {
//!     id: "default".to_string(),
//!     path: "/var/cache/default".to_string(),
//!     storage_objects: 30,
//!     part_size: 2 * 1024 * 1024,
//!     algorithm: "lru".to_string(),
//! };
//!
//! let sink = Arc::new(|_evicted: ObjectIndex| Ok::<(), SinkError>(()));
//! let cache = new_cache_algorithm(&config, sink).unwrap();
//!
//! let part = ObjectIndex::new(ObjectId::new("default", "/video.mp4"), 0);
//! assert!(!cache.lookup(&part));
//! cache.promote_object(&part); // miss-promote admits
//! assert!(cache.lookup(&part));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod algorithm;
mod cache;
mod config;
mod error;
mod list;
mod object;
mod sink;
mod stats;

pub use algorithm::{CacheAlgorithm, new_cache_algorithm};
pub use cache::{TIER_COUNT, TieredCache, TieredCacheBuilder};
pub use config::CacheZoneConfig;
pub use error::{CacheError, CacheResult};
pub use object::{ObjectId, ObjectIndex, ObjectIndexHash};
pub use sink::{ChannelSink, RemovalSink, SinkError};
pub use stats::CacheStats;
