//! Identity types for cached object parts.
//!
//! An object is one upstream HTTP resource, named by the cache-zone key
//! it was requested through and its path. Objects are stored in
//! fixed-size parts; [`ObjectIndex`] names one part of one object and is
//! the unit the cache algorithm ranks. Both types are cheap value types:
//! callers pass copies around freely and the cache never hands out
//! references into its own state.

use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Hasher state shared by every fingerprint computation.
///
/// Fingerprints must stay stable for the lifetime of the process: lookup
/// entries created early have to keep matching the same keys later.
fn fingerprint_state() -> &'static ahash::RandomState {
    static STATE: OnceLock<ahash::RandomState> = OnceLock::new();
    STATE.get_or_init(ahash::RandomState::new)
}

/// Identity of one upstream object within a cache zone.
///
/// Carries a 64-bit fingerprint computed once at construction.
#[derive(Clone)]
pub struct ObjectId {
    key: Arc<str>,
    path: Arc<str>,
    hash: u64,
}

impl ObjectId {
    /// Create an object id from a cache-zone key and a request path.
    pub fn new(key: &str, path: &str) -> Self {
        let hash = fingerprint_state().hash_one((key, path));
        Self {
            key: Arc::from(key),
            path: Arc::from(path),
            hash,
        }
    }

    /// The cache-zone key this object belongs to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The request path of the upstream resource.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The object's process-stable fingerprint.
    pub fn fingerprint(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.key == other.key && self.path == other.path
    }
}

impl Eq for ObjectId {}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectId")
            .field("key", &self.key)
            .field("path", &self.path)
            .finish()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.path)
    }
}

/// Identity of one part of one object: the unit of cache residency.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ObjectIndex {
    id: ObjectId,
    part: u32,
    fingerprint: ObjectIndexHash,
}

impl ObjectIndex {
    /// Create the index for `part` of `id`.
    pub fn new(id: ObjectId, part: u32) -> Self {
        let fingerprint = ObjectIndexHash(fingerprint_state().hash_one((id.hash, part)));
        Self {
            id,
            part,
            fingerprint,
        }
    }

    /// The object this part belongs to.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The part number within the object.
    pub fn part(&self) -> u32 {
        self.part
    }

    /// The part's process-stable fingerprint, used as the lookup key.
    pub fn fingerprint(&self) -> ObjectIndexHash {
        self.fingerprint
    }
}

impl fmt::Display for ObjectIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.part)
    }
}

/// Fingerprint of an [`ObjectIndex`], stable for the process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ObjectIndexHash(u64);
