use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

/// Cache key: a 32-bit hash of an observed file path.
///
/// Distinct paths may collide. Colliding paths share one cache entry and
/// their byte ranges are mixed together; there is no stronger key available
/// at this layer, so this is accepted rather than disambiguated.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathHash(u32);

impl PathHash {
    pub const fn new(hash: u32) -> Self {
        Self(hash)
    }

    /// Hashes the raw bytes of a path with xxh32 (seed 0).
    pub fn of(path: impl AsRef<[u8]>) -> Self {
        Self(xxhash_rust::xxh32::xxh32(path.as_ref(), 0))
    }
}

impl From<u32> for PathHash {
    fn from(hash: u32) -> Self {
        Self(hash)
    }
}

impl From<PathHash> for u32 {
    fn from(hash: PathHash) -> Self {
        hash.0
    }
}

impl Display for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl Debug for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathHash({:08x})", self.0)
    }
}
