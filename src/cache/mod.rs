//! Result caching for repeated optimization requests.
//!
//! Values are stored as serialized bytes so the trait stays object safe;
//! [`get_json`] and [`set_json`] wrap the serde round trip.

mod memory;

pub use memory::{MemoryCache, NoOpCache};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::Result;

/// Key-value store for computed results.
///
/// Implementations must be shareable across threads; the build optimizer
/// consults the cache from parallel batch predictions.
pub trait ResultCache: Send + Sync {
    /// Returns `None` for missing or expired keys
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    fn invalidate(&self, key: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Number of live entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read and deserialize a cached value.
///
/// Entries that no longer deserialize (e.g. written by an older response
/// shape) are treated as misses.
pub fn get_json<T: DeserializeOwned>(cache: &dyn ResultCache, key: &str) -> Option<T> {
    let bytes = cache.get(key)?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(key, error = %err, "Discarding undecodable cache entry");
            None
        }
    }
}

pub fn set_json<T: Serialize>(cache: &dyn ResultCache, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    cache.set(key, &bytes)
}
