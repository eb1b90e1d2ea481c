use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::ResultCache;
use crate::errors::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    stored_at: Instant,
}

/// In-memory cache with a fixed time-to-live.
///
/// Expired entries are dropped on read of their key and swept from the
/// whole map on every write, so keys that are never requested again do
/// not accumulate.
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.stored_at.elapsed() >= self.ttl
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = {
            let entry = self.entries.get(key)?;
            if self.is_expired(&entry) {
                None
            } else {
                Some(entry.value.clone())
            }
        };
        if value.is_none() {
            // re-checked under the write lock; a concurrent fresh insert survives
            self.entries.remove_if(key, |_, entry| self.is_expired(entry));
        }
        value
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.retain(|_, entry| !self.is_expired(entry));
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.iter().filter(|e| !self.is_expired(e.value())).count()
    }
}

/// Cache that stores nothing; used when caching is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCache;

impl ResultCache for NoOpCache {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn invalidate(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        0
    }
}
