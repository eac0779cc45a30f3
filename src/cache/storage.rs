//! Cache storage trait and in-memory implementation.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::traits::{Cacheable, CachedQueryResult, EntryMeta};

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync + 'static {
  /// Get cached entities for a query.
  fn read<T: Cacheable>(&self, key: &str) -> Result<Option<CachedQueryResult<T>>>;

  /// Replace the entities stored for a query. Clears the invalidated flag.
  fn write<T: Cacheable>(&self, key: &str, entities: &[T]) -> Result<()>;

  /// Mark a query result as stale. No-op for unknown keys.
  fn invalidate(&self, key: &str) -> Result<()>;

  /// Get entry bookkeeping without deserializing the entities.
  fn meta(&self, key: &str) -> Result<Option<EntryMeta>>;
}

struct Entry {
  entity_type: &'static str,
  data: Vec<serde_json::Value>,
  meta: EntryMeta,
}

#[derive(Default)]
struct Entries {
  by_key: HashMap<String, Entry>,
  /// Shared across keys so a version never repeats for a key
  last_version: u64,
}

impl Entries {
  fn next_version(&mut self) -> u64 {
    self.last_version += 1;
    self.last_version
  }
}

/// In-memory cache storage. Contents live as long as the process.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<Entries>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, Entries>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl CacheStorage for MemoryStorage {
  fn read<T: Cacheable>(&self, key: &str) -> Result<Option<CachedQueryResult<T>>> {
    let entries = self.lock()?;

    let entry = match entries.by_key.get(key) {
      Some(entry) if entry.entity_type == T::entity_type() => entry,
      _ => return Ok(None),
    };

    let entities = entry
      .data
      .iter()
      .map(|value| serde_json::from_value(value.clone()))
      .collect::<serde_json::Result<Vec<T>>>()
      .map_err(|e| eyre!("Failed to deserialize cached {}: {}", T::entity_type(), e))?;

    Ok(Some(CachedQueryResult {
      entities,
      meta: entry.meta,
    }))
  }

  fn write<T: Cacheable>(&self, key: &str, entities: &[T]) -> Result<()> {
    let data = entities
      .iter()
      .map(serde_json::to_value)
      .collect::<serde_json::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to serialize entity: {}", e))?;

    let mut entries = self.lock()?;
    let version = entries.next_version();
    debug!(key, version, count = data.len(), "cache write");

    entries.by_key.insert(
      key.to_string(),
      Entry {
        entity_type: T::entity_type(),
        data,
        meta: EntryMeta {
          cached_at: Utc::now(),
          invalidated: false,
          version,
        },
      },
    );

    Ok(())
  }

  fn invalidate(&self, key: &str) -> Result<()> {
    let mut entries = self.lock()?;
    if !entries.by_key.contains_key(key) {
      return Ok(());
    }

    let version = entries.next_version();
    if let Some(entry) = entries.by_key.get_mut(key) {
      entry.meta.invalidated = true;
      entry.meta.version = version;
      debug!(key, version, "cache invalidate");
    }

    Ok(())
  }

  fn meta(&self, key: &str) -> Result<Option<EntryMeta>> {
    let entries = self.lock()?;
    Ok(entries.by_key.get(key).map(|entry| entry.meta))
  }
}
