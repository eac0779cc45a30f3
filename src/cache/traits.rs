//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be cached.
///
/// Entities are stored serialized, so every read hands out an owned copy and
/// snapshots can never alias the live cache entry.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Entity type name for storage organization (e.g., "todo")
  fn entity_type() -> &'static str;
}

/// Trait for the keys that name cached query results.
pub trait QueryKey: Clone + Send + Sync + 'static {
  /// Stable, fixed-length identifier used as the storage key
  fn cache_hash(&self) -> String;

  /// Human readable description, used in logs
  fn description(&self) -> String;
}

/// Bookkeeping stored next to every cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
  /// When the entry was last written
  pub cached_at: DateTime<Utc>,
  /// Set by `invalidate`, cleared by the next `write`
  pub invalidated: bool,
  /// Bumped on every write and invalidation
  pub version: u64,
}

/// Result of a cached query lookup.
#[derive(Debug, Clone)]
pub struct CachedQueryResult<T> {
  /// The cached entities in order
  pub entities: Vec<T>,
  pub meta: EntryMeta,
}
