//! Query client that orchestrates cache reads, writes and invalidation.

use chrono::{Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::mutation::PendingMutation;
use super::storage::{CacheStorage, MemoryStorage};
use super::traits::{Cacheable, EntryMeta, QueryKey};

/// Shared handle to the client-side state store.
///
/// This layer sits between the views and the storage backend. Cloning is
/// cheap; all clones see the same entries.
pub struct QueryClient<S: CacheStorage = MemoryStorage> {
  storage: Arc<S>,
  /// Per-key fetch generation, bumped by `cancel_queries`
  generations: Arc<Mutex<HashMap<String, u64>>>,
  /// How long before cached data is considered stale
  stale_time: Duration,
}

impl<S: CacheStorage> QueryClient<S> {
  /// Create a new query client with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      generations: Arc::new(Mutex::new(HashMap::new())),
      stale_time: Duration::zero(),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Get the cached entities for a query.
  pub fn get_query_data<T: Cacheable>(&self, key: &impl QueryKey) -> Result<Option<Vec<T>>> {
    Ok(
      self
        .storage
        .read::<T>(&key.cache_hash())?
        .map(|cached| cached.entities),
    )
  }

  /// Overwrite the cached entities for a query.
  pub fn set_query_data<T: Cacheable>(&self, key: &impl QueryKey, entities: &[T]) -> Result<()> {
    self.storage.write(&key.cache_hash(), entities)
  }

  /// Mark a query as stale so its observers refetch.
  pub fn invalidate_queries(&self, key: &impl QueryKey) -> Result<()> {
    debug!(query = %key.description(), "invalidating");
    self.storage.invalidate(&key.cache_hash())
  }

  /// Cancel in-flight reads for a query.
  ///
  /// Fetches started before this call are discarded when they land.
  pub fn cancel_queries(&self, key: &impl QueryKey) -> Result<()> {
    let mut generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *generations.entry(key.cache_hash()).or_insert(0) += 1;
    debug!(query = %key.description(), "cancelled in-flight fetches");
    Ok(())
  }

  /// Current fetch generation for a query.
  pub fn fetch_generation(&self, key: &impl QueryKey) -> Result<u64> {
    let generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(generations.get(&key.cache_hash()).copied().unwrap_or(0))
  }

  /// Bookkeeping for a cached query, if any.
  pub fn query_meta(&self, key: &impl QueryKey) -> Result<Option<EntryMeta>> {
    self.storage.meta(&key.cache_hash())
  }

  /// Check whether a query needs fetching: missing, invalidated or too old.
  pub fn is_stale(&self, key: &impl QueryKey) -> Result<bool> {
    Ok(match self.query_meta(key)? {
      Some(meta) => meta.invalidated || Utc::now() - meta.cached_at > self.stale_time,
      None => true,
    })
  }

  /// Run a mutation with an optimistic local update.
  ///
  /// Cancels in-flight reads of `key`, snapshots the cached value, applies
  /// `apply_local` to a copy and writes it (only when a value is cached), then
  /// spawns `mutate`. The returned handle rolls back to the snapshot on
  /// failure and invalidates `key` once the request settles.
  pub fn mutate_optimistic<T, K, A, F, Fut, R>(
    &self,
    key: &K,
    description: impl Into<String>,
    apply_local: A,
    mutate: F,
  ) -> Result<PendingMutation<T, K>>
  where
    T: Cacheable,
    K: QueryKey,
    A: FnOnce(&mut Vec<T>),
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Debug + Send + 'static,
  {
    let description = description.into();

    self.cancel_queries(key)?;

    let snapshot = self.get_query_data::<T>(key)?;
    if let Some(previous) = &snapshot {
      let mut next = previous.clone();
      apply_local(&mut next);
      self.set_query_data(key, &next)?;
    }

    info!(mutation = %description, "mutation started");

    let (tx, rx) = oneshot::channel();
    let request = mutate();
    let task_description = description.clone();
    tokio::spawn(async move {
      let result = match request.await {
        Ok(response) => {
          debug!(mutation = %task_description, ?response, "mutation response");
          Ok(())
        }
        Err(e) => Err(e.to_string()),
      };
      // Ignore send errors - the handle may have been dropped
      let _ = tx.send(result);
    });

    Ok(PendingMutation::new(key.clone(), description, snapshot, rx))
  }
}

impl<S: CacheStorage> Clone for QueryClient<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      generations: Arc::clone(&self.generations),
      stale_time: self.stale_time,
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  pub struct Counter {
    pub id: String,
    pub value: i64,
  }

  impl Cacheable for Counter {
    fn entity_type() -> &'static str {
      "counter"
    }
  }

  #[derive(Debug, Clone)]
  pub struct TestKey(pub &'static str);

  impl QueryKey for TestKey {
    fn cache_hash(&self) -> String {
      format!("test:{}", self.0)
    }

    fn description(&self) -> String {
      self.0.to_string()
    }
  }

  pub fn counter(id: &str, value: i64) -> Counter {
    Counter {
      id: id.to_string(),
      value,
    }
  }

  #[test]
  fn test_get_and_set_query_data() {
    let client = QueryClient::new(MemoryStorage::new());
    let key = TestKey("counters");
    assert_eq!(client.get_query_data::<Counter>(&key).unwrap(), None);

    client.set_query_data(&key, &[counter("a", 1)]).unwrap();
    assert_eq!(
      client.get_query_data::<Counter>(&key).unwrap(),
      Some(vec![counter("a", 1)])
    );
  }

  #[test]
  fn test_clones_share_entries() {
    let client = QueryClient::new(MemoryStorage::new());
    let other = client.clone();
    let key = TestKey("counters");

    other.set_query_data(&key, &[counter("a", 1)]).unwrap();
    assert!(client.get_query_data::<Counter>(&key).unwrap().is_some());
  }

  #[test]
  fn test_cancel_bumps_generation_per_key() {
    let client = QueryClient::new(MemoryStorage::new());
    let a = TestKey("a");
    let b = TestKey("b");

    assert_eq!(client.fetch_generation(&a).unwrap(), 0);
    client.cancel_queries(&a).unwrap();
    client.cancel_queries(&a).unwrap();
    assert_eq!(client.fetch_generation(&a).unwrap(), 2);
    assert_eq!(client.fetch_generation(&b).unwrap(), 0);
  }

  #[test]
  fn test_staleness() {
    let client = QueryClient::new(MemoryStorage::new()).with_stale_time(Duration::minutes(5));
    let key = TestKey("counters");
    assert!(client.is_stale(&key).unwrap());

    client.set_query_data(&key, &[counter("a", 1)]).unwrap();
    assert!(!client.is_stale(&key).unwrap());

    client.invalidate_queries(&key).unwrap();
    assert!(client.is_stale(&key).unwrap());
  }

  #[test]
  fn test_zero_stale_time_is_always_stale() {
    let client = QueryClient::new(MemoryStorage::new());
    let key = TestKey("counters");
    client.set_query_data(&key, &[counter("a", 1)]).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(client.is_stale(&key).unwrap());
  }

  #[tokio::test]
  async fn test_mutate_optimistic_applies_local_change_immediately() {
    let client = QueryClient::new(MemoryStorage::new());
    let key = TestKey("counters");
    client
      .set_query_data(&key, &[counter("a", 1), counter("b", 2)])
      .unwrap();

    let _pending = client
      .mutate_optimistic(
        &key,
        "bump a",
        |counters: &mut Vec<Counter>| counters[0].value += 10,
        || async { Ok(()) },
      )
      .unwrap();

    assert_eq!(
      client.get_query_data::<Counter>(&key).unwrap(),
      Some(vec![counter("a", 11), counter("b", 2)])
    );
    assert_eq!(client.fetch_generation(&key).unwrap(), 1);
  }

  #[tokio::test]
  async fn test_mutate_optimistic_without_cached_value_skips_local_change() {
    let client = QueryClient::new(MemoryStorage::new());
    let key = TestKey("counters");

    let _pending = client
      .mutate_optimistic(
        &key,
        "push",
        |counters: &mut Vec<Counter>| counters.push(counter("x", 0)),
        || async { Ok(()) },
      )
      .unwrap();

    assert_eq!(client.get_query_data::<Counter>(&key).unwrap(), None);
  }
}
