//! Handles for optimistic mutations in flight.

use color_eyre::Result;
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::layer::QueryClient;
use super::storage::CacheStorage;
use super::traits::{Cacheable, QueryKey};

/// How a mutation settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
  /// Server accepted the change
  Success,
  /// Request failed; the cache was rolled back
  Failed(String),
}

/// A mutation whose optimistic update has been applied and whose request is
/// still running.
///
/// Poll it from the event loop; once the request finishes, polling runs the
/// settle handlers (rollback on failure, invalidation always) exactly once.
#[derive(Debug)]
pub struct PendingMutation<T, K> {
  key: K,
  description: String,
  /// Whole-collection value from before the optimistic update
  snapshot: Option<Vec<T>>,
  receiver: Option<oneshot::Receiver<Result<(), String>>>,
}

impl<T: Cacheable, K: QueryKey> PendingMutation<T, K> {
  pub(crate) fn new(
    key: K,
    description: String,
    snapshot: Option<Vec<T>>,
    receiver: oneshot::Receiver<Result<(), String>>,
  ) -> Self {
    Self {
      key,
      description,
      snapshot,
      receiver: Some(receiver),
    }
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  /// Check if the settle handlers have already run.
  pub fn is_settled(&self) -> bool {
    self.receiver.is_none()
  }

  /// Poll for the request result.
  ///
  /// Returns `Ok(None)` while the request is running and the outcome once it
  /// has settled. Later polls return `Ok(None)`.
  pub fn poll<S: CacheStorage>(
    &mut self,
    client: &QueryClient<S>,
  ) -> Result<Option<MutationOutcome>> {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return Ok(None),
    };

    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(oneshot::error::TryRecvError::Empty) => return Ok(None),
      Err(oneshot::error::TryRecvError::Closed) => Err("Mutation was cancelled".to_string()),
    };
    self.receiver = None;

    let outcome = match result {
      Ok(()) => {
        info!(mutation = %self.description, "mutation succeeded");
        MutationOutcome::Success
      }
      Err(error) => {
        warn!(mutation = %self.description, %error, "mutation failed, rolling back");
        if let Some(snapshot) = &self.snapshot {
          client.set_query_data(&self.key, snapshot)?;
        }
        MutationOutcome::Failed(error)
      }
    };

    client.invalidate_queries(&self.key)?;

    Ok(Some(outcome))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::layer::tests::{counter, Counter, TestKey};
  use crate::cache::MemoryStorage;
  use color_eyre::eyre::eyre;
  use std::time::Duration;

  async fn settle(
    pending: &mut PendingMutation<Counter, TestKey>,
    client: &QueryClient,
  ) -> MutationOutcome {
    for _ in 0..100 {
      if let Some(outcome) = pending.poll(client).unwrap() {
        return outcome;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("mutation did not settle");
  }

  fn seeded() -> (QueryClient, TestKey) {
    let client = QueryClient::new(MemoryStorage::new());
    let key = TestKey("counters");
    client
      .set_query_data(&key, &[counter("a", 1), counter("b", 2)])
      .unwrap();
    (client, key)
  }

  #[tokio::test]
  async fn test_success_keeps_optimistic_value_and_invalidates() {
    let (client, key) = seeded();

    let mut pending = client
      .mutate_optimistic(
        &key,
        "drop b",
        |counters: &mut Vec<Counter>| counters.retain(|c| c.id != "b"),
        || async { Ok("deleted") },
      )
      .unwrap();

    assert_eq!(settle(&mut pending, &client).await, MutationOutcome::Success);
    assert!(pending.is_settled());
    assert_eq!(
      client.get_query_data::<Counter>(&key).unwrap(),
      Some(vec![counter("a", 1)])
    );
    assert!(client.query_meta(&key).unwrap().unwrap().invalidated);
  }

  #[tokio::test]
  async fn test_failure_restores_snapshot_and_invalidates() {
    let (client, key) = seeded();

    let mut pending = client
      .mutate_optimistic(
        &key,
        "drop b",
        |counters: &mut Vec<Counter>| counters.retain(|c| c.id != "b"),
        || async { Err::<(), _>(eyre!("boom")) },
      )
      .unwrap();

    let outcome = settle(&mut pending, &client).await;
    assert_eq!(outcome, MutationOutcome::Failed("boom".to_string()));
    assert_eq!(
      client.get_query_data::<Counter>(&key).unwrap(),
      Some(vec![counter("a", 1), counter("b", 2)])
    );
    assert!(client.query_meta(&key).unwrap().unwrap().invalidated);
  }

  #[tokio::test]
  async fn test_poll_after_settle_is_none() {
    let (client, key) = seeded();

    let mut pending = client
      .mutate_optimistic(
        &key,
        "noop",
        |_: &mut Vec<Counter>| {},
        || async { Ok(()) },
      )
      .unwrap();

    settle(&mut pending, &client).await;
    assert_eq!(pending.poll(&client).unwrap(), None);
  }

  #[tokio::test]
  async fn test_failure_without_snapshot_leaves_cache_empty() {
    let client = QueryClient::new(MemoryStorage::new());
    let key = TestKey("counters");

    let mut pending = client
      .mutate_optimistic(
        &key,
        "push",
        |counters: &mut Vec<Counter>| counters.push(counter("x", 0)),
        || async { Err::<(), _>(eyre!("offline")) },
      )
      .unwrap();

    settle(&mut pending, &client).await;
    assert_eq!(client.get_query_data::<Counter>(&key).unwrap(), None);
  }
}
