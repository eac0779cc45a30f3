//! Async query abstraction for data fetching backed by the query cache.
//!
//! Inspired by TanStack Query, this module provides a `Query<T, K>` type that
//! fetches a list into a [`QueryClient`] entry and mirrors that entry into a
//! loading/success/error state the views can render.
//!
//! # Example
//!
//! ```ignore
//! let api = todo_client.clone();
//! let mut query = Query::new(client.clone(), TodoQueryKey::Todos, move || {
//!     let api = api.clone();
//!     async move { api.list_todos().await.map_err(|e| e.to_string()) }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use color_eyre::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{CacheStorage, Cacheable, MemoryStorage, QueryClient, QueryKey};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is fetching and has no data yet
  Loading,
  /// Data is available
  Success(T),
  /// Query failed and has no data to show
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }
}

/// Retry policy for failed reads.
///
/// Delays grow exponentially: `min(initial_delay * 2^attempt, max_delay)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  /// Retries after the first attempt
  max_retries: u32,
  initial_delay: Duration,
  max_delay: Duration,
}

impl RetryPolicy {
  /// Three retries starting at one second, capped at thirty.
  pub const fn new() -> Self {
    Self {
      max_retries: 3,
      initial_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(30),
    }
  }

  /// Never retry.
  pub const fn none() -> Self {
    Self::new().with_max_retries(0)
  }

  pub const fn with_max_retries(mut self, retries: u32) -> Self {
    self.max_retries = retries;
    self
  }

  pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
    self.initial_delay = delay;
    self
  }

  pub fn max_retries(&self) -> u32 {
    self.max_retries
  }

  /// Delay before retry number `attempt` (0-indexed).
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    self
      .initial_delay
      .checked_mul(factor)
      .unwrap_or(self.max_delay)
      .min(self.max_delay)
  }

  pub fn should_retry(&self, attempt: u32) -> bool {
    attempt < self.max_retries
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new()
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// A fetch in flight, tagged with the generation it was started under
struct InFlight<T> {
  generation: u64,
  receiver: mpsc::UnboundedReceiver<Result<Vec<T>, String>>,
}

/// Async query bound to one cache entry.
///
/// Query<T, K> encapsulates:
/// - The fetching logic (via a closure), retried per [`RetryPolicy`]
/// - Loading/success/error states mirrored from the cache entry
/// - Async result handling via channels
/// - Refetching once per invalidation of its entry
pub struct Query<T, K, S: CacheStorage = MemoryStorage> {
  client: QueryClient<S>,
  key: K,
  state: QueryState<Vec<T>>,
  fetcher: FetcherFn<Vec<T>>,
  retry: RetryPolicy,
  in_flight: Option<InFlight<T>>,
  /// Cache entry version last mirrored into `state`
  seen_version: Option<u64>,
  /// Entry version whose invalidation already triggered a refetch
  refetched_version: Option<u64>,
}

impl<T: Cacheable, K: QueryKey, S: CacheStorage> Query<T, K, S> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time a fetch, refetch or retry starts.
  pub fn new<F, Fut>(client: QueryClient<S>, key: K, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, String>> + Send + 'static,
  {
    Self {
      client,
      key,
      state: QueryState::Idle,
      fetcher: Arc::new(move || fetcher().boxed()),
      retry: RetryPolicy::default(),
      in_flight: None,
      seen_version: None,
      refetched_version: None,
    }
  }

  /// Set the retry policy for this query.
  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<Vec<T>> {
    &self.state
  }

  /// Get the data if any is available.
  pub fn data(&self) -> Option<&Vec<T>> {
    self.state.data()
  }

  /// Check if a request is running, including background refetches.
  pub fn is_fetching(&self) -> bool {
    self.in_flight.is_some()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Start fetching data unless a fetch is running or the cache is fresh.
  pub fn fetch(&mut self) {
    if self.in_flight.is_some() {
      return;
    }
    match self.client.is_stale(&self.key) {
      Ok(false) => {
        debug!(query = %self.key.description(), "serving fresh cache");
        self.sync_from_cache();
      }
      Ok(true) => self.start_fetch(),
      Err(e) => self.state = QueryState::Error(e.to_string()),
    }
  }

  /// Force a refetch, cancelling any fetch in flight.
  pub fn refetch(&mut self) {
    if let Err(e) = self.client.cancel_queries(&self.key) {
      self.state = QueryState::Error(e.to_string());
      return;
    }
    self.in_flight = None;
    self.start_fetch();
  }

  /// Poll for results and cache changes.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    match self.try_poll() {
      Ok(changed) => changed,
      Err(e) => {
        self.state = QueryState::Error(e.to_string());
        true
      }
    }
  }

  fn try_poll(&mut self) -> Result<bool> {
    let mut changed = self.receive()?;
    changed |= self.sync_from_cache();

    if let Some(meta) = self.client.query_meta(&self.key)? {
      if meta.invalidated && self.refetched_version != Some(meta.version) {
        self.refetched_version = Some(meta.version);
        if self.is_fetching() {
          // A running fetch may have read the server before this invalidation
          debug!(query = %self.key.description(), "invalidated mid-fetch, restarting");
          self.refetch();
        } else {
          self.start_fetch();
        }
      }
    }

    Ok(changed)
  }

  /// Take a finished fetch result, if any, and apply it to the cache.
  fn receive(&mut self) -> Result<bool> {
    let in_flight = match &mut self.in_flight {
      Some(in_flight) => in_flight,
      None => return Ok(false),
    };

    // Try to receive without blocking
    let result = match in_flight.receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return Ok(false),
      Err(mpsc::error::TryRecvError::Disconnected) => Err("Query was cancelled".to_string()),
    };
    let generation = in_flight.generation;
    self.in_flight = None;

    if generation != self.client.fetch_generation(&self.key)? {
      debug!(query = %self.key.description(), "discarding cancelled fetch");
      let needs_data = match self.client.query_meta(&self.key)? {
        Some(meta) if meta.invalidated => {
          self.refetched_version = Some(meta.version);
          true
        }
        Some(_) => false,
        None => true,
      };
      if needs_data {
        self.start_fetch();
      }
      return Ok(false);
    }

    match result {
      Ok(data) => {
        self.client.set_query_data(&self.key, &data)?;
      }
      Err(error) => {
        warn!(query = %self.key.description(), %error, "fetch failed");
        if self.state.data().is_some() {
          // Keep showing the data we have
          return Ok(false);
        }
        self.state = QueryState::Error(error);
      }
    }

    Ok(true)
  }

  /// Mirror the cache entry into `state` if it changed since last seen.
  fn sync_from_cache(&mut self) -> bool {
    match self.client.query_meta(&self.key) {
      Ok(Some(meta)) if self.seen_version != Some(meta.version) => {
        match self.client.get_query_data::<T>(&self.key) {
          Ok(Some(entities)) => {
            self.seen_version = Some(meta.version);
            self.state = QueryState::Success(entities);
            true
          }
          Ok(None) => false,
          Err(e) => {
            self.state = QueryState::Error(e.to_string());
            true
          }
        }
      }
      Ok(_) => false,
      Err(e) => {
        self.state = QueryState::Error(e.to_string());
        true
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let generation = match self.client.fetch_generation(&self.key) {
      Ok(generation) => generation,
      Err(e) => {
        self.state = QueryState::Error(e.to_string());
        return;
      }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    self.in_flight = Some(InFlight {
      generation,
      receiver: rx,
    });
    if self.state.data().is_none() {
      self.state = QueryState::Loading;
    }

    debug!(
      query = %self.key.description(),
      generation,
      retries = self.retry.max_retries(),
      "fetch started"
    );

    let fetcher = Arc::clone(&self.fetcher);
    let retry = self.retry.clone();
    let description = self.key.description();
    tokio::spawn(async move {
      let mut attempt = 0;
      let result = loop {
        match fetcher().await {
          Ok(data) => break Ok(data),
          Err(error) if retry.should_retry(attempt) => {
            let delay = retry.delay_for_attempt(attempt);
            warn!(query = %description, %error, attempt, ?delay, "fetch failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
          }
          Err(error) => break Err(error),
        }
      };
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher result channel is owned.

impl<T: std::fmt::Debug, K: std::fmt::Debug, S: CacheStorage> std::fmt::Debug for Query<T, K, S> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("fetching", &self.in_flight.is_some())
      .field("seen_version", &self.seen_version)
      .finish_non_exhaustive()
  }
}
