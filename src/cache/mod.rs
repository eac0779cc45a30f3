//! Client-side query cache with optimistic mutation support.
//!
//! This module provides a domain-agnostic state store that:
//! - Holds one ordered entity list per query key
//! - Tracks invalidation and a per-entry version for change detection
//! - Cancels in-flight reads before optimistic writes
//! - Rolls optimistic writes back when the server rejects them

mod layer;
mod mutation;
mod storage;
mod traits;

pub use layer::QueryClient;
pub use mutation::{MutationOutcome, PendingMutation};
pub use storage::{CacheStorage, MemoryStorage};
pub use traits::{Cacheable, QueryKey};
