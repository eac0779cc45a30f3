//! Caching implementations for todo types.

use sha2::{Digest, Sha256};

use crate::cache::{Cacheable, QueryKey};

use super::types::Item;

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Item {
  fn entity_type() -> &'static str {
    "todo"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Query key types for todo API calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoQueryKey {
  /// The full item collection
  Todos,
}

impl QueryKey for TodoQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::Todos => "todos",
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
  }

  fn description(&self) -> String {
    match self {
      Self::Todos => "todos".to_string(),
    }
  }
}
