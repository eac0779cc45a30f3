use serde::{Deserialize, Serialize};

/// Id given to items created locally until the server assigns a real one
pub const TEMP_ID: &str = "temp";

/// A to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  pub id: String,
  pub title: String,
  pub completed: bool,
}

impl Item {
  /// Placeholder shown while a create request is in flight
  pub fn placeholder(title: impl Into<String>) -> Self {
    Self {
      id: TEMP_ID.to_string(),
      title: title.into(),
      completed: false,
    }
  }

  /// Check if this item is still waiting for a server id
  pub fn is_placeholder(&self) -> bool {
    self.id == TEMP_ID
  }
}
