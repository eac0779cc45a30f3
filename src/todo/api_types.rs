//! Serde types matching the todo backend's wire format.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::{Deserialize, Deserializer, Serialize};

use super::types::Item;

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTodo {
  #[serde(rename = "_id", alias = "id", deserialize_with = "deserialize_id")]
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default, alias = "completed")]
  pub status: bool,
}

/// `GET /get-todo`
#[derive(Debug, Deserialize)]
pub struct ApiTodosResponse {
  #[serde(default)]
  pub todos: Vec<ApiTodo>,
}

/// Create and update endpoints answer with the item, either bare or wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiTodoEnvelope {
  Wrapped { todo: ApiTodo },
  Bare(ApiTodo),
}

// ============================================================================
// Requests
// ============================================================================

/// `POST /add-todo`
#[derive(Debug, Serialize)]
pub struct AddTodoRequest<'a> {
  pub title: &'a str,
  pub status: bool,
}

/// `PATCH /update/{id}`
#[derive(Debug, Serialize)]
pub struct UpdateStatusRequest {
  pub status: bool,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiTodo> for Item {
  fn from(todo: ApiTodo) -> Self {
    Item {
      id: todo.id,
      title: todo.title,
      completed: todo.status,
    }
  }
}

impl From<ApiTodoEnvelope> for Item {
  fn from(envelope: ApiTodoEnvelope) -> Self {
    match envelope {
      ApiTodoEnvelope::Wrapped { todo } | ApiTodoEnvelope::Bare(todo) => todo.into(),
    }
  }
}

impl From<ApiTodosResponse> for Vec<Item> {
  fn from(resp: ApiTodosResponse) -> Self {
    resp.todos.into_iter().map(Item::from).collect()
  }
}

// ============================================================================
// Helpers
// ============================================================================

/// Ids arrive as strings from document stores but as numbers from others.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Number(serde_json::Number),
  }

  Ok(match RawId::deserialize(deserializer)? {
    RawId::Text(s) => s,
    RawId::Number(n) => n.to_string(),
  })
}
