//! Optimistic create, toggle and delete flows for the item collection.
//!
//! Every flow snapshots the whole cached collection, applies its change
//! locally, and sends the request. The returned [`TodoMutation`] restores the
//! snapshot if the request fails and invalidates the collection once it
//! settles, so the next read replaces any optimistic value with server data.

use color_eyre::Result;

use crate::cache::{CacheStorage, PendingMutation, QueryClient};

use super::cache::TodoQueryKey;
use super::client::TodoApi;
use super::types::Item;

/// Pending mutation of the todo collection
pub type TodoMutation = PendingMutation<Item, TodoQueryKey>;

/// Append a placeholder for `title` and create the item on the server.
pub fn add_todo<A: TodoApi, S: CacheStorage>(
  client: &QueryClient<S>,
  api: &A,
  title: &str,
) -> Result<TodoMutation> {
  let placeholder = Item::placeholder(title);
  let api = api.clone();
  let title = title.to_string();

  client.mutate_optimistic(
    &TodoQueryKey::Todos,
    format!("add {:?}", title),
    move |items: &mut Vec<Item>| items.push(placeholder),
    move || async move { api.add_todo(&title).await },
  )
}

/// Set the completion status of `id`, locally first.
pub fn toggle_todo<A: TodoApi, S: CacheStorage>(
  client: &QueryClient<S>,
  api: &A,
  id: &str,
  completed: bool,
) -> Result<TodoMutation> {
  let api = api.clone();
  let target = id.to_string();
  let id = id.to_string();

  client.mutate_optimistic(
    &TodoQueryKey::Todos,
    format!("set {} completed={}", id, completed),
    move |items: &mut Vec<Item>| {
      if let Some(item) = items.iter_mut().find(|item| item.id == target) {
        item.completed = completed;
      }
    },
    move || async move { api.update_status(&id, completed).await },
  )
}

/// Remove `id` from the collection, locally first. Unknown ids leave the
/// cache untouched.
pub fn delete_todo<A: TodoApi, S: CacheStorage>(
  client: &QueryClient<S>,
  api: &A,
  id: &str,
) -> Result<TodoMutation> {
  let api = api.clone();
  let target = id.to_string();
  let id = id.to_string();

  client.mutate_optimistic(
    &TodoQueryKey::Todos,
    format!("delete {}", id),
    move |items: &mut Vec<Item>| {
      if let Some(index) = items.iter().position(|item| item.id == target) {
        items.remove(index);
      }
    },
    move || async move { api.delete_todo(&id).await },
  )
}
