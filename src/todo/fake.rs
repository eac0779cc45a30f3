//! In-memory todo backend for tests.

use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::client::TodoApi;
use super::types::Item;

/// Fake backend: holds items, assigns sequential ids, and can be told to
/// reject every read or write.
#[derive(Clone, Default)]
pub struct FakeApi {
  items: Arc<Mutex<Vec<Item>>>,
  next_id: Arc<AtomicU64>,
  fail_mutations: Arc<AtomicBool>,
  fail_reads: Arc<AtomicBool>,
  requests: Arc<AtomicUsize>,
}

impl FakeApi {
  pub fn with_items(items: Vec<Item>) -> Self {
    let api = Self::default();
    api
      .next_id
      .store(items.len() as u64 + 1, Ordering::SeqCst);
    *api.items.lock().unwrap() = items;
    api
  }

  pub fn fail_mutations(&self, fail: bool) {
    self.fail_mutations.store(fail, Ordering::SeqCst);
  }

  pub fn fail_reads(&self, fail: bool) {
    self.fail_reads.store(fail, Ordering::SeqCst);
  }

  pub fn items(&self) -> Vec<Item> {
    self.items.lock().unwrap().clone()
  }

  pub fn request_count(&self) -> usize {
    self.requests.load(Ordering::SeqCst)
  }

  fn begin_write(&self) -> Result<()> {
    self.requests.fetch_add(1, Ordering::SeqCst);
    if self.fail_mutations.load(Ordering::SeqCst) {
      return Err(eyre!("server returned 500 Internal Server Error"));
    }
    Ok(())
  }
}

impl TodoApi for FakeApi {
  async fn list_todos(&self) -> Result<Vec<Item>> {
    self.requests.fetch_add(1, Ordering::SeqCst);
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(eyre!("server returned 503 Service Unavailable"));
    }
    Ok(self.items())
  }

  async fn add_todo(&self, title: &str) -> Result<Option<Item>> {
    self.begin_write()?;
    let item = Item {
      id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
      title: title.to_string(),
      completed: false,
    };
    self.items.lock().unwrap().push(item.clone());
    Ok(Some(item))
  }

  async fn update_status(&self, id: &str, completed: bool) -> Result<Option<Item>> {
    self.begin_write()?;
    let mut items = self.items.lock().unwrap();
    let item = items
      .iter_mut()
      .find(|item| item.id == id)
      .ok_or_else(|| eyre!("todo {} not found", id))?;
    item.completed = completed;
    Ok(Some(item.clone()))
  }

  async fn delete_todo(&self, id: &str) -> Result<()> {
    self.begin_write()?;
    self.items.lock().unwrap().retain(|item| item.id != id);
    Ok(())
  }
}
