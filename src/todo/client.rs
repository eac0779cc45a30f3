use crate::config::Config;
use crate::todo::api_types::{
  AddTodoRequest, ApiTodoEnvelope, ApiTodosResponse, UpdateStatusRequest,
};
use crate::todo::types::Item;
use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Operations the todo backend offers.
///
/// Views and mutation helpers are generic over this so they can run against
/// an in-memory backend in tests.
pub trait TodoApi: Clone + Send + Sync + 'static {
  /// Fetch the whole collection in server order
  fn list_todos(&self) -> impl Future<Output = Result<Vec<Item>>> + Send;

  /// Create an item; the server assigns its id.
  ///
  /// Any 2xx counts as success. The created item is returned when the body
  /// carries one.
  fn add_todo(&self, title: &str) -> impl Future<Output = Result<Option<Item>>> + Send;

  /// Set the completion status of an item. Same success rule as `add_todo`.
  fn update_status(
    &self,
    id: &str,
    completed: bool,
  ) -> impl Future<Output = Result<Option<Item>>> + Send;

  /// Remove an item
  fn delete_todo(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP client for the todo backend
#[derive(Clone)]
pub struct TodoClient {
  http: reqwest::Client,
  base_url: Url,
}

impl TodoClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base_url = Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api.url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .user_agent(concat!("todoq/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// Base URL requests are resolved against
  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| eyre!("API url {} cannot be a base", self.base_url))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", what, e))?;

    let status = response.status();
    debug!(status = status.as_u16(), "{}", what);
    if !status.is_success() {
      return Err(eyre!("Failed to {}: server returned {}", what, status));
    }

    Ok(response)
  }

  /// Read a single item from a successful write response, if it has one
  async fn written_item(response: reqwest::Response, what: &str) -> Option<Item> {
    match response.json::<ApiTodoEnvelope>().await {
      Ok(envelope) => Some(envelope.into()),
      Err(e) => {
        warn!(error = %e, "{}: response has no todo body", what);
        None
      }
    }
  }
}

impl TodoApi for TodoClient {
  async fn list_todos(&self) -> Result<Vec<Item>> {
    let url = self.endpoint(&["get-todo"])?;
    let response = self.send(self.http.get(url), "list todos").await?;

    let body: ApiTodosResponse = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse todo list: {}", e))?;

    Ok(body.into())
  }

  async fn add_todo(&self, title: &str) -> Result<Option<Item>> {
    let url = self.endpoint(&["add-todo"])?;
    let body = AddTodoRequest {
      title,
      status: false,
    };
    let response = self
      .send(self.http.post(url).json(&body), "add todo")
      .await?;

    Ok(Self::written_item(response, "add todo").await)
  }

  async fn update_status(&self, id: &str, completed: bool) -> Result<Option<Item>> {
    let url = self.endpoint(&["update", id])?;
    let body = UpdateStatusRequest { status: completed };
    let response = self
      .send(self.http.patch(url).json(&body), "update todo status")
      .await?;

    Ok(Self::written_item(response, "update todo status").await)
  }

  async fn delete_todo(&self, id: &str) -> Result<()> {
    let url = self.endpoint(&["delete", id])?;
    self.send(self.http.delete(url), "delete todo").await?;
    Ok(())
  }
}
