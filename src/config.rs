use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::query::RetryPolicy;

/// Backend used when no config file names one
pub const DEFAULT_API_URL: &str = "https://todo-backend.cyclic.app";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API domain if not set)
  pub title: Option<String>,
  pub query: QueryConfig,
  pub ui: UiConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_API_URL.to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
  /// How long fetched data counts as fresh
  pub stale_secs: u64,
  /// Retries for failed reads (mutations are never retried)
  pub retry: u32,
  /// Delay before the first retry; doubles per attempt up to 30s
  pub retry_delay_ms: u64,
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      stale_secs: 0,
      retry: 3,
      retry_delay_ms: 1000,
    }
  }
}

impl QueryConfig {
  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.stale_secs.min(u32::MAX as u64) as i64)
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::new()
      .with_max_retries(self.retry)
      .with_initial_delay(Duration::from_millis(self.retry_delay_ms))
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
  /// Cards per row in the item grid
  pub columns: u16,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self { columns: 2 }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive, overridden by TODOQ_LOG
  pub level: String,
  /// Directory for log files (defaults to the data directory)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      dir: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./todoq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/todoq/config.yaml
  ///
  /// Without a config file the built-in defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("todoq.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("todoq").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.ui.columns == 0 {
      return Err(eyre!("ui.columns must be at least 1"));
    }
    Ok(config)
  }

  /// Text shown in the header: the configured title or the API domain.
  pub fn display_title(&self) -> &str {
    match &self.title {
      Some(title) => title,
      None => extract_domain(&self.api.url),
    }
  }
}

/// Extract domain from an API URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
api:
  url: http://localhost:3000
  timeout_secs: 5
title: Groceries
query:
  stale_secs: 60
  retry: 2
  retry_delay_ms: 250
ui:
  columns: 3
log:
  level: debug
  dir: /tmp/todoq-logs
"#,
    )
    .unwrap();

    assert_eq!(config.api.url, "http://localhost:3000");
    assert_eq!(config.api.timeout_secs, 5);
    assert_eq!(config.display_title(), "Groceries");
    assert_eq!(config.query.stale_time(), chrono::Duration::seconds(60));
    let retry = config.query.retry_policy();
    assert_eq!(retry.max_retries(), 2);
    assert_eq!(retry.delay_for_attempt(0), Duration::from_millis(250));
    assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(500));
    assert_eq!(config.ui.columns, 3);
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log.dir, Some(PathBuf::from("/tmp/todoq-logs")));
  }

  #[test]
  fn test_partial_config_uses_defaults() {
    let config = Config::parse("api:\n  url: http://localhost:3000\n").unwrap();
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.query.retry, 3);
    assert_eq!(config.query.stale_secs, 0);
    assert_eq!(
      config.query.retry_policy().delay_for_attempt(0),
      Duration::from_secs(1)
    );
    assert_eq!(config.ui.columns, 2);
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_default_points_at_public_backend() {
    let config = Config::default();
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert_eq!(config.display_title(), "todo-backend.cyclic.app");
  }

  #[test]
  fn test_zero_columns_rejected() {
    assert!(Config::parse("ui:\n  columns: 0\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path_errors() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_extract_domain() {
    assert_eq!(
      extract_domain("https://todo-backend.cyclic.app"),
      "todo-backend.cyclic.app"
    );
    assert_eq!(extract_domain("https://api.example.com/v1"), "api.example.com");
    assert_eq!(extract_domain("http://localhost:8080"), "localhost:8080");
  }
}
