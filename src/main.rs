mod app;
mod cache;
mod config;
mod event;
mod logging;
mod query;
mod todo;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "todoq")]
#[command(about = "A terminal to-do list with optimistic updates")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./todoq.yaml or $XDG_CONFIG_HOME/todoq/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the todo API
  #[arg(short, long)]
  url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override API URL if specified on command line
  if let Some(url) = args.url {
    config.api.url = url;
  }

  // Logs are flushed when the guard drops
  let _log_guard = logging::init(&config.log)?;

  // Initialize and run the app
  let mut app = app::App::new(&config)?;
  app.run().await?;

  Ok(())
}
