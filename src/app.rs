use crate::cache::{MemoryStorage, QueryClient};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::todo::client::TodoClient;
use crate::ui;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::TodoListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  /// The todo list; the only screen
  view: Box<dyn View>,

  /// Shown in the header
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let api = TodoClient::new(config)?;
    let client =
      QueryClient::new(MemoryStorage::new()).with_stale_time(config.query.stale_time());
    info!(url = %api.base_url(), "starting");

    let view = TodoListView::new(
      client,
      api,
      usize::from(config.ui.columns),
      config.query.retry_policy(),
    );

    Ok(Self {
      view: Box::new(view),
      title: config.display_title().to_string(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Cleanup terminal, also after a failed loop
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, &self.title, self.view.as_mut()))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key)
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) =>
      {
        self.should_quit = true;
        return;
      }
      Event::Key(key) => {
        if self.view.handle_key(key) == ViewAction::Quit {
          self.should_quit = true;
        }
      }
      Event::Resize | Event::Tick => {}
    }

    // Held keys starve Tick, so poll after every event
    self.view.tick();
  }
}
