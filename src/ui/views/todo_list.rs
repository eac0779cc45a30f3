use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::{debug, error};

use super::todo_card::{draw_todo_card, CARD_HEIGHT};
use crate::cache::QueryClient;
use crate::query::{Query, QueryState, RetryPolicy};
use crate::todo::actions::{add_todo, delete_todo, toggle_todo, TodoMutation};
use crate::todo::cache::TodoQueryKey;
use crate::todo::client::TodoApi;
use crate::todo::types::Item;
use crate::ui::components::{AddTodoEvent, AddTodoForm, KeyResult, Prompt, PromptEvent};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Grid of todo cards with a creation form and a title filter
pub struct TodoListView<A: TodoApi> {
  client: QueryClient,
  api: A,
  query: Query<Item, TodoQueryKey>,
  form: AddTodoForm,
  filter: Prompt,
  /// Index into the filtered items
  selected: usize,
  /// First grid row on screen
  scroll_row: usize,
  columns: usize,
  mutations: Vec<TodoMutation>,
}

impl<A: TodoApi> TodoListView<A> {
  pub fn new(client: QueryClient, api: A, columns: usize, retry: RetryPolicy) -> Self {
    let fetch_api = api.clone();
    let mut query = Query::new(client.clone(), TodoQueryKey::Todos, move || {
      let api = fetch_api.clone();
      async move { api.list_todos().await.map_err(|e| e.to_string()) }
    })
    .with_retry(retry);

    // Start fetching immediately
    query.fetch();

    Self {
      client,
      api,
      query,
      form: AddTodoForm::new(),
      filter: Prompt::new("Filter", "/", &['/']),
      selected: 0,
      scroll_row: 0,
      columns: columns.max(1),
      mutations: Vec::new(),
    }
  }

  fn items(&self) -> &[Item] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Items matching the title filter, case-insensitive
  fn visible(&self) -> Vec<&Item> {
    let needle = self.filter.value().to_lowercase();
    self
      .items()
      .iter()
      .filter(|item| needle.is_empty() || item.title.to_lowercase().contains(&needle))
      .collect()
  }

  fn selected_item(&self) -> Option<Item> {
    self.visible().get(self.selected).map(|item| (*item).clone())
  }

  fn move_selection(&mut self, delta: isize) {
    let len = self.visible().len();
    if len == 0 {
      self.selected = 0;
      return;
    }
    self.selected = (self.selected as isize + delta).clamp(0, len as isize - 1) as usize;
  }

  fn clamp_selection(&mut self) {
    let len = self.visible().len();
    if self.selected >= len {
      self.selected = len.saturating_sub(1);
    }
  }

  fn track(&mut self, mutation: Result<TodoMutation>) {
    match mutation {
      Ok(mutation) => self.mutations.push(mutation),
      Err(e) => error!("Failed to start mutation: {}", e),
    }
  }

  fn submit(&mut self, title: String) {
    let mutation = add_todo(&self.client, &self.api, &title);
    self.track(mutation);
  }

  fn toggle_selected(&mut self) {
    let Some(item) = self.selected_item() else {
      return;
    };
    if item.is_placeholder() {
      debug!(title = %item.title, "ignoring toggle on unsaved todo");
      return;
    }
    let mutation = toggle_todo(&self.client, &self.api, &item.id, !item.completed);
    self.track(mutation);
  }

  fn delete_selected(&mut self) {
    let Some(item) = self.selected_item() else {
      return;
    };
    if item.is_placeholder() {
      debug!(title = %item.title, "ignoring delete on unsaved todo");
      return;
    }
    let mutation = delete_todo(&self.client, &self.api, &item.id);
    self.track(mutation);
  }

  /// Poll pending mutations and drop the settled ones
  fn settle_mutations(&mut self) {
    let client = &self.client;
    self.mutations.retain_mut(|mutation| match mutation.poll(client) {
      Ok(None) => !mutation.is_settled(),
      Ok(Some(_)) => false,
      Err(e) => {
        error!(mutation = %mutation.description(), "Failed to settle mutation: {}", e);
        false
      }
    });
  }

  fn render_message(&self, frame: &mut Frame, area: Rect, message: &str, color: Color) {
    let block = Block::default()
      .title(" Todos ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = Paragraph::new(message)
      .block(block)
      .style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
  }

  fn render_grid(&mut self, frame: &mut Frame, area: Rect) {
    let total = self.items().len();
    let filter = self.filter.value().to_string();
    let title = if filter.is_empty() {
      format!(" Todos ({}) ", total)
    } else {
      format!(" Todos ({}/{}) /{} ", self.visible().len(), total, filter)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows_visible = (inner.height / CARD_HEIGHT).max(1) as usize;
    self.scroll_row = scroll_for(self.selected / self.columns, rows_visible, self.scroll_row);

    let visible = self.visible();
    if visible.is_empty() {
      let content = if filter.is_empty() {
        "No todos yet. Press 'a' to add one."
      } else {
        "No todos match the filter."
      };
      let paragraph = Paragraph::new(content).style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    let total_rows = visible.len().div_ceil(self.columns);
    for (offset, row) in (self.scroll_row..total_rows).take(rows_visible).enumerate() {
      let y = inner.y + offset as u16 * CARD_HEIGHT;
      let height = CARD_HEIGHT.min(inner.bottom().saturating_sub(y));
      if height == 0 {
        break;
      }

      let row_area = Rect::new(inner.x, y, inner.width, height);
      let constraints = (0..self.columns).map(|_| Constraint::Ratio(1, self.columns as u32));
      let cells = Layout::horizontal(constraints).split(row_area);

      for (col, cell) in cells.iter().enumerate() {
        let index = row * self.columns + col;
        if let Some(item) = visible.get(index) {
          draw_todo_card(frame, *cell, item, index == self.selected);
        }
      }
    }
  }
}

/// First row to show so that `selected_row` stays on screen
fn scroll_for(selected_row: usize, rows_visible: usize, scroll_row: usize) -> usize {
  if selected_row < scroll_row {
    selected_row
  } else if selected_row >= scroll_row + rows_visible {
    selected_row + 1 - rows_visible
  } else {
    scroll_row
  }
}

impl<A: TodoApi> View for TodoListView<A> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // The form gets first pick once the list has loaded, unless the filter
    // is being edited
    if !self.filter.is_active() && self.query.is_success() {
      match self.form.handle_key(key) {
        KeyResult::Event(AddTodoEvent::Submit(title)) => {
          self.submit(title);
          return ViewAction::None;
        }
        KeyResult::Handled => return ViewAction::None,
        KeyResult::NotHandled => {}
      }
    }

    match self.filter.handle_key(key) {
      KeyResult::Event(PromptEvent::Changed(_) | PromptEvent::Cancelled) => {
        self.selected = 0;
        return ViewAction::None;
      }
      KeyResult::Event(PromptEvent::Submitted(_)) | KeyResult::Handled => {
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
    }

    let columns = self.columns as isize;
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(columns),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(-columns),
      KeyCode::Char('l') | KeyCode::Right => self.move_selection(1),
      KeyCode::Char('h') | KeyCode::Left => self.move_selection(-1),
      KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
      KeyCode::Char('d') | KeyCode::Char('x') => self.delete_selected(),
      KeyCode::Esc if !self.filter.value().is_empty() => {
        self.filter.clear();
        self.selected = 0;
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    if self.query.is_success() {
      self.render_grid(frame, area);
    } else {
      let (message, color) = match self.query.state() {
        QueryState::Error(_) => ("Something went wrong while loading todos.", Color::Red),
        _ => ("Loading...", Color::DarkGray),
      };
      self.render_message(frame, area, message, color);
    }

    self.form.render_overlay(frame, area);
    self.filter.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Todos".to_string()
  }

  fn status(&self) -> Option<String> {
    match self.mutations.len() {
      0 if self.query.is_fetching() && self.query.is_success() => Some("syncing...".to_string()),
      0 => None,
      1 => Some("saving 1 change".to_string()),
      n => Some(format!("saving {} changes", n)),
    }
  }

  fn tick(&mut self) {
    // Settle first so invalidations are refetched on the same tick
    self.settle_mutations();
    self.query.poll();
    self.clamp_selection();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("a", "add"),
      ShortcutInfo::new("space", "toggle"),
      ShortcutInfo::new("d", "delete"),
      ShortcutInfo::new("/", "filter"),
      ShortcutInfo::new("q", "quit"),
    ]
  }
}
