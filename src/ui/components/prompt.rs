use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by a prompt that its parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  /// Text changed (emitted on each edit)
  Changed(String),
  /// Enter pressed; the prompt closed
  Submitted(String),
  /// Escape pressed; the prompt closed and its text was cleared
  Cancelled,
}

/// One-line input overlay opened by an activation key
#[derive(Debug, Clone)]
pub struct Prompt {
  input: TextInput,
  active: bool,
  title: &'static str,
  prefix: &'static str,
  activation: &'static [char],
  /// Forget the text on submit (forms) or keep it (filters)
  clear_on_submit: bool,
}

impl Prompt {
  pub fn new(title: &'static str, prefix: &'static str, activation: &'static [char]) -> Self {
    Self {
      input: TextInput::new(),
      active: false,
      title,
      prefix,
      activation,
      clear_on_submit: false,
    }
  }

  pub fn clear_on_submit(mut self) -> Self {
    self.clear_on_submit = true;
    self
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn value(&self) -> &str {
    self.input.value()
  }

  /// Drop the text without changing active state
  pub fn clear(&mut self) {
    self.input.clear();
  }

  /// Open the prompt with empty text
  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      return match key.code {
        KeyCode::Char(c)
          if self.activation.contains(&c) && !key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
          self.activate();
          KeyResult::Handled
        }
        _ => KeyResult::NotHandled,
      };
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.active = false;
        if self.clear_on_submit {
          self.input.clear();
        }
        KeyResult::Event(PromptEvent::Submitted(value))
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(PromptEvent::Cancelled)
      }
      InputResult::Consumed => KeyResult::Event(PromptEvent::Changed(self.value().to_string())),
      // Swallow everything else while open
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the prompt overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = 3u16.min(area.height); // Just input line with borders

    // Position at top-left of content area with small margin
    let x = area.x + 1.min(area.width.saturating_sub(width));
    let y = area.y + 1.min(area.height.saturating_sub(height));
    let overlay_area = Rect::new(x, y, width, height);

    // Clear the area behind the overlay
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let input_line = Line::from(vec![
      Span::styled(self.prefix, Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);

    let cursor_x = inner.x + (self.prefix.chars().count() + self.input.cursor_position()) as u16;
    frame.set_cursor_position(Position::new(
      cursor_x.min(inner.right().saturating_sub(1)),
      inner.y,
    ));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_inactive_prompt_passes_keys_through() {
    let mut prompt = Prompt::new("Filter", "/", &['/']);
    assert_eq!(prompt.handle_key(key(KeyCode::Char('j'))), KeyResult::NotHandled);
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_activation_key_opens_prompt() {
    let mut prompt = Prompt::new("Filter", "/", &['/']);
    assert_eq!(prompt.handle_key(key(KeyCode::Char('/'))), KeyResult::Handled);
    assert!(prompt.is_active());
    assert_eq!(
      prompt.handle_key(key(KeyCode::Char('m'))),
      KeyResult::Event(PromptEvent::Changed("m".to_string()))
    );
  }

  #[test]
  fn test_submit_keeps_text_unless_clearing() {
    let mut filter = Prompt::new("Filter", "/", &['/']);
    filter.handle_key(key(KeyCode::Char('/')));
    filter.handle_key(key(KeyCode::Char('x')));
    filter.handle_key(key(KeyCode::Enter));
    assert!(!filter.is_active());
    assert_eq!(filter.value(), "x");

    let mut form = Prompt::new("New", "+ ", &['a']).clear_on_submit();
    form.handle_key(key(KeyCode::Char('a')));
    form.handle_key(key(KeyCode::Char('x')));
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(PromptEvent::Submitted("x".to_string()))
    );
    assert_eq!(form.value(), "");
  }

  #[test]
  fn test_cancel_clears_text() {
    let mut prompt = Prompt::new("Filter", "/", &['/']);
    prompt.handle_key(key(KeyCode::Char('/')));
    prompt.handle_key(key(KeyCode::Char('x')));
    assert_eq!(
      prompt.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(PromptEvent::Cancelled)
    );
    assert_eq!(prompt.value(), "");
  }

  #[test]
  fn test_open_prompt_swallows_unbound_keys() {
    let mut prompt = Prompt::new("Filter", "/", &['/']);
    prompt.handle_key(key(KeyCode::Char('/')));
    assert_eq!(prompt.handle_key(key(KeyCode::Tab)), KeyResult::Handled);
  }
}
