use super::prompt::{Prompt, PromptEvent};
use super::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Events emitted by the creation form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTodoEvent {
  /// Non-blank title submitted; the input is already cleared
  Submit(String),
}

/// Creation form: `a` or `i` opens it, Enter submits, Esc discards.
///
/// Blank titles are refused and the form stays open.
#[derive(Debug, Clone)]
pub struct AddTodoForm {
  prompt: Prompt,
}

impl Default for AddTodoForm {
  fn default() -> Self {
    Self {
      prompt: Prompt::new("New todo", "+ ", &['a', 'i']).clear_on_submit(),
    }
  }
}

impl AddTodoForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.prompt.is_active()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<AddTodoEvent> {
    match self.prompt.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(title)) => {
        if title.trim().is_empty() {
          self.prompt.activate();
          KeyResult::Handled
        } else {
          KeyResult::Event(AddTodoEvent::Submit(title))
        }
      }
      KeyResult::Event(PromptEvent::Changed(_) | PromptEvent::Cancelled) | KeyResult::Handled => {
        KeyResult::Handled
      }
      KeyResult::NotHandled => KeyResult::NotHandled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    self.prompt.render_overlay(frame, area);
  }
}
