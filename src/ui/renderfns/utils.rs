use ratatui::prelude::{Color, Modifier, Style};

use crate::todo::types::Item;

/// Truncate a string to a maximum number of chars, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Checkbox glyph for a completion state
pub fn checkbox(completed: bool) -> &'static str {
  if completed {
    "[x]"
  } else {
    "[ ]"
  }
}

/// Text style for an item title: completed items are crossed out and dimmed,
/// unsaved placeholders are italic
pub fn item_style(item: &Item) -> Style {
  let style = if item.completed {
    Style::default()
      .fg(Color::DarkGray)
      .add_modifier(Modifier::CROSSED_OUT)
  } else {
    Style::default().fg(Color::White)
  };

  if item.is_placeholder() {
    style.add_modifier(Modifier::ITALIC)
  } else {
    style
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_counts_chars() {
    assert_eq!(truncate("crème brûlée", 8), "crème...");
  }

  #[test]
  fn test_checkbox() {
    assert_eq!(checkbox(true), "[x]");
    assert_eq!(checkbox(false), "[ ]");
  }

  #[test]
  fn test_item_style_completed_is_crossed_out() {
    let item = Item {
      id: "1".to_string(),
      title: "A".to_string(),
      completed: true,
    };
    let style = item_style(&item);
    assert!(style.add_modifier.contains(Modifier::CROSSED_OUT));
    assert_eq!(style.fg, Some(Color::DarkGray));
  }

  #[test]
  fn test_item_style_placeholder_is_italic() {
    let style = item_style(&Item::placeholder("B"));
    assert!(style.add_modifier.contains(Modifier::ITALIC));
    assert!(!style.add_modifier.contains(Modifier::CROSSED_OUT));
  }
}
