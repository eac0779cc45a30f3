use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::todo::types::Item;
use crate::ui::renderfns::{checkbox, item_style, truncate};

/// Rows taken by one card, borders included
pub const CARD_HEIGHT: u16 = 4;

/// Draw a single item card
pub fn draw_todo_card(frame: &mut Frame, area: Rect, item: &Item, selected: bool) {
  let border_color = if selected {
    Color::Yellow
  } else {
    Color::Blue
  };

  let mut block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border_color));

  if item.is_placeholder() {
    block = block.title(Span::styled(
      " saving... ",
      Style::default().fg(Color::Yellow).italic(),
    ));
  }

  let checkbox_color = if item.completed {
    Color::Green
  } else {
    Color::Cyan
  };

  let line = Line::from(vec![
    Span::styled(
      format!("{} ", checkbox(item.completed)),
      Style::default().fg(checkbox_color),
    ),
    Span::styled(truncate(&item.title, title_room(area)), item_style(item)),
  ]);

  let paragraph = Paragraph::new(line)
    .block(block)
    .wrap(Wrap { trim: true });

  frame.render_widget(paragraph, area);
}

/// Chars of title that fit inside the borders after the checkbox
fn title_room(area: Rect) -> usize {
  let text_width = area.width.saturating_sub(2) as usize;
  let text_lines = area.height.saturating_sub(2) as usize;
  (text_width * text_lines).saturating_sub(4)
}
