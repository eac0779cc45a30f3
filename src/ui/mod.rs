pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;

use renderfns::{draw_footer, draw_header};
use view::View;

/// Draw the header, the view's content, and the footer
pub fn draw(frame: &mut Frame, title: &str, view: &mut dyn View) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], title, &view.shortcuts());
  view.render(frame, chunks[1]);

  let status = view.status();
  draw_footer(frame, chunks[2], &view.breadcrumb_label(), status.as_deref());
}
