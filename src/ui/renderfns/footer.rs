use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with the current view label and an optional status
pub fn draw_footer(frame: &mut Frame, area: Rect, label: &str, status: Option<&str>) {
  let mut spans = vec![
    Span::raw(" "),
    Span::styled(label.to_string(), Style::default().fg(Color::Cyan).bold()),
  ];

  if let Some(status) = status {
    spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(status.to_string(), Style::default().fg(Color::Yellow)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
