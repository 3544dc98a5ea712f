use ratatui::style::{Color, Style};

pub(crate) const BASE_STYLE: Style = Style::new().fg(Color::White).bg(Color::Black);

/// Sundays and configured holidays, after the desk-calendar convention of
/// printing them in red.
pub(crate) const HOLIDAY_STYLE: Style = Style::new().fg(Color::LightRed).bg(Color::Black);

pub(crate) const SATURDAY_STYLE: Style = Style::new().fg(Color::LightBlue).bg(Color::Black);
