//! Colors for the editor chrome.
//!
//! Semantic ANSI colors so the panes follow the terminal's palette; only
//! the preview carries the diagram theme's own colors.

use ratatui::style::{Color, Modifier, Style};

use crate::notify::Level;
use crate::sync::SaveStatus;

pub fn pane_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn status_bar() -> Style {
    Style::default().bg(Color::DarkGray).fg(Color::White)
}

pub fn save_indicator(status: &SaveStatus) -> Style {
    match status {
        SaveStatus::Idle => Style::default().fg(Color::Green),
        SaveStatus::Saving => Style::default().fg(Color::Yellow),
        SaveStatus::Error(_) => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
    }
}

pub fn diagnostic() -> Style {
    Style::default().fg(Color::Red)
}

pub fn muted() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Prefix and colors of a toast.
pub const fn toast(level: Level) -> (&'static str, Color, Color) {
    match level {
        Level::Success => ("[ok]", Color::Green, Color::Black),
        Level::Info => ("[info]", Color::DarkGray, Color::White),
        Level::Progress => ("[..]", Color::Blue, Color::White),
        Level::Error => ("[error]", Color::Red, Color::White),
    }
}
