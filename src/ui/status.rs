use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::style;
use crate::editor::{EditorModel, LoadState};
use crate::render::RenderState;
use crate::sync::SaveStatus;

pub fn render_status_bar(model: &EditorModel, frame: &mut Frame, area: Rect) {
    let title = model
        .document()
        .map_or_else(|| model.id().to_string(), |d| d.title.clone());
    let (line, col) = model.buffer().cursor();
    let save = model.save_status();
    let save_label = match &save {
        SaveStatus::Error(reason) => format!("{}: {reason}", save.label()),
        _ => save.label().to_string(),
    };
    let render_label = match (model.load_state(), model.render_state()) {
        (LoadState::Loading, _) => "loading",
        (LoadState::Missing, _) => "missing",
        (_, _) if model.render_driver().is_settling() => "rendering",
        (_, RenderState::Idle) => "idle",
        (_, RenderState::Success(_)) => "ok",
        (_, RenderState::Failure(_)) => "error",
    };

    let status = Line::from(vec![
        Span::raw(format!(" {title}  Ln {}, Col {}  ", line + 1, col + 1)),
        Span::styled(save_label, style::save_indicator(&save).bg(Color::DarkGray)),
        Span::raw(format!(
            "  [{render_label}]  {}%  Esc:back  ^E:svg  ^P:png  ^\u{2191}/^\u{2193}:zoom",
            model.zoom().percent()
        )),
    ]);
    frame.render_widget(Paragraph::new(status).style(style::status_bar()), area);
}

pub fn render_toast_bar(model: &EditorModel, frame: &mut Frame, area: Rect) {
    let Some(notification) = model.active_toast() else {
        return;
    };
    let (prefix, bg, fg) = style::toast(notification.level);
    let toast = Paragraph::new(format!("{prefix} {notification}"))
        .style(Style::default().bg(bg).fg(fg));
    frame.render_widget(toast, area);
}
