use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::editor::{EditorModel, LoadState};
use crate::render::RenderState;

use super::preview::PreviewCache;
use super::{SOURCE_WIDTH_PERCENT, PREVIEW_WIDTH_PERCENT, status, style};

pub fn split_main_columns(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(SOURCE_WIDTH_PERCENT),
            Constraint::Percentage(PREVIEW_WIDTH_PERCENT),
        ])
        .split(area)
}

/// Render the complete UI.
pub fn render(model: &EditorModel, preview: &mut PreviewCache, frame: &mut Frame) {
    let area = frame.area();
    let toast_active = model.active_toast().is_some();
    let footer_rows = 1 + u16::from(toast_active);
    let main_area = Rect {
        height: area.height.saturating_sub(footer_rows),
        ..area
    };
    let status_area = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: 1.min(area.height),
        ..area
    };

    let columns = split_main_columns(main_area);
    render_source(model, frame, columns[0]);
    render_preview(model, preview, frame, columns[1]);

    if toast_active && area.height >= 2 {
        let toast_area = Rect {
            y: area.y + area.height - 2,
            height: 1,
            ..area
        };
        status::render_toast_bar(model, frame, toast_area);
    }
    status::render_status_bar(model, frame, status_area);
}

fn render_source(model: &EditorModel, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style::pane_border(true))
        .title(" Source ");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if model.load_state() != LoadState::Ready {
        return;
    }

    let buf = model.buffer();
    let total_lines = buf.line_count();
    let gutter_width = line_number_width(total_lines);
    let visible = usize::from(inner.height).max(1);
    let (cursor_line, cursor_col) = buf.cursor();
    let start = cursor_line.saturating_sub(visible - 1);
    let end = (start + visible).min(total_lines);

    let content: Vec<Line> = (start..end)
        .map(|idx| {
            let text = buf.line(idx).unwrap_or_default();
            let number = format!("{:>width$} ", idx + 1, width = usize::from(gutter_width));
            Line::from(vec![Span::styled(number, style::muted()), Span::raw(text)])
        })
        .collect();
    frame.render_widget(Paragraph::new(content), inner);

    // Wide characters take two cells.
    let before: String = buf
        .line(cursor_line)
        .unwrap_or_default()
        .chars()
        .take(cursor_col)
        .collect();
    let row = u16::try_from(cursor_line - start).unwrap_or(u16::MAX);
    let col = u16::try_from(before.width()).unwrap_or(u16::MAX);
    let x = inner.x.saturating_add(gutter_width + 1).saturating_add(col);
    let y = inner.y.saturating_add(row);
    if x < inner.right() && y < inner.bottom() {
        frame.set_cursor_position((x, y));
    }
}

fn render_preview(model: &EditorModel, preview: &mut PreviewCache, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style::pane_border(false))
        .title(" Preview ");
    let inner = block.inner(area);

    let message = match (model.load_state(), model.render_state()) {
        (LoadState::Loading, _) => Some(Paragraph::new("Loading diagram...").style(style::muted())),
        (LoadState::Missing, _) => {
            Some(Paragraph::new("Diagram not found").style(style::diagnostic()))
        }
        (LoadState::Ready, RenderState::Idle) => {
            Some(Paragraph::new("Nothing rendered yet").style(style::muted()))
        }
        (LoadState::Ready, RenderState::Failure(diagnostic)) => Some(
            Paragraph::new(vec![
                Line::styled("Invalid diagram", style::diagnostic().bold()),
                Line::raw(""),
                Line::styled(diagnostic.clone(), style::diagnostic()),
            ])
            .wrap(Wrap { trim: false }),
        ),
        (LoadState::Ready, RenderState::Success(_)) => None,
    };

    let block = match model.render_driver().artifact() {
        Some(artifact) => block.title_bottom(
            Line::from(format!(
                " {} {:.0}x{:.0} ",
                artifact.kind, artifact.width, artifact.height
            ))
            .right_aligned(),
        ),
        None => block,
    };
    frame.render_widget(block, area);

    if let Some(message) = message {
        frame.render_widget(message, inner);
        return;
    }
    if let Some(artifact) = model.render_driver().artifact()
        && !preview.draw(artifact, model.zoom(), inner, frame.buffer_mut())
    {
        let fallback = format!(
            "{} ({:.0}x{:.0})",
            artifact.render_id, artifact.width, artifact.height
        );
        frame.render_widget(Paragraph::new(fallback).style(style::muted()), inner);
    }
}

/// Calculate the width needed for line numbers.
pub const fn line_number_width(total_lines: usize) -> u16 {
    if total_lines < 10 {
        1
    } else if total_lines < 100 {
        2
    } else if total_lines < 1_000 {
        3
    } else if total_lines < 10_000 {
        4
    } else {
        5
    }
}
