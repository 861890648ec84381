use super::*;
use crate::editor::{EditorModel, EditorSettings, Message, ZoomAction, update};
use crate::render::{Artifact, MermaidRenderer, RenderOutcome, Renderer};
use crate::store::{DiagramId, DiagramRecord};
use chrono::{DateTime, Utc};
use ratatui::Terminal;
use ratatui::backend::TestBackend;

fn create_test_terminal() -> Terminal<TestBackend> {
    let backend = TestBackend::new(100, 30);
    Terminal::new(backend).unwrap()
}

fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    buffer.content().iter().map(|c| c.symbol()).collect()
}

fn loaded_model(code: &str) -> EditorModel {
    let model = EditorModel::open(DiagramId::from("X1"), EditorSettings::default());
    let at = DateTime::<Utc>::UNIX_EPOCH;
    update(
        model,
        Message::Loaded(Ok(Some(DiagramRecord {
            id: DiagramId::from("X1"),
            title: "Signup funnel".to_string(),
            description: None,
            code: code.to_string(),
            thumbnail_url: None,
            created_by: "u1".to_string(),
            created_at: at,
            updated_at: at,
        }))),
    )
}

fn draw(model: &EditorModel) -> String {
    let mut terminal = create_test_terminal();
    let mut preview = PreviewCache::new();
    terminal
        .draw(|frame| render(model, &mut preview, frame))
        .unwrap();
    screen(&terminal)
}

#[test]
fn test_loading_state_is_shown() {
    let model = EditorModel::open(DiagramId::from("X1"), EditorSettings::default());
    let content = draw(&model);
    assert!(content.contains("Loading diagram..."));
    assert!(content.contains("[loading]"));
}

#[test]
fn test_source_pane_shows_numbered_lines() {
    let model = loaded_model("graph TD\nA-->B");
    let content = draw(&model);
    assert!(content.contains("1 graph TD"));
    assert!(content.contains("2 A-->B"));
    assert!(content.contains("Signup funnel"));
    assert!(content.contains("Saved"));
}

#[test]
fn test_render_failure_shows_diagnostic() {
    let mut model = loaded_model("graph TD\nA-->");
    model = update(model, Message::Tick(200));
    let seq = model
        .take_commands()
        .into_iter()
        .find_map(|c| match c {
            crate::editor::Command::Render(r) => Some(r.seq),
            _ => None,
        })
        .unwrap();
    model = update(
        model,
        Message::RenderFinished {
            seq,
            outcome: RenderOutcome::Invalid("line 2: edge has no target".to_string()),
        },
    );
    let content = draw(&model);
    assert!(content.contains("Invalid diagram"));
    assert!(content.contains("line 2: edge has no target"));
    assert!(content.contains("[error]"));
}

#[tokio::test]
async fn test_rendered_artifact_is_painted() {
    let mut model = loaded_model("graph TD\nA-->B");
    model = update(model, Message::Tick(200));
    let request = model
        .take_commands()
        .into_iter()
        .find_map(|c| match c {
            crate::editor::Command::Render(r) => Some(r),
            _ => None,
        })
        .unwrap();
    let artifact: Artifact = MermaidRenderer::new()
        .render(&request.render_id, &request.source)
        .await
        .unwrap();
    model = update(
        model,
        Message::RenderFinished {
            seq: request.seq,
            outcome: RenderOutcome::Rendered(artifact.clone()),
        },
    );
    let content = draw(&model);
    assert!(content.contains(&format!(
        " graph {:.0}x{:.0} ",
        artifact.width, artifact.height
    )));
    assert!(content.contains('\u{2580}'));
}

#[test]
fn test_status_bar_shows_zoom() {
    let mut model = loaded_model("graph TD\nA-->B");
    assert!(draw(&model).contains(" 100% "));
    model = update(model, Message::Zoom(ZoomAction::In));
    assert!(draw(&model).contains(" 120% "));
    model = update(model, Message::Zoom(ZoomAction::Reset));
    assert!(draw(&model).contains(" 100% "));
}

#[test]
fn test_toast_appears_above_status_bar() {
    let mut model = loaded_model("graph TD\nA-->B");
    model = update(model, Message::Export(crate::editor::ExportFormat::Svg));
    let content = draw(&model);
    assert!(content.contains("[error] Nothing to render yet."));
}

#[test]
fn test_line_number_width() {
    assert_eq!(line_number_width(9), 1);
    assert_eq!(line_number_width(10), 2);
    assert_eq!(line_number_width(12_345), 5);
}

#[tokio::test]
async fn test_disabled_preview_shows_summary() {
    let mut model = loaded_model("graph LR\nA-->B-->C");
    model = update(model, Message::Tick(200));
    let request = model
        .take_commands()
        .into_iter()
        .find_map(|c| match c {
            crate::editor::Command::Render(r) => Some(r),
            _ => None,
        })
        .unwrap();
    let artifact = MermaidRenderer::new()
        .render(&request.render_id, &request.source)
        .await
        .unwrap();
    let summary = format!(" graph {:.0}x{:.0} ", artifact.width, artifact.height);
    model = update(
        model,
        Message::RenderFinished {
            seq: request.seq,
            outcome: RenderOutcome::Rendered(artifact),
        },
    );

    let mut terminal = create_test_terminal();
    let mut preview = PreviewCache::disabled();
    terminal
        .draw(|frame| render(&model, &mut preview, frame))
        .unwrap();
    let content = screen(&terminal);
    assert!(content.contains(&request.render_id));
    assert!(content.contains(&summary));
    assert!(!content.contains('\u{2580}'));
}
