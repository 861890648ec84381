use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::buffer::{EditAction, SourceBuffer};
use super::document::Document;
use super::export::{ExportFormat, export_file_name};
use super::model::{Command, EditorModel, ExportJob, LoadState, Route};
use super::zoom::ZoomAction;
use crate::notify::Notification;
use crate::render::RenderOutcome;
use crate::store::DiagramRecord;
use crate::sync::PersistenceSynchronizer;

/// Events the editor reacts to.
///
/// Keyboard and clock events come from the terminal loop; the `*Finished`
/// and `Loaded` variants are completions of [`Command`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Result of the initial fetch. `Ok(None)` means no such diagram.
    Loaded(Result<Option<DiagramRecord>, String>),
    /// A keystroke at clock `now_ms`.
    Input(EditAction, u64),
    /// Replace the whole text, e.g. a paste or an external edit.
    TextChanged(String, u64),
    /// Clock advance; fires settled timers.
    Tick(u64),
    RenderFinished { seq: u64, outcome: RenderOutcome },
    /// Store confirmation (refreshed `updated_at`) or failure reason.
    SaveFinished(Result<DateTime<Utc>, String>),
    Export(ExportFormat),
    ExportFinished(Result<PathBuf, String>),
    /// Magnify or shrink the preview.
    Zoom(ZoomAction),
    Back,
}

/// Apply one message to the editor.
pub fn update(mut model: EditorModel, msg: Message) -> EditorModel {
    match msg {
        Message::Loaded(result) => on_loaded(&mut model, result),
        Message::Input(action, now_ms) => {
            model.now_ms = model.now_ms.max(now_ms);
            if model.load == LoadState::Ready && model.buffer.apply(action) {
                let text = model.buffer.text();
                text_changed(&mut model, text);
            }
            fire_timers(&mut model);
        }
        Message::TextChanged(text, now_ms) => {
            model.now_ms = model.now_ms.max(now_ms);
            if model.load == LoadState::Ready && text != model.source_text() {
                let (line, col) = model.buffer.cursor();
                model.buffer = SourceBuffer::from_text(&text);
                model.buffer.set_cursor(line, col);
                text_changed(&mut model, text);
            }
            fire_timers(&mut model);
        }
        Message::Tick(now_ms) => {
            model.now_ms = model.now_ms.max(now_ms);
            fire_timers(&mut model);
        }
        Message::RenderFinished { seq, outcome } => {
            model.render.apply(seq, outcome);
        }
        Message::SaveFinished(outcome) => on_save_finished(&mut model, outcome),
        Message::Export(format) => on_export(&mut model, format),
        Message::ExportFinished(Ok(path)) => {
            info!(path = %path.display(), "diagram exported");
            model.notify(
                Notification::success("Blueprint exported.")
                    .with_detail(path.display().to_string()),
            );
        }
        Message::ExportFinished(Err(reason)) => {
            model.notify(Notification::error("Export failed").with_detail(reason));
        }
        Message::Zoom(action) => {
            model.zoom = model.zoom.apply(action);
            debug!(percent = model.zoom.percent(), "preview zoom");
        }
        Message::Back => model.push(Command::Navigate(Route::Listing)),
    }
    model
}

fn on_loaded(model: &mut EditorModel, result: Result<Option<DiagramRecord>, String>) {
    if model.load != LoadState::Loading {
        warn!(id = %model.id, "duplicate load ignored");
        return;
    }
    match result {
        Ok(Some(record)) => {
            let document = Document::from_record(record);
            info!(id = %document.id, title = %document.title, "diagram loaded");
            model.buffer = SourceBuffer::from_text(&document.source_text);
            model
                .render
                .on_change(&document.source_text, model.now_ms);
            model.sync = Some(PersistenceSynchronizer::new(model.settings.autosave_ms));
            model.document = Some(document);
            model.load = LoadState::Ready;
        }
        Ok(None) => not_found(model),
        Err(reason) => {
            warn!(id = %model.id, %reason, "fetch failed");
            not_found(model);
        }
    }
}

fn not_found(model: &mut EditorModel) {
    model.load = LoadState::Missing;
    model.notify(Notification::error("Diagram not found"));
    model.push(Command::Navigate(Route::Listing));
}

/// Both timers observe every text change.
fn text_changed(model: &mut EditorModel, text: String) {
    let now_ms = model.now_ms;
    model.render.on_change(&text, now_ms);
    if let Some(sync) = model.sync.as_mut() {
        sync.observe(&text, now_ms);
    }
    if let Some(document) = model.document.as_mut() {
        document.source_text = text;
    }
}

fn fire_timers(model: &mut EditorModel) {
    model.expire_toast();
    if model.load != LoadState::Ready {
        return;
    }
    if let Some(request) = model.render.poll(model.now_ms) {
        model.push(Command::Render(request));
    }
    let request = match (model.sync.as_mut(), model.document.as_ref()) {
        (Some(sync), Some(document)) => sync.poll(document, model.now_ms),
        _ => None,
    };
    if let Some(request) = request {
        model.push(Command::Save(request));
    }
}

fn on_save_finished(model: &mut EditorModel, outcome: Result<DateTime<Utc>, String>) {
    let failure = outcome.as_ref().err().cloned();
    let next = match (model.sync.as_mut(), model.document.as_mut()) {
        (Some(sync), Some(document)) => sync.complete(document, outcome),
        _ => {
            debug!("save completion before load ignored");
            None
        }
    };
    if let Some(reason) = failure {
        model.notify(Notification::error("Sync Failed").with_detail(reason));
    }
    if let Some(request) = next {
        model.push(Command::Save(request));
    }
}

fn on_export(model: &mut EditorModel, format: ExportFormat) {
    let Some(artifact) = model.render.artifact() else {
        model.notify(Notification::error("Nothing to render yet."));
        return;
    };
    let title = model.document.as_ref().map_or("", |d| d.title.as_str());
    let job = ExportJob {
        file_name: export_file_name(title, format),
        format,
        svg: artifact.svg.clone(),
        width: artifact.width,
    };
    model.push(Command::Export(job));
}
