use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::editor::{Command, ExportFormat, ExportJob, Message, export_file_name};
use crate::notify::Notifier;
use crate::render::{RenderError, RenderOutcome, RenderRequest, Renderer, new_render_id};
use crate::store::{DiagramPatch, DiagramRecord, RecordStore};

/// Raster exports are drawn at this multiple of the artifact's width.
const PNG_EXPORT_SCALE: f32 = 2.0;

/// Capabilities the editor's commands run against.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn RecordStore>,
    pub renderer: Arc<dyn Renderer>,
    pub notifier: Arc<dyn Notifier>,
}

/// Executes editor [`Command`]s and turns their results into [`Message`]s.
#[derive(Clone)]
pub struct Effects {
    services: Services,
    export_dir: PathBuf,
}

impl Effects {
    pub fn new(services: Services, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            services,
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Run one command to completion.
    ///
    /// Returns the completion message for commands that have one.
    /// Notifications are delivered here; navigation belongs to the caller
    /// and yields nothing.
    pub async fn execute(&self, command: Command) -> Option<Message> {
        match command {
            Command::Fetch(id) => {
                let result = self.services.store.fetch(&id).await;
                Some(Message::Loaded(result.map_err(|e| e.to_string())))
            }
            Command::Render(request) => {
                let seq = request.seq;
                let outcome = self.render(request).await;
                Some(Message::RenderFinished { seq, outcome })
            }
            Command::Save(request) => {
                let result = self
                    .services
                    .store
                    .update(&request.document_id, DiagramPatch::code(request.text))
                    .await
                    .map(|record| record.updated_at)
                    .map_err(|e| e.to_string());
                Some(Message::SaveFinished(result))
            }
            Command::Export(job) => {
                let result = write_export(&self.export_dir, job)
                    .await
                    .map_err(|e| format!("{e:#}"));
                Some(Message::ExportFinished(result))
            }
            Command::Notify(notification) => {
                self.services.notifier.notify(notification);
                None
            }
            Command::Navigate(route) => {
                debug!(?route, "navigation is handled by the caller");
                None
            }
        }
    }

    /// Render a stored diagram and write it to the export directory,
    /// outside of any editor session.
    ///
    /// # Errors
    ///
    /// Returns an error if the source does not render or the file cannot
    /// be written.
    pub async fn export_record(
        &self,
        record: &DiagramRecord,
        format: ExportFormat,
    ) -> anyhow::Result<PathBuf> {
        let request = RenderRequest {
            seq: 0,
            render_id: new_render_id(),
            source: record.code.clone(),
        };
        let artifact = match self.render(request).await {
            RenderOutcome::Rendered(artifact) => artifact,
            RenderOutcome::Invalid(diagnostic) => anyhow::bail!("Invalid diagram: {diagnostic}"),
            RenderOutcome::Failed(reason) => anyhow::bail!("Render failed: {reason}"),
        };
        let job = ExportJob {
            file_name: export_file_name(&record.title, format),
            format,
            svg: artifact.svg,
            width: artifact.width,
        };
        write_export(&self.export_dir, job).await
    }

    /// Validate first; only valid source reaches the full render.
    async fn render(&self, request: RenderRequest) -> RenderOutcome {
        let renderer = &self.services.renderer;
        if let Err(err) = renderer.validate(&request.source).await {
            debug!(seq = request.seq, error = %err, "validation failed");
            return RenderOutcome::Invalid(diagnostic(&err));
        }
        match renderer.render(&request.render_id, &request.source).await {
            Ok(artifact) => RenderOutcome::Rendered(artifact),
            Err(err @ RenderError::Syntax(_)) => RenderOutcome::Invalid(diagnostic(&err)),
            Err(err) => {
                warn!(seq = request.seq, error = %err, "render failed");
                RenderOutcome::Failed(err.to_string())
            }
        }
    }
}

fn diagnostic(err: &RenderError) -> String {
    match err {
        RenderError::Syntax(message) => message.clone(),
        RenderError::Backend(reason) => reason.clone(),
    }
}

async fn write_export(dir: &Path, job: ExportJob) -> anyhow::Result<PathBuf> {
    let bytes = match job.format {
        ExportFormat::Svg => job.svg.into_bytes(),
        ExportFormat::Png => {
            let width = png_width(job.width);
            tokio::task::spawn_blocking(move || crate::render::raster::svg_to_png(&job.svg, width))
                .await
                .context("rasterizer task panicked")??
        }
    };
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(&job.file_name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn png_width(width: f32) -> u32 {
    (width * PNG_EXPORT_SCALE).round().max(1.0) as u32
}

/// Completion reported when a command's task panicked.
fn crash_reply(command: &Command) -> Option<Message> {
    let reason = "background task panicked".to_string();
    match command {
        Command::Fetch(_) => Some(Message::Loaded(Err(reason))),
        Command::Render(request) => Some(Message::RenderFinished {
            seq: request.seq,
            outcome: RenderOutcome::Failed(reason),
        }),
        Command::Save(_) => Some(Message::SaveFinished(Err(reason))),
        Command::Export(_) => Some(Message::ExportFinished(Err(reason))),
        Command::Notify(_) | Command::Navigate(_) => None,
    }
}

/// Runs commands on a tokio runtime and hands completions back to a
/// synchronous loop.
///
/// Every dispatched command reports exactly once, even when its task
/// panics, so [`EffectRunner::outstanding`] always returns to zero.
pub struct EffectRunner {
    effects: Effects,
    handle: Handle,
    tx: mpsc::UnboundedSender<Option<Message>>,
    rx: mpsc::UnboundedReceiver<Option<Message>>,
    outstanding: usize,
}

impl EffectRunner {
    pub fn new(effects: Effects, handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            effects,
            handle,
            tx,
            rx,
            outstanding: 0,
        }
    }

    pub const fn effects(&self) -> &Effects {
        &self.effects
    }

    /// Commands started but not yet drained.
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Start `command` in the background. Notifications are delivered
    /// inline since they never produce a message; navigation is ignored.
    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::Notify(notification) => {
                self.effects.services.notifier.notify(notification);
            }
            Command::Navigate(route) => {
                debug!(?route, "navigation is handled by the caller");
            }
            command => {
                self.outstanding += 1;
                let fallback = crash_reply(&command);
                let effects = self.effects.clone();
                let task = self
                    .handle
                    .spawn(async move { effects.execute(command).await });
                let tx = self.tx.clone();
                self.handle.spawn(async move {
                    let reply = match task.await {
                        Ok(message) => message,
                        Err(err) => {
                            error!(error = %err, "effect task failed");
                            fallback
                        }
                    };
                    let _ = tx.send(reply);
                });
            }
        }
    }

    /// Completions that arrived since the last call.
    pub fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(reply) = self.rx.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            messages.extend(reply);
        }
        messages
    }

    /// Block until every dispatched command has completed.
    ///
    /// Must not be called from inside the runtime.
    pub fn wait_idle(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while self.outstanding > 0 {
            let Some(reply) = self.rx.blocking_recv() else {
                break;
            };
            self.outstanding -= 1;
            messages.extend(reply);
        }
        messages
    }
}
