use crate::debounce::{AUTOSAVE_QUIET_MS, RENDER_SETTLE_MS};
use crate::notify::{Level, Notification};
use crate::render::{RenderDriver, RenderRequest, RenderState};
use crate::store::DiagramId;
use crate::sync::{PersistenceSynchronizer, SaveRequest, SaveStatus};

use super::buffer::SourceBuffer;
use super::document::Document;
use super::export::ExportFormat;
use super::zoom::Zoom;

/// How long a toast stays on screen.
pub const TOAST_MS: u64 = 3000;

/// Timer settings of the editor pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorSettings {
    pub autosave_ms: u64,
    pub render_settle_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            autosave_ms: AUTOSAVE_QUIET_MS,
            render_settle_ms: RENDER_SETTLE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    /// The id did not resolve to a diagram.
    Missing,
}

/// Places the editor can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Listing,
}

/// An export the runtime should write to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub file_name: String,
    pub format: ExportFormat,
    pub svg: String,
    /// Intrinsic width of the artifact, used to size raster output.
    pub width: f32,
}

/// Side effects requested by [`super::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Fetch(DiagramId),
    Render(RenderRequest),
    Save(SaveRequest),
    Export(ExportJob),
    Navigate(Route),
    Notify(Notification),
}

#[derive(Debug, Clone)]
struct Toast {
    notification: Notification,
    expires_at_ms: u64,
}

/// State of one open diagram editor.
///
/// The model never performs I/O. Work it needs done is queued as
/// [`Command`]s which the runtime drains with
/// [`EditorModel::take_commands`].
#[derive(Debug, Clone)]
pub struct EditorModel {
    pub(super) id: DiagramId,
    pub(super) settings: EditorSettings,
    pub(super) load: LoadState,
    pub(super) document: Option<Document>,
    pub(super) buffer: SourceBuffer,
    pub(super) render: RenderDriver,
    /// Created once the document has loaded.
    pub(super) sync: Option<PersistenceSynchronizer>,
    pub(super) now_ms: u64,
    pub(super) zoom: Zoom,
    outbox: Vec<Command>,
    toast: Option<Toast>,
}

impl EditorModel {
    /// Start editing `id`. The model begins in [`LoadState::Loading`] with a
    /// fetch queued.
    pub fn open(id: DiagramId, settings: EditorSettings) -> Self {
        let mut model = Self::blank(id.clone(), settings);
        model.push(Command::Fetch(id));
        model
    }

    fn blank(id: DiagramId, settings: EditorSettings) -> Self {
        Self {
            id,
            settings,
            load: LoadState::Loading,
            document: None,
            buffer: SourceBuffer::from_text(""),
            render: RenderDriver::new(settings.render_settle_ms),
            sync: None,
            now_ms: 0,
            zoom: Zoom::actual(),
            outbox: Vec::new(),
            toast: None,
        }
    }

    pub const fn id(&self) -> &DiagramId {
        &self.id
    }

    pub const fn settings(&self) -> EditorSettings {
        self.settings
    }

    pub const fn load_state(&self) -> LoadState {
        self.load
    }

    pub const fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub const fn buffer(&self) -> &SourceBuffer {
        &self.buffer
    }

    /// Current editor text; empty until the document has loaded.
    pub fn source_text(&self) -> &str {
        self.document.as_ref().map_or("", |d| d.source_text.as_str())
    }

    pub const fn render_state(&self) -> &RenderState {
        self.render.state()
    }

    pub const fn render_driver(&self) -> &RenderDriver {
        &self.render
    }

    pub const fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn save_status(&self) -> SaveStatus {
        self.sync
            .as_ref()
            .map_or(SaveStatus::Idle, |s| s.status().clone())
    }

    /// Earliest clock value at which a timer will fire, for the event loop's
    /// poll timeout.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        let timers = [
            self.render.deadline_ms(),
            self.sync.as_ref().and_then(PersistenceSynchronizer::deadline_ms),
            self.toast.as_ref().map(|t| t.expires_at_ms),
        ];
        timers.into_iter().flatten().min()
    }

    /// Drain the queued side effects.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outbox)
    }

    pub fn active_toast(&self) -> Option<&Notification> {
        self.toast.as_ref().map(|t| &t.notification)
    }

    pub(super) fn push(&mut self, command: Command) {
        self.outbox.push(command);
    }

    /// Queue a notification and show it as a toast.
    pub(super) fn notify(&mut self, notification: Notification) {
        if notification.level != Level::Progress {
            self.toast = Some(Toast {
                notification: notification.clone(),
                expires_at_ms: self.now_ms.saturating_add(TOAST_MS),
            });
        }
        self.push(Command::Notify(notification));
    }

    pub(super) fn expire_toast(&mut self) {
        if self
            .toast
            .as_ref()
            .is_some_and(|t| t.expires_at_ms <= self.now_ms)
        {
            self.toast = None;
        }
    }
}

impl Default for EditorModel {
    fn default() -> Self {
        Self::blank(DiagramId::from(""), EditorSettings::default())
    }
}
