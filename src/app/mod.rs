//! Terminal front end for the diagram editor.
//!
//! The editor state machine lives in [`crate::editor`]; this module owns
//! the terminal, turns key presses and the clock into
//! [`crate::editor::Message`]s, and runs the resulting commands through
//! an [`EffectRunner`] on a tokio runtime:
//! - [`App::run`]: main event loop with rendering
//! - [`Effects`]: executes commands against the capabilities
//! - [`EffectRunner`]: background execution with completions polled by the loop

mod effects;
mod event_loop;
mod input;

pub use effects::{EffectRunner, Effects, Services};
pub use input::key_to_message;

use tokio::runtime::Handle;

use crate::editor::EditorSettings;

/// Owns the terminal session for one diagram.
pub struct App {
    effects: Effects,
    handle: Handle,
    settings: EditorSettings,
    preview: bool,
    backdrop: [u8; 3],
}

impl App {
    /// Create an app whose commands run on `handle`.
    pub const fn new(effects: Effects, handle: Handle) -> Self {
        Self {
            effects,
            handle,
            settings: EditorSettings {
                autosave_ms: crate::debounce::AUTOSAVE_QUIET_MS,
                render_settle_ms: crate::debounce::RENDER_SETTLE_MS,
            },
            preview: true,
            backdrop: [0, 0, 0],
        }
    }

    /// Override the pipeline timers.
    pub const fn with_settings(mut self, settings: EditorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Turn the rasterized preview on or off.
    pub const fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Color shown behind transparent parts of the preview.
    pub const fn with_backdrop(mut self, rgb: [u8; 3]) -> Self {
        self.backdrop = rgb;
        self
    }
}
