// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. render::RenderDriver)
    clippy::module_name_repetitions
)]

//! # mermaid-dash
//!
//! A mermaid diagram dashboard with a live terminal editor.
//!
//! Users write mermaid definitions, see them rendered, and have them
//! saved to their account:
//! - Debounced re-rendering with stale results discarded
//! - Debounced autosave with a persisted-text watermark
//! - SVG and PNG export
//! - Guest and provider sign-in, per-user diagram listing
//!
//! ## Architecture
//!
//! The editor uses The Elm Architecture (TEA) pattern:
//! - **Model**: [`editor::EditorModel`]
//! - **Message**: key presses, the clock, and completed background work
//! - **Update**: pure state transitions that queue [`editor::Command`]s
//! - **View**: Render to terminal
//!
//! Storage, identity and rendering are capabilities behind traits, so the
//! pipeline runs the same against in-memory fakes and on-disk stores.
//!
//! ## Modules
//!
//! - [`editor`]: Editor state machine
//! - [`debounce`]: Trailing-edge debouncer
//! - [`render`]: Rendering capability, the mermaid renderer and the render driver
//! - [`sync`]: Persistence synchronizer
//! - [`store`]: Record and blob storage
//! - [`identity`]: Sign-in and the session context
//! - [`dashboard`]: Listing, creating and deleting diagrams
//! - [`app`]: Terminal event loop and effect execution
//! - [`ui`]: Terminal UI components
//! - [`notify`]: User notifications
//! - [`config`]: Flag files

pub mod app;
pub mod config;
pub mod dashboard;
pub mod debounce;
pub mod editor;
pub mod identity;
pub mod notify;
pub mod render;
pub mod store;
pub mod sync;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Effects, Services};
    pub use crate::editor::{Command, EditorModel, Message, update};
    pub use crate::render::{MermaidRenderer, Renderer};
    pub use crate::store::{DiagramId, RecordStore};
}
