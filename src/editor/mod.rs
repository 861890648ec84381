//! The diagram editor controller.
//!
//! Follows The Elm Architecture: [`EditorModel`] holds the state,
//! [`update`] applies a [`Message`] and returns the next model, and any
//! I/O the model needs is queued as [`Command`]s for the runtime. Text
//! lives in a rope-backed [`SourceBuffer`]; every change feeds both the
//! render settle timer and the autosave quiet timer. Preview zoom is
//! view state only and never reaches the store.

mod buffer;
mod document;
mod export;
mod model;
mod update;
mod zoom;

pub use buffer::{Direction, EditAction, SourceBuffer};
pub use document::Document;
pub use export::{ExportFormat, export_file_name};
pub use model::{
    Command, EditorModel, EditorSettings, ExportJob, LoadState, Route, TOAST_MS,
};
pub use update::{Message, update};
pub use zoom::{Zoom, ZoomAction};
