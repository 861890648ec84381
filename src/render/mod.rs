//! Rendering capability and the driver that feeds it.
//!
//! [`Renderer`] is the seam to whatever turns diagram source into vector
//! markup. [`MermaidRenderer`] is the implementation backed by
//! `mermaid-rs-renderer`. [`RenderDriver`] decides when to render and which
//! result gets displayed.

mod driver;
mod mermaid;
pub mod raster;

pub use driver::{RenderDriver, RenderOutcome, RenderRequest, RenderState};
pub use mermaid::{MermaidRenderer, diagram_kind};

use async_trait::async_trait;

/// A rendered diagram: serialized SVG plus a little metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub render_id: String,
    pub svg: String,
    pub width: f32,
    pub height: f32,
    /// Diagram keyword, e.g. `flowchart` or `sequenceDiagram`.
    pub kind: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The source is not a diagram the renderer understands.
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("renderer failed: {0}")]
    Backend(String),
}

/// Turns diagram source text into an [`Artifact`].
///
/// `render_id` must be unique per call; implementations use it to keep
/// concurrent renders from colliding.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Check syntax without producing output.
    async fn validate(&self, source: &str) -> Result<(), RenderError>;

    async fn render(&self, render_id: &str, source: &str) -> Result<Artifact, RenderError>;
}

/// A fresh render id of the form `mermaid-<hex>`.
pub fn new_render_id() -> String {
    format!("mermaid-{}", uuid::Uuid::new_v4().simple())
}
