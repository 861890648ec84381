//! Terminal UI components.
//!
//! - [`render`]: source pane, preview pane and footer bars
//! - [`PreviewCache`]: rasterized diagram drawn with half-block cells
//! - [`style`]: colors

pub mod style;

mod preview;
mod render;
mod status;

pub use preview::PreviewCache;
pub use render::{line_number_width, render, split_main_columns};

pub const SOURCE_WIDTH_PERCENT: u16 = 45;
pub const PREVIEW_WIDTH_PERCENT: u16 = 55;

#[cfg(test)]
mod tests;
