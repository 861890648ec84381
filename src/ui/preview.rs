use image::RgbaImage;
use ratatui::prelude::*;
use tracing::{debug, warn};

use crate::editor::Zoom;
use crate::render::Artifact;
use crate::render::raster::rasterize_svg;

/// Upper half block: foreground paints the top pixel, background the bottom.
const HALF_BLOCK: &str = "\u{2580}";

/// Rasterized artifact, kept until the artifact, the pane size or the zoom
/// changes.
#[derive(Debug)]
pub struct PreviewCache {
    enabled: bool,
    backdrop: [u8; 3],
    key: Option<(String, u16, u16, Zoom)>,
    image: Option<RgbaImage>,
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewCache {
    pub const fn new() -> Self {
        Self {
            enabled: true,
            backdrop: [0, 0, 0],
            key: None,
            image: None,
        }
    }

    /// A cache that never rasterizes; the preview pane shows a summary.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Color transparent pixels are composited over.
    #[must_use]
    pub const fn with_backdrop(mut self, rgb: [u8; 3]) -> Self {
        self.backdrop = rgb;
        self
    }

    /// Pixel image for `artifact` fitted to `area` and scaled by `zoom`,
    /// two pixels per cell row.
    fn image_for(&mut self, artifact: &Artifact, zoom: Zoom, area: Rect) -> Option<&RgbaImage> {
        let key = (artifact.render_id.clone(), area.width, area.height, zoom);
        if self.key.as_ref() != Some(&key) {
            self.image = fit_width(artifact, area, zoom).and_then(|width| {
                match rasterize_svg(&artifact.svg, width) {
                    Ok(image) => Some(image.to_rgba8()),
                    Err(err) => {
                        warn!(render_id = %artifact.render_id, error = %err, "preview rasterization failed");
                        None
                    }
                }
            });
            debug!(
                render_id = %artifact.render_id,
                cols = area.width,
                rows = area.height,
                zoom = zoom.percent(),
                "preview rasterized"
            );
            self.key = Some(key);
        }
        self.image.as_ref()
    }

    /// Paint `artifact` into `area` with half-block cells, centered. When
    /// zoomed past the pane the middle of the image is shown.
    /// Returns `false` if nothing could be drawn.
    pub fn draw(&mut self, artifact: &Artifact, zoom: Zoom, area: Rect, buf: &mut Buffer) -> bool {
        if !self.enabled {
            return false;
        }
        let backdrop = self.backdrop;
        let Some(image) = self.image_for(artifact, zoom, area) else {
            return false;
        };
        let image_rows = image.height().div_ceil(2);
        let cols = u16::try_from(image.width()).unwrap_or(u16::MAX).min(area.width);
        let rows = u16::try_from(image_rows).unwrap_or(u16::MAX).min(area.height);
        let left = area.x + (area.width - cols) / 2;
        let top = area.y + (area.height - rows) / 2;
        let skip_x = (image.width() - u32::from(cols)) / 2;
        let skip_y = (image_rows - u32::from(rows)) / 2 * 2;
        for row in 0..rows {
            for col in 0..cols {
                let x = skip_x + u32::from(col);
                let y = skip_y + u32::from(row) * 2;
                let upper = pixel_color(image, x, y, backdrop);
                let lower = pixel_color(image, x, y + 1, backdrop);
                if let Some(cell) = buf.cell_mut((left + col, top + row)) {
                    cell.set_symbol(HALF_BLOCK).set_fg(upper).set_bg(lower);
                }
            }
        }
        true
    }
}

/// Raster width that fits the artifact inside `area` at two pixels per row,
/// then scaled by `zoom`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn fit_width(artifact: &Artifact, area: Rect, zoom: Zoom) -> Option<u32> {
    if area.width == 0 || area.height == 0 || artifact.width <= 0.0 || artifact.height <= 0.0 {
        return None;
    }
    let max_w = f32::from(area.width);
    let max_h = f32::from(area.height) * 2.0;
    let scale = (max_w / artifact.width).min(max_h / artifact.height) * zoom.factor();
    let width = (artifact.width * scale).floor() as u32;
    (width > 0).then_some(width)
}

/// Pixel as a terminal color, composited over `backdrop`. Rasterized
/// pixels are premultiplied.
fn pixel_color(image: &RgbaImage, x: u32, y: u32, backdrop: [u8; 3]) -> Color {
    if y >= image.height() || x >= image.width() {
        return Color::Reset;
    }
    let [r, g, b, a] = image.get_pixel(x, y).0;
    let over = |channel: u8, back: u8| {
        let rest = u16::from(back) * u16::from(255 - a) / 255;
        u8::try_from(u16::from(channel) + rest).unwrap_or(u8::MAX)
    };
    Color::Rgb(
        over(r, backdrop[0]),
        over(g, backdrop[1]),
        over(b, backdrop[2]),
    )
}
