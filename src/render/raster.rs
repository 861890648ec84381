//! SVG rasterization for PNG export.

use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, ImageFormat, RgbaImage};
use resvg::usvg::fontdb;

/// Rasterize an SVG string so its width matches `target_width_px`.
///
/// The aspect ratio is preserved and the vector is drawn directly at the
/// final resolution.
///
/// # Errors
///
/// Returns an error if the SVG cannot be parsed or the target size is empty.
pub fn rasterize_svg(svg: &str, target_width_px: u32) -> Result<DynamicImage> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let opts = resvg::usvg::Options {
        fontdb: Arc::new(db),
        ..Default::default()
    };

    let tree = resvg::usvg::Tree::from_str(svg, &opts).context("invalid SVG")?;
    let size = tree.size();

    #[allow(clippy::cast_precision_loss)]
    let scale = target_width_px as f32 / size.width();

    let width = target_width_px;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let height = (size.height() * scale).ceil() as u32;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("failed to create pixmap {width}x{height}"))?;

    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let img = RgbaImage::from_raw(width, height, pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to create image from pixmap data"))?;
    Ok(DynamicImage::ImageRgba8(img))
}

/// Rasterize an SVG and encode it as PNG bytes.
///
/// # Errors
///
/// Returns an error if rasterization or encoding fails.
pub fn svg_to_png(svg: &str, target_width_px: u32) -> Result<Vec<u8>> {
    let img = rasterize_svg(svg, target_width_px)?;
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)
        .context("failed to encode PNG")?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOXES: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="100" viewBox="0 0 300 100">
<rect x="10" y="10" width="100" height="80" fill="#336699"/>
<rect x="190" y="10" width="100" height="80" fill="#996633"/>
<path d="M110 50 L190 50" stroke="#000" stroke-width="2"/>
</svg>"##;

    #[test]
    fn test_rasterize_matches_target_width() {
        let img = rasterize_svg(BOXES, 600).unwrap();
        assert_eq!(img.width(), 600);
        assert_eq!(img.height(), 200);
    }

    #[test]
    fn test_png_has_signature() {
        let png = svg_to_png(BOXES, 150).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_invalid_svg_is_an_error() {
        assert!(rasterize_svg("<not-svg", 100).is_err());
    }
}
