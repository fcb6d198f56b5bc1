use std::path::Path;

use anyhow::Context;
use image::RgbaImage;

use crate::foundation::error::{MarkerlayError, MarkerlayResult};

/// Decode encoded image bytes into straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> MarkerlayResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

/// Read and decode an image file into straight-alpha RGBA8.
pub fn load_image(path: &Path) -> MarkerlayResult<RgbaImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read image bytes from '{}'", path.display()))?;
    decode_image(&bytes)
}

/// Parse and rasterize SVG bytes at their intrinsic size.
///
/// `resvg` renders premultiplied pixels; the result is converted back to straight alpha so SVG
/// and PNG frames share one representation.
pub fn rasterize_svg(bytes: &[u8], resources_dir: Option<&Path>) -> MarkerlayResult<RgbaImage> {
    let opts = usvg::Options {
        resources_dir: resources_dir.map(Path::to_path_buf),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    let width = svg_extent_px(size.width())?;
    let height = svg_extent_px(size.height())?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| MarkerlayError::decode("failed to allocate svg pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );

    let mut rgba = pixmap.data().to_vec();
    unpremultiply_rgba8_in_place(&mut rgba);
    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| MarkerlayError::decode("svg pixmap has unexpected length"))
}

fn svg_extent_px(v: f32) -> MarkerlayResult<u32> {
    const MAX_DIM: u32 = 16_384;
    if !v.is_finite() || v <= 0.0 {
        return Err(MarkerlayError::decode("svg has invalid width/height"));
    }
    let px = (v.ceil() as u32).max(1);
    if px > MAX_DIM {
        return Err(MarkerlayError::decode(format!(
            "svg raster size too large: {px} (max {MAX_DIM})"
        )));
    }
    Ok(px)
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
