//! Dual-band alpha decoding.
//!
//! Opaque video codecs carry no alpha channel, so overlay videos are authored with the color
//! image and a greyscale alpha mask packed side by side in one frame. Composition samples both
//! bands at the same logical texture coordinate and recombines them per pixel:
//!
//! ```text
//! out.rgb = frame.sample(color_map(u, v)).rgb
//! out.a   = frame.sample(alpha_map(u, v)).r
//! ```
//!
//! Texture coordinates here have a top-left origin. In bottom-left (GL) texture space the
//! default [`SplitLayout::Vertical`] reads color at `v' = (1 + v) / 2` and alpha at
//! `v' = v / 2`.

use image::RgbaImage;
use rayon::prelude::*;

use crate::foundation::core::{Affine, Point};
use crate::foundation::error::{MarkerlayError, MarkerlayResult};
use crate::foundation::math::luma_rec601;

/// How the color and alpha bands are packed into one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitLayout {
    /// Color in the upper half, alpha mask in the lower half.
    #[default]
    Vertical,
    /// Alpha mask in the upper half, color in the lower half.
    VerticalFlipped,
    /// Alpha mask in the left half, color in the right half.
    Horizontal,
    /// No packing. Color passes through fully opaque.
    Identity,
}

/// Which value of the alpha-band pixel becomes the output alpha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaSource {
    /// Red channel, as authored masks replicate the value across RGB.
    #[default]
    Red,
    /// Rec.601 luma of the mask pixel, for masks that were color-graded after packing.
    Luma,
}

/// Texture-space remaps from output coordinates into the packed frame.
///
/// Both maps are axis-aligned (scale + translate only).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandMapping {
    pub color: Affine,
    /// `None` when the layout carries no alpha band.
    pub alpha: Option<Affine>,
}

impl SplitLayout {
    pub fn band_mapping(self) -> BandMapping {
        let half_v = Affine::scale_non_uniform(1.0, 0.5);
        let half_u = Affine::scale_non_uniform(0.5, 1.0);
        let lower = Affine::translate((0.0, 0.5)) * half_v;
        let right = Affine::translate((0.5, 0.0)) * half_u;
        match self {
            Self::Vertical => BandMapping {
                color: half_v,
                alpha: Some(lower),
            },
            Self::VerticalFlipped => BandMapping {
                color: lower,
                alpha: Some(half_v),
            },
            Self::Horizontal => BandMapping {
                color: right,
                alpha: Some(half_u),
            },
            Self::Identity => BandMapping {
                color: Affine::IDENTITY,
                alpha: None,
            },
        }
    }

    /// Output surface size for a packed frame of `width x height`.
    pub fn output_size(self, width: u32, height: u32) -> MarkerlayResult<(u32, u32)> {
        if width == 0 || height == 0 {
            return Err(MarkerlayError::validation("dual-band frame must be non-empty"));
        }
        match self {
            Self::Vertical | Self::VerticalFlipped => {
                if !height.is_multiple_of(2) {
                    return Err(MarkerlayError::validation(format!(
                        "vertical split needs an even frame height, got {height}"
                    )));
                }
                Ok((width, height / 2))
            }
            Self::Horizontal => {
                if !width.is_multiple_of(2) {
                    return Err(MarkerlayError::validation(format!(
                        "horizontal split needs an even frame width, got {width}"
                    )));
                }
                Ok((width / 2, height))
            }
            Self::Identity => Ok((width, height)),
        }
    }
}

/// One decoded frame whose bands follow a known [`SplitLayout`].
#[derive(Clone, Debug)]
pub struct DualBandFrame {
    image: RgbaImage,
    layout: SplitLayout,
    output_size: (u32, u32),
}

impl DualBandFrame {
    pub fn new(image: RgbaImage, layout: SplitLayout) -> MarkerlayResult<Self> {
        let (w, h) = image.dimensions();
        let output_size = layout.output_size(w, h)?;
        Ok(Self {
            image,
            layout,
            output_size,
        })
    }

    pub fn layout(&self) -> SplitLayout {
        self.layout
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }
}

/// Composite a dual-band frame into a freshly allocated straight-alpha RGBA surface.
pub fn composite_frame(frame: &DualBandFrame, alpha: AlphaSource) -> RgbaImage {
    let (w, h) = frame.output_size;
    let mut out = RgbaImage::new(w, h);
    composite_rows(frame, alpha, &mut out);
    out
}

/// Composite into an existing surface, reusing its allocation.
pub fn composite_into(
    frame: &DualBandFrame,
    alpha: AlphaSource,
    out: &mut RgbaImage,
) -> MarkerlayResult<()> {
    if out.dimensions() != frame.output_size {
        return Err(MarkerlayError::validation(format!(
            "surface is {:?}, composited frame is {:?}",
            out.dimensions(),
            frame.output_size
        )));
    }
    composite_rows(frame, alpha, out);
    Ok(())
}

fn composite_rows(frame: &DualBandFrame, alpha: AlphaSource, out: &mut RgbaImage) {
    let (src_w, src_h) = frame.image.dimensions();
    let (out_w, out_h) = frame.output_size;
    let mapping = frame.layout.band_mapping();

    // Both maps are separable, so each axis is resolved once up front.
    let color_cols = texel_columns(mapping.color, out_w, src_w);
    let color_rows = texel_rows(mapping.color, out_h, src_h);
    let alpha_lut = mapping
        .alpha
        .map(|m| (texel_columns(m, out_w, src_w), texel_rows(m, out_h, src_h)));

    let src: &[u8] = frame.image.as_raw();
    let stride = src_w as usize * 4;
    let dst: &mut [u8] = out;

    dst.par_chunks_exact_mut(out_w as usize * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let color_row = &src[color_rows[y] * stride..][..stride];
            let alpha_row = alpha_lut
                .as_ref()
                .map(|(_, rows)| &src[rows[y] * stride..][..stride]);

            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let c = color_cols[x] * 4;
                px[..3].copy_from_slice(&color_row[c..c + 3]);
                px[3] = match (alpha_row, alpha_lut.as_ref()) {
                    (Some(arow), Some((cols, _))) => {
                        let a = cols[x] * 4;
                        match alpha {
                            AlphaSource::Red => arow[a],
                            AlphaSource::Luma => luma_rec601(arow[a], arow[a + 1], arow[a + 2]),
                        }
                    }
                    _ => 255,
                };
            }
        });
}

fn texel_columns(map: Affine, out_extent: u32, src_extent: u32) -> Vec<usize> {
    (0..out_extent)
        .map(|x| {
            let u = (f64::from(x) + 0.5) / f64::from(out_extent);
            texel(map * Point::new(u, 0.0), src_extent, true)
        })
        .collect()
}

fn texel_rows(map: Affine, out_extent: u32, src_extent: u32) -> Vec<usize> {
    (0..out_extent)
        .map(|y| {
            let v = (f64::from(y) + 0.5) / f64::from(out_extent);
            texel(map * Point::new(0.0, v), src_extent, false)
        })
        .collect()
}

/// Nearest texel for a mapped coordinate, clamped to the frame edge.
fn texel(p: Point, extent: u32, horizontal: bool) -> usize {
    let coord = if horizontal { p.x } else { p.y };
    let max = i64::from(extent) - 1;
    ((coord * f64::from(extent)).floor() as i64).clamp(0, max) as usize
}

#[cfg(test)]
#[path = "../../tests/unit/composite/dual_band.rs"]
mod tests;
