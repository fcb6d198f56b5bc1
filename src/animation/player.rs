use std::sync::Arc;

use image::RgbaImage;

use crate::foundation::core::Fps;
use crate::foundation::error::{MarkerlayError, MarkerlayResult};

/// Frame rate used for animation assets, which carry no timing of their own.
pub const DEFAULT_ANIMATION_FPS: Fps = Fps { num: 24, den: 1 };

/// Plays an embedded animation: frames with native alpha over a clear background.
///
/// No dual-band compositing is involved; the current frame is the surface.
#[derive(Clone, Debug)]
pub struct AnimationPlayer {
    frames: Arc<Vec<RgbaImage>>,
    fps: Fps,
    looping: bool,
    clock_sec: f64,
    index: usize,
}

impl AnimationPlayer {
    pub fn new(
        frames: impl Into<Arc<Vec<RgbaImage>>>,
        fps: Fps,
        looping: bool,
    ) -> MarkerlayResult<Self> {
        let frames = frames.into();
        let Some(first) = frames.first() else {
            return Err(MarkerlayError::decode("animation has no frames"));
        };
        if frames.iter().any(|f| f.dimensions() != first.dimensions()) {
            return Err(MarkerlayError::decode(
                "animation frames must share one size",
            ));
        }
        Ok(Self {
            frames,
            fps,
            looping,
            clock_sec: 0.0,
            index: 0,
        })
    }

    /// Advance by `dt` seconds. Returns whether the visible frame changed.
    pub fn advance(&mut self, dt: f64) -> bool {
        if !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        self.clock_sec += dt;
        let n = self.frames.len();
        let step = (self.clock_sec * self.fps.as_f64()).floor() as usize;
        let next = if self.looping {
            step % n
        } else {
            step.min(n - 1)
        };
        let changed = next != self.index;
        self.index = next;
        changed
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.frames[self.index]
    }

    pub fn frame_index(&self) -> usize {
        self.index
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn size(&self) -> (u32, u32) {
        self.surface().dimensions()
    }

    pub fn is_finished(&self) -> bool {
        !self.looping && self.index + 1 == self.frames.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/player.rs"]
mod tests;
