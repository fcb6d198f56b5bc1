use image::RgbaImage;

use crate::assets::media::FrameSource;
use crate::assets::store::{AssetRef, AssetStore};
use crate::composite::dual_band::{AlphaSource, DualBandFrame, SplitLayout, composite_into};
use crate::foundation::core::{Fps, MarkerId};
use crate::foundation::error::{MarkerlayError, MarkerlayResult};
use crate::session::notify::NotificationPoster;

/// Frame rate assumed for image-sequence videos that do not declare one.
pub const DEFAULT_SEQUENCE_FPS: Fps = Fps { num: 30, den: 1 };

/// How an overlay video is played back.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlaybackSpec {
    pub looping: bool,
    /// Overlay videos carry no audible track in the session; `muted` pins volume at 0.
    pub muted: bool,
    pub layout: SplitLayout,
    pub alpha: AlphaSource,
    /// Frame rate for sources without an intrinsic one (frame directories).
    pub fps: Option<Fps>,
}

impl Default for PlaybackSpec {
    fn default() -> Self {
        Self {
            looping: true,
            muted: true,
            layout: SplitLayout::Vertical,
            alpha: AlphaSource::Red,
            fps: None,
        }
    }
}

/// Delivered on the notification thread when a stream runs out of frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackNotice {
    DidPlayToEnd { marker: MarkerId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Playing,
    /// End of stream reached on a looping video; the last frame stays on screen until
    /// [`AlphaVideoCompositor::restart`] runs.
    AwaitingRestart,
    Ended,
}

/// Playback counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct PlaybackStats {
    /// Frames pulled from the source.
    pub frames_decoded: u64,
    /// Frames composited onto the surface (skipped frames are decoded but not composited).
    pub frames_presented: u64,
    pub seeks: u64,
    pub resumes: u64,
    pub loops_completed: u64,
    /// Largest playback-time distance between two consecutive presented frames.
    pub max_frame_gap_sec: f64,
}

/// Turns a dual-band frame stream into a live straight-alpha RGBA surface.
///
/// Playback is clock driven: [`advance`](Self::advance) moves the playhead and only the latest
/// due frame is composited. At end of stream the last surface is held (no blank frame), a
/// [`PlaybackNotice::DidPlayToEnd`] is posted, and looping resumes when the notice comes back
/// as a [`restart`](Self::restart) on the scene-update thread.
pub struct AlphaVideoCompositor {
    marker: MarkerId,
    source: Box<dyn FrameSource>,
    spec: PlaybackSpec,
    notifier: Option<NotificationPoster>,

    surface: RgbaImage,
    frame_sec: f64,
    clock_sec: f64,
    pending_sec: f64,
    last_present_sec: f64,
    ended_at_sec: f64,

    state: PlaybackState,
    stats: PlaybackStats,
}

impl std::fmt::Debug for AlphaVideoCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVideoCompositor")
            .field("marker", &self.marker)
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl AlphaVideoCompositor {
    /// Resolve and open `asset`, presenting its first frame.
    ///
    /// Any failure (asset absent, undecodable, odd packed axis) is logged and yields `None`, so
    /// the marker simply gets no overlay.
    pub fn open(
        store: &AssetStore,
        marker: MarkerId,
        asset: &AssetRef,
        spec: PlaybackSpec,
        notifier: Option<NotificationPoster>,
    ) -> Option<Self> {
        let source = store.open_video(asset, spec.fps.unwrap_or(DEFAULT_SEQUENCE_FPS))?;
        match Self::new(marker, source, spec, notifier) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(asset = %asset, error = %e, "video overlay unavailable");
                None
            }
        }
    }

    pub fn new(
        marker: MarkerId,
        mut source: Box<dyn FrameSource>,
        spec: PlaybackSpec,
        notifier: Option<NotificationPoster>,
    ) -> MarkerlayResult<Self> {
        let info = source.info();
        let (w, h) = spec.layout.output_size(info.width, info.height)?;
        let first = source
            .next_frame()?
            .ok_or_else(|| MarkerlayError::decode(format!("video for '{marker}' has no frames")))?;

        let mut this = Self {
            marker,
            source,
            spec,
            notifier,
            surface: RgbaImage::new(w, h),
            frame_sec: info.fps.frame_duration_secs(),
            clock_sec: 0.0,
            pending_sec: 0.0,
            last_present_sec: 0.0,
            ended_at_sec: 0.0,
            state: PlaybackState::Playing,
            stats: PlaybackStats::default(),
        };
        this.stats.frames_decoded = 1;
        this.present(first, 0.0)?;
        Ok(this)
    }

    /// Advance the playhead by `dt` seconds. Returns whether the surface changed.
    #[tracing::instrument(level = "trace", skip(self), fields(marker = %self.marker))]
    pub fn advance(&mut self, dt: f64) -> MarkerlayResult<bool> {
        if self.state == PlaybackState::Ended || dt.is_nan() || dt <= 0.0 {
            return Ok(false);
        }
        self.clock_sec += dt;
        if self.state == PlaybackState::AwaitingRestart {
            return Ok(false);
        }

        self.pending_sec += dt;
        let mut latest = None;
        while self.pending_sec >= self.frame_sec {
            self.pending_sec -= self.frame_sec;
            let due_at = self.clock_sec - self.pending_sec;
            match self.source.next_frame()? {
                Some(frame) => {
                    self.stats.frames_decoded += 1;
                    latest = Some((frame, due_at));
                }
                None => {
                    let changed = latest.is_some();
                    if let Some((frame, at)) = latest.take() {
                        self.present(frame, at)?;
                    }
                    self.reach_end(due_at);
                    return Ok(changed);
                }
            }
        }

        match latest {
            Some((frame, at)) => {
                self.present(frame, at)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Seek to zero and resume, as one transition: frame 0 is presented before this returns.
    ///
    /// Ignored unless the compositor is a looping video waiting at end of stream, so a duplicate
    /// notice cannot seek twice.
    pub fn restart(&mut self) -> MarkerlayResult<bool> {
        if !self.spec.looping || self.state != PlaybackState::AwaitingRestart {
            tracing::debug!(marker = %self.marker, state = ?self.state, "ignoring loop restart");
            return Ok(false);
        }

        self.source.seek_to_start()?;
        self.stats.seeks += 1;
        let first = self.source.next_frame()?.ok_or_else(|| {
            MarkerlayError::decode(format!("video for '{}' is empty after seek", self.marker))
        })?;
        self.stats.frames_decoded += 1;

        self.present(first, self.ended_at_sec)?;
        // Time spent waiting for the notice still counts, so playback catches up.
        self.pending_sec = self.clock_sec - self.ended_at_sec;
        self.state = PlaybackState::Playing;
        self.stats.resumes += 1;
        self.stats.loops_completed += 1;
        tracing::debug!(marker = %self.marker, loops = self.stats.loops_completed, "video looped");
        Ok(true)
    }

    pub fn marker(&self) -> &MarkerId {
        &self.marker
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.surface.dimensions()
    }

    pub fn spec(&self) -> &PlaybackSpec {
        &self.spec
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    pub fn volume(&self) -> f32 {
        if self.spec.muted { 0.0 } else { 1.0 }
    }

    fn present(&mut self, frame: RgbaImage, at_sec: f64) -> MarkerlayResult<()> {
        let frame = DualBandFrame::new(frame, self.spec.layout)?;
        composite_into(&frame, self.spec.alpha, &mut self.surface)?;
        if self.stats.frames_presented > 0 {
            let gap = at_sec - self.last_present_sec;
            self.stats.max_frame_gap_sec = self.stats.max_frame_gap_sec.max(gap);
        }
        self.last_present_sec = at_sec;
        self.stats.frames_presented += 1;
        Ok(())
    }

    fn reach_end(&mut self, at_sec: f64) {
        self.ended_at_sec = at_sec;
        self.pending_sec = 0.0;
        if !self.spec.looping {
            self.state = PlaybackState::Ended;
            tracing::debug!(marker = %self.marker, "video ended");
            return;
        }

        self.state = PlaybackState::AwaitingRestart;
        if let Some(notifier) = &self.notifier {
            notifier.post(PlaybackNotice::DidPlayToEnd {
                marker: self.marker.clone(),
            });
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
