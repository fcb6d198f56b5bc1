use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::RgbaImage;

use crate::foundation::core::{FrameIndex, MarkerId};
use crate::foundation::error::MarkerlayResult;

/// One updated overlay surface, as drained from the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceFrame {
    pub marker: MarkerId,
    /// Per-marker surface counter, starting at 0 when the overlay attaches.
    pub index: FrameIndex,
    /// Scene time the surface became current.
    pub time_sec: f64,
    /// Straight-alpha RGBA.
    pub image: RgbaImage,
}

/// Consumer of overlay surfaces.
///
/// Ordering contract: for one overlay instance, `push` is called in strictly increasing `index`
/// order. A marker re-anchored after a reset starts a new instance at index 0.
pub trait SurfaceSink {
    fn push(&mut self, frame: &SurfaceFrame) -> MarkerlayResult<()>;
    fn finish(&mut self) -> MarkerlayResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub frames: Vec<SurfaceFrame>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_for<'a>(
        &'a self,
        marker: &'a MarkerId,
    ) -> impl Iterator<Item = &'a SurfaceFrame> {
        self.frames.iter().filter(move |f| &f.marker == marker)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl SurfaceSink for InMemorySink {
    fn push(&mut self, frame: &SurfaceFrame) -> MarkerlayResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> MarkerlayResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes `<root>/<marker>/<number>.png` (zero-padded to five digits).
///
/// File numbers keep counting across overlay instances: when a marker's surface index restarts
/// (the marker was re-anchored after a reset) the new run is numbered after the files already
/// written, never over them.
#[derive(Debug)]
pub struct PngSequenceSink {
    root: PathBuf,
    written: BTreeMap<MarkerId, u64>,
    runs: BTreeMap<MarkerId, SurfaceRun>,
}

/// File number of index 0 in the current run, and the last index pushed.
#[derive(Clone, Copy, Debug)]
struct SurfaceRun {
    base: u64,
    last_index: FrameIndex,
}

impl PngSequenceSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: BTreeMap::new(),
            runs: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Frames written so far, per marker.
    pub fn written(&self) -> &BTreeMap<MarkerId, u64> {
        &self.written
    }

    /// Path of file number `number` for `marker`.
    pub fn path_for(&self, marker: &MarkerId, number: FrameIndex) -> PathBuf {
        self.root
            .join(dir_name(marker))
            .join(format!("{:05}.png", number.0))
    }

    fn file_number(&mut self, frame: &SurfaceFrame) -> FrameIndex {
        let written = self.written.get(&frame.marker).copied().unwrap_or(0);
        let run = self
            .runs
            .entry(frame.marker.clone())
            .or_insert(SurfaceRun {
                base: 0,
                last_index: frame.index,
            });
        if frame.index <= run.last_index && written > 0 {
            tracing::debug!(
                marker = %frame.marker,
                continue_at = written,
                "surface index restarted; continuing file numbering"
            );
            run.base = written.saturating_sub(frame.index.0);
        }
        run.last_index = frame.index;
        FrameIndex(run.base + frame.index.0)
    }
}

impl SurfaceSink for PngSequenceSink {
    fn push(&mut self, frame: &SurfaceFrame) -> MarkerlayResult<()> {
        let number = self.file_number(frame);
        let path = self.path_for(&frame.marker, number);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            &path,
            frame.image.as_raw(),
            frame.image.width(),
            frame.image.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write surface png '{}'", path.display()))?;
        *self.written.entry(frame.marker.clone()).or_default() += 1;
        Ok(())
    }

    fn finish(&mut self) -> MarkerlayResult<()> {
        for (marker, n) in &self.written {
            tracing::info!(
                marker = %marker,
                frames = n,
                root = %self.root.display(),
                "wrote surfaces"
            );
        }
        Ok(())
    }
}

/// Marker names become directory names; path separators and leading dots are neutralised.
fn dir_name(marker: &MarkerId) -> String {
    let mut name: String = marker
        .as_str()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    if name.is_empty() || name.starts_with('.') {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
#[path = "../../tests/unit/output/sink.rs"]
mod tests;
