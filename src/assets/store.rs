use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbaImage;

use crate::assets::catalog::ReferenceCatalog;
use crate::assets::decode;
use crate::assets::media::{self, FrameSource, ImageSequenceSource};
use crate::foundation::core::Fps;
use crate::foundation::error::{MarkerlayError, MarkerlayResult};
use crate::foundation::math::Fnv1a64;

/// A named asset plus file extension, e.g. `Fire` + `mp4`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AssetRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
}

impl AssetRef {
    pub fn new(name: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ext: Some(ext.into()),
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ext: None,
        }
    }

    /// File (or directory) name the asset resolves to inside the store root.
    pub fn file_name(&self) -> String {
        match self.ext.as_deref() {
            Some(ext) if !ext.is_empty() => format!("{}.{ext}", self.name),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Media kind used as a tag when hashing asset identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Video,
    Animation,
    Image,
}

impl AssetKind {
    fn tag(self) -> u8 {
        match self {
            Self::Video => b'V',
            Self::Animation => b'N',
            Self::Image => b'I',
        }
    }
}

/// Stable hashed identifier of a resolved asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct AssetId(pub(crate) u64);

impl AssetId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Resolves asset names against a root directory.
///
/// Every lookup used on the per-detection path returns `Option`: a missing or unreadable asset
/// is logged and reported as absence, never as an error the caller has to propagate. Only
/// [`AssetStore::load_reference_catalog`] fails hard.
///
/// Decoded animation frames are cached by [`AssetId`] and shared between players, so a marker
/// seen again after a session reset does not decode its animation twice.
pub struct AssetStore {
    root: PathBuf,
    animations: Mutex<FrameCache>,
}

type FrameCache = HashMap<AssetId, Arc<Vec<RgbaImage>>>;

impl fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetStore")
            .field("root", &self.root)
            .field("cached_animations", &self.cached_animations())
            .finish()
    }
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            animations: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an existing asset file or frame directory.
    pub fn resolve(&self, asset: &AssetRef) -> Option<PathBuf> {
        let norm = match normalize_rel_path(&asset.file_name()) {
            Ok(norm) => norm,
            Err(e) => {
                tracing::warn!(asset = %asset, error = %e, "rejecting asset path");
                return None;
            }
        };
        let path = self.root.join(Path::new(&norm));
        if path.exists() {
            Some(path)
        } else {
            tracing::debug!(path = %path.display(), "asset not found");
            None
        }
    }

    pub fn id_for(&self, kind: AssetKind, asset: &AssetRef) -> Option<AssetId> {
        let norm = normalize_rel_path(&asset.file_name()).ok()?;
        let mut hasher = Fnv1a64::new_default();
        hasher.write_u8(kind.tag());
        hasher.write_bytes(norm.as_bytes());
        Some(AssetId(hasher.finish()))
    }

    /// Open a video stream. A directory resolves to an image sequence played at `fps`; any other
    /// file is decoded as a container through ffmpeg when the `media-ffmpeg` feature is enabled.
    pub fn open_video(&self, asset: &AssetRef, fps: Fps) -> Option<Box<dyn FrameSource>> {
        let path = self.resolve(asset)?;
        let opened: MarkerlayResult<Box<dyn FrameSource>> = if path.is_dir() {
            ImageSequenceSource::open(&path, fps).map(|s| Box::new(s) as Box<dyn FrameSource>)
        } else {
            open_container(&path)
        };
        match opened {
            Ok(source) => Some(source),
            Err(e) => {
                tracing::warn!(asset = %asset, error = %e, "cannot open video asset");
                None
            }
        }
    }

    /// Load every frame of an animation asset: a directory of PNG/SVG frames or a single SVG.
    pub fn open_animation(&self, asset: &AssetRef) -> Option<Arc<Vec<RgbaImage>>> {
        let id = self.id_for(AssetKind::Animation, asset)?;
        if let Some(frames) = self.lock_animations().get(&id) {
            return Some(frames.clone());
        }

        let path = self.resolve(asset)?;
        let frames = match load_animation_frames(&path) {
            Ok(frames) => Arc::new(frames),
            Err(e) => {
                tracing::warn!(asset = %asset, error = %e, "cannot load animation asset");
                return None;
            }
        };
        tracing::debug!(
            asset = %asset,
            id = id.as_u64(),
            frames = frames.len(),
            "animation cached"
        );
        self.lock_animations().insert(id, frames.clone());
        Some(frames)
    }

    pub fn cached_animations(&self) -> usize {
        self.lock_animations().len()
    }

    fn lock_animations(&self) -> MutexGuard<'_, FrameCache> {
        // Entries are only ever inserted whole.
        self.animations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a still image (PNG/JPEG or SVG) with its native alpha.
    pub fn open_image(&self, asset: &AssetRef) -> Option<RgbaImage> {
        let path = self.resolve(asset)?;
        match load_still(&path) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!(asset = %asset, error = %e, "cannot load image asset");
                None
            }
        }
    }

    /// Load `<root>/<group>.json`. Absence is fatal to the session.
    pub fn load_reference_catalog(&self, group: &str) -> MarkerlayResult<ReferenceCatalog> {
        let rel = normalize_rel_path(&format!("{group}.json")).map_err(|e| {
            MarkerlayError::missing_resource(format!("reference group '{group}': {e}"))
        })?;
        let path = self.root.join(rel);
        let json = std::fs::read_to_string(&path).map_err(|e| {
            MarkerlayError::missing_resource(format!(
                "missing expected reference catalog '{}': {e}",
                path.display()
            ))
        })?;
        ReferenceCatalog::from_json_str(group, &json)
    }
}

#[cfg(feature = "media-ffmpeg")]
fn open_container(path: &Path) -> MarkerlayResult<Box<dyn FrameSource>> {
    Ok(Box::new(media::FfmpegVideoSource::open(path)?))
}

#[cfg(not(feature = "media-ffmpeg"))]
fn open_container(path: &Path) -> MarkerlayResult<Box<dyn FrameSource>> {
    Err(MarkerlayError::asset(format!(
        "cannot decode '{}' without the 'media-ffmpeg' feature",
        path.display()
    )))
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

fn load_still(path: &Path) -> MarkerlayResult<RgbaImage> {
    if is_svg(path) {
        let bytes = std::fs::read(path).map_err(|e| {
            MarkerlayError::asset(format!("read svg '{}': {e}", path.display()))
        })?;
        decode::rasterize_svg(&bytes, path.parent())
    } else {
        decode::load_image(path)
    }
}

fn load_animation_frames(path: &Path) -> MarkerlayResult<Vec<RgbaImage>> {
    if path.is_file() {
        return Ok(vec![load_still(path)?]);
    }

    let files = media::list_frame_files(path, &["png", "svg"])?;
    let mut frames = Vec::with_capacity(files.len());
    for file in &files {
        let frame = load_still(file)?;
        if let Some(first) = frames.first().map(RgbaImage::dimensions)
            && frame.dimensions() != first
        {
            return Err(MarkerlayError::decode(format!(
                "animation frame '{}' is {:?}, expected {first:?}",
                file.display(),
                frame.dimensions()
            )));
        }
        frames.push(frame);
    }
    Ok(frames)
}

/// Normalize and validate store-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> MarkerlayResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(MarkerlayError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(MarkerlayError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(MarkerlayError::validation(
                "asset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(MarkerlayError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
