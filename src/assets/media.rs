use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use crate::assets::decode;
use crate::foundation::core::Fps;
use crate::foundation::error::{MarkerlayError, MarkerlayResult};

/// Static properties of a decoded frame stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSourceInfo {
    /// Decoded frame width in pixels (both bands included).
    pub width: u32,
    /// Decoded frame height in pixels (both bands included).
    pub height: u32,
    pub fps: Fps,
    /// Frame count if known up front.
    pub frame_count: Option<u64>,
}

/// Pull-based stream of decoded RGBA frames.
///
/// `next_frame` returning `Ok(None)` is the end-of-stream signal. After end-of-stream,
/// `seek_to_start` rewinds so the next call yields the first frame again.
pub trait FrameSource: Send {
    fn info(&self) -> FrameSourceInfo;
    fn next_frame(&mut self) -> MarkerlayResult<Option<RgbaImage>>;
    fn seek_to_start(&mut self) -> MarkerlayResult<()>;
}

/// Frames held in memory; used for programmatic content and tests.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    frames: Arc<Vec<RgbaImage>>,
    fps: Fps,
    cursor: usize,
}

impl InMemorySource {
    pub fn new(frames: Vec<RgbaImage>, fps: Fps) -> MarkerlayResult<Self> {
        check_uniform_dims(&frames)?;
        Ok(Self {
            frames: Arc::new(frames),
            fps,
            cursor: 0,
        })
    }
}

impl FrameSource for InMemorySource {
    fn info(&self) -> FrameSourceInfo {
        let (width, height) = self.frames[0].dimensions();
        FrameSourceInfo {
            width,
            height,
            fps: self.fps,
            frame_count: Some(self.frames.len() as u64),
        }
    }

    fn next_frame(&mut self) -> MarkerlayResult<Option<RgbaImage>> {
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn seek_to_start(&mut self) -> MarkerlayResult<()> {
        self.cursor = 0;
        Ok(())
    }
}

fn check_uniform_dims(frames: &[RgbaImage]) -> MarkerlayResult<()> {
    let Some(first) = frames.first() else {
        return Err(MarkerlayError::decode("frame stream has no frames"));
    };
    let dims = first.dimensions();
    if dims.0 == 0 || dims.1 == 0 {
        return Err(MarkerlayError::decode("frame stream has zero-sized frames"));
    }
    if let Some(i) = frames.iter().position(|f| f.dimensions() != dims) {
        return Err(MarkerlayError::decode(format!(
            "frame #{i} is {:?}, expected {dims:?}",
            frames[i].dimensions()
        )));
    }
    Ok(())
}

/// A directory of numbered raster frames decoded lazily, one file per frame.
///
/// Frames are ordered by file name, so zero-padded numbering (`0001.png`, `0002.png`, ...)
/// is expected.
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    frames: Vec<PathBuf>,
    info: FrameSourceInfo,
    cursor: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: Fps) -> MarkerlayResult<Self> {
        let frames = list_frame_files(dir, &["png", "jpg", "jpeg"])?;
        let (width, height) = image::image_dimensions(&frames[0]).map_err(|e| {
            MarkerlayError::decode(format!(
                "read dimensions of '{}': {e}",
                frames[0].display()
            ))
        })?;
        if width == 0 || height == 0 {
            return Err(MarkerlayError::decode(format!(
                "'{}' has zero-sized frames",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            info: FrameSourceInfo {
                width,
                height,
                fps,
                frame_count: Some(frames.len() as u64),
            },
            frames,
            cursor: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSource for ImageSequenceSource {
    fn info(&self) -> FrameSourceInfo {
        self.info
    }

    fn next_frame(&mut self) -> MarkerlayResult<Option<RgbaImage>> {
        let Some(path) = self.frames.get(self.cursor) else {
            return Ok(None);
        };
        let img = decode::load_image(path)?;
        if img.dimensions() != (self.info.width, self.info.height) {
            return Err(MarkerlayError::decode(format!(
                "frame '{}' is {:?}, expected {}x{}",
                path.display(),
                img.dimensions(),
                self.info.width,
                self.info.height
            )));
        }
        self.cursor += 1;
        Ok(Some(img))
    }

    fn seek_to_start(&mut self) -> MarkerlayResult<()> {
        self.cursor = 0;
        Ok(())
    }
}

/// List the frame files of a sequence directory, sorted by file name.
pub(crate) fn list_frame_files(dir: &Path, exts: &[&str]) -> MarkerlayResult<Vec<PathBuf>> {
    let rd = std::fs::read_dir(dir).map_err(|e| {
        MarkerlayError::asset(format!("read frame directory '{}': {e}", dir.display()))
    })?;

    let mut frames = Vec::new();
    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if exts.contains(&ext.as_str()) {
            frames.push(path);
        }
    }
    frames.sort();

    if frames.is_empty() {
        return Err(MarkerlayError::asset(format!(
            "frame directory '{}' contains no {} frames",
            dir.display(),
            exts.join("/")
        )));
    }
    Ok(frames)
}

/// Metadata of a video container as reported by `ffprobe`.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
}

impl VideoSourceInfo {
    pub fn fps(&self) -> MarkerlayResult<Fps> {
        Fps::new(self.fps_num, self.fps_den)
    }
}

#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path) -> MarkerlayResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| MarkerlayError::decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(MarkerlayError::decode(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| MarkerlayError::decode(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MarkerlayError::decode("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| MarkerlayError::decode("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| MarkerlayError::decode("missing video height from ffprobe"))?;

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| MarkerlayError::decode("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_video(_source_path: &Path) -> MarkerlayResult<VideoSourceInfo> {
    Err(MarkerlayError::asset(
        "video container assets require the 'media-ffmpeg' feature",
    ))
}

#[cfg(feature = "media-ffmpeg")]
fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if a == 0 || b == 0 {
        return None;
    }
    Some((a, b))
}

/// Streaming decoder backed by a system `ffmpeg` child process writing raw RGBA to a pipe.
///
/// Rewinding kills the child and spawns a fresh decoder from time zero.
#[cfg(feature = "media-ffmpeg")]
pub struct FfmpegVideoSource {
    video: VideoSourceInfo,
    fps: Fps,
    child: Option<std::process::Child>,
    frame_len: usize,
}

#[cfg(feature = "media-ffmpeg")]
impl FfmpegVideoSource {
    pub fn open(path: &Path) -> MarkerlayResult<Self> {
        let video = probe_video(path)?;
        let fps = video.fps()?;
        let frame_len = video.width as usize * video.height as usize * 4;
        if frame_len == 0 {
            return Err(MarkerlayError::decode(
                "decoded video frame size is zero (invalid source dimensions)",
            ));
        }
        let mut src = Self {
            video,
            fps,
            child: None,
            frame_len,
        };
        src.spawn_decoder()?;
        Ok(src)
    }

    fn spawn_decoder(&mut self) -> MarkerlayResult<()> {
        use std::process::{Command, Stdio};

        self.kill_decoder();
        let child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.video.source_path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                MarkerlayError::decode(format!("failed to run ffmpeg for video decode: {e}"))
            })?;
        self.child = Some(child);
        Ok(())
    }

    fn kill_decoder(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(feature = "media-ffmpeg")]
impl FrameSource for FfmpegVideoSource {
    fn info(&self) -> FrameSourceInfo {
        let frame_count = (self.video.duration_sec * self.fps.as_f64()).round();
        FrameSourceInfo {
            width: self.video.width,
            height: self.video.height,
            fps: self.fps,
            frame_count: (frame_count > 0.0).then_some(frame_count as u64),
        }
    }

    fn next_frame(&mut self) -> MarkerlayResult<Option<RgbaImage>> {
        use std::io::Read;

        let Some(stdout) = self.child.as_mut().and_then(|c| c.stdout.as_mut()) else {
            return Ok(None);
        };
        let mut buf = vec![0u8; self.frame_len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {}
            // A trailing partial frame is treated like a clean end of stream.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.kill_decoder();
                return Ok(None);
            }
            Err(e) => {
                return Err(MarkerlayError::decode(format!(
                    "read decoded frame from ffmpeg for '{}': {e}",
                    self.video.source_path.display()
                )));
            }
        }
        RgbaImage::from_raw(self.video.width, self.video.height, buf)
            .map(Some)
            .ok_or_else(|| MarkerlayError::decode("decoded frame has unexpected length"))
    }

    fn seek_to_start(&mut self) -> MarkerlayResult<()> {
        self.spawn_decoder()
    }
}

#[cfg(feature = "media-ffmpeg")]
impl Drop for FfmpegVideoSource {
    fn drop(&mut self) {
        self.kill_decoder();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
