use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::assets::catalog::ReferenceCatalog;
use crate::foundation::core::{MarkerDescriptor, MarkerId, Pose};
use crate::foundation::error::{MarkerlayError, MarkerlayResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Each image is reported once; its anchor is not tracked afterwards.
    OneShot,
    /// Tracked images keep reporting pose updates.
    #[default]
    Continuous,
}

fn default_max_tracked() -> usize {
    1
}

/// What the consumer may configure about the tracking source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_max_tracked")]
    pub max_tracked_images: usize,
    #[serde(default)]
    pub detection: DetectionMode,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_tracked_images: default_max_tracked(),
            detection: DetectionMode::default(),
        }
    }
}

impl TrackingConfig {
    pub fn validate(&self) -> MarkerlayResult<()> {
        if self.max_tracked_images == 0 {
            return Err(MarkerlayError::validation(
                "max_tracked_images must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Receiver of tracking callbacks. Called from the tracking source's own thread.
pub trait TrackingDelegate: Send + Sync {
    fn on_image_detected(&self, descriptor: MarkerDescriptor, pose: Pose);
    fn on_image_pose_updated(&self, marker: &MarkerId, pose: Pose);
}

/// A source of image detections, configured and restarted by the session.
pub trait TrackingSource: Send {
    /// (Re)start with a fresh catalog. Clears everything previously detected.
    fn run(&mut self, catalog: Arc<ReferenceCatalog>, config: TrackingConfig);

    /// Deliver every event due up to `now_sec`. Returns the number of callbacks made.
    fn deliver_until(&mut self, now_sec: f64, delegate: &dyn TrackingDelegate) -> usize;

    /// Drop every event due up to `now_sec` without recording it as seen. Used while paused.
    /// Returns the number of events dropped.
    fn skip_until(&mut self, now_sec: f64) -> usize;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SightingKind {
    /// Detection on first sight, pose update afterwards.
    #[default]
    Auto,
    /// Report as a fresh detection even if the image was seen before.
    Detected,
    /// Pose update only; ignored for images not yet detected.
    Updated,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sighting {
    pub at_sec: f64,
    pub marker: MarkerId,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub kind: SightingKind,
}

/// Timed sightings replayed as a tracking source.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackingScript {
    pub sightings: Vec<Sighting>,
}

impl TrackingScript {
    pub fn from_json_str(json: &str) -> MarkerlayResult<Self> {
        let script: Self = serde_json::from_str(json)
            .map_err(|e| MarkerlayError::serde(format!("tracking script: {e}")))?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_path(path: &Path) -> MarkerlayResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read tracking script '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> MarkerlayResult<()> {
        if let Some(s) = self
            .sightings
            .iter()
            .find(|s| !s.at_sec.is_finite() || s.at_sec < 0.0)
        {
            return Err(MarkerlayError::validation(format!(
                "sighting of '{}' has invalid time {}",
                s.marker, s.at_sec
            )));
        }
        Ok(())
    }

    pub fn end_sec(&self) -> f64 {
        self.sightings.iter().map(|s| s.at_sec).fold(0.0, f64::max)
    }
}

/// A tracked image whose last sighting is older than this gives up its slot.
pub const TRACKING_LOST_SEC: f64 = 1.0;

#[derive(Clone, Debug)]
struct TrackedImage {
    marker: MarkerId,
    last_seen_sec: f64,
}

/// Replays a [`TrackingScript`] against the configured catalog.
///
/// Only catalog images are recognized. Continuous mode tracks at most `max_tracked_images` at
/// once and only tracked images report pose updates. A new detection takes a slot, evicting the
/// least recently seen image. A detected image outside the tracked set gets a slot back once one
/// is free, either below the cap or after an image goes unseen for [`TRACKING_LOST_SEC`].
#[derive(Debug)]
pub struct ReplayTracking {
    sightings: Vec<Sighting>,
    cursor: usize,
    catalog: Option<Arc<ReferenceCatalog>>,
    config: TrackingConfig,
    detected: BTreeSet<MarkerId>,
    tracked: VecDeque<TrackedImage>,
}

impl ReplayTracking {
    pub fn new(script: TrackingScript) -> Self {
        let mut sightings = script.sightings;
        sightings.sort_by(|a, b| a.at_sec.total_cmp(&b.at_sec));
        Self {
            sightings,
            cursor: 0,
            catalog: None,
            config: TrackingConfig::default(),
            detected: BTreeSet::new(),
            tracked: VecDeque::new(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.sightings.len()
    }

    /// Tracked images, least recently seen first.
    pub fn tracked(&self) -> impl Iterator<Item = &MarkerId> {
        self.tracked.iter().map(|t| &t.marker)
    }

    fn is_tracked(&self, marker: &MarkerId) -> bool {
        self.tracked.iter().any(|t| &t.marker == marker)
    }

    fn expire_lost(&mut self, now_sec: f64) {
        self.tracked.retain(|t| {
            let keep = now_sec - t.last_seen_sec <= TRACKING_LOST_SEC;
            if !keep {
                tracing::debug!(marker = %t.marker, "tracking lost");
            }
            keep
        });
    }

    /// Mark `marker` as seen at `at_sec`, evicting the least recently seen image when full.
    fn track(&mut self, marker: &MarkerId, at_sec: f64) {
        self.tracked.retain(|t| &t.marker != marker);
        self.tracked.push_back(TrackedImage {
            marker: marker.clone(),
            last_seen_sec: at_sec,
        });
        while self.tracked.len() > self.config.max_tracked_images {
            if let Some(evicted) = self.tracked.pop_front() {
                tracing::debug!(marker = %evicted.marker, "image no longer tracked");
            }
        }
    }

    fn deliver(
        &mut self,
        catalog: &ReferenceCatalog,
        sighting: Sighting,
        delegate: &dyn TrackingDelegate,
    ) -> bool {
        let Some(descriptor) = catalog.descriptor(&sighting.marker) else {
            tracing::warn!(marker = %sighting.marker, "sighting of image not in reference catalog");
            return false;
        };
        let one_shot = self.config.detection == DetectionMode::OneShot;
        if !one_shot {
            self.expire_lost(sighting.at_sec);
        }
        let seen = self.detected.contains(&descriptor.id);

        let detect = match sighting.kind {
            SightingKind::Auto => !seen,
            SightingKind::Detected => !(one_shot && seen),
            SightingKind::Updated => false,
        };
        if detect {
            self.detected.insert(descriptor.id.clone());
            if !one_shot {
                self.track(&descriptor.id, sighting.at_sec);
            }
            delegate.on_image_detected(descriptor, sighting.pose);
            return true;
        }

        if !seen || one_shot {
            return false;
        }
        if !self.is_tracked(&descriptor.id)
            && self.tracked.len() >= self.config.max_tracked_images
        {
            tracing::trace!(marker = %descriptor.id, "no free tracking slot");
            return false;
        }
        self.track(&descriptor.id, sighting.at_sec);
        delegate.on_image_pose_updated(&descriptor.id, sighting.pose);
        true
    }
}

impl TrackingSource for ReplayTracking {
    fn run(&mut self, catalog: Arc<ReferenceCatalog>, config: TrackingConfig) {
        tracing::info!(
            group = %catalog.group,
            images = catalog.len(),
            max_tracked = config.max_tracked_images,
            detection = ?config.detection,
            "tracking started"
        );
        self.catalog = Some(catalog);
        self.config = config;
        self.detected.clear();
        self.tracked.clear();
    }

    fn deliver_until(&mut self, now_sec: f64, delegate: &dyn TrackingDelegate) -> usize {
        let Some(catalog) = self.catalog.clone() else {
            return 0;
        };
        let mut delivered = 0;
        while let Some(s) = self.sightings.get(self.cursor) {
            if s.at_sec > now_sec {
                break;
            }
            let sighting = s.clone();
            self.cursor += 1;
            if self.deliver(&catalog, sighting, delegate) {
                delivered += 1;
            }
        }
        delivered
    }

    fn skip_until(&mut self, now_sec: f64) -> usize {
        let start = self.cursor;
        while let Some(s) = self.sightings.get(self.cursor) {
            if s.at_sec > now_sec {
                break;
            }
            self.cursor += 1;
        }
        let skipped = self.cursor - start;
        if skipped > 0 {
            tracing::debug!(skipped, until_sec = now_sec, "tracking paused; sightings dropped");
        }
        skipped
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/tracking.rs"]
mod tests;
