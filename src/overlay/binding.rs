use std::collections::BTreeMap;

use crate::assets::store::AssetRef;
use crate::composite::dual_band::{AlphaSource, SplitLayout};
use crate::foundation::core::MarkerId;
use crate::foundation::error::{MarkerlayError, MarkerlayResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Opaque dual-band video, composited into RGBA.
    Video,
    /// Frame animation with native alpha.
    Animation,
    /// Still image with native alpha.
    Image,
}

fn default_true() -> bool {
    true
}

fn is_default_split(split: &SplitLayout) -> bool {
    *split == SplitLayout::default()
}

fn is_default_alpha(alpha: &AlphaSource) -> bool {
    *alpha == AlphaSource::default()
}

/// Content shown on one marker. Read-only once the session runs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContentBinding {
    pub kind: MediaKind,
    pub asset: AssetRef,
    #[serde(rename = "loop", default = "default_true")]
    pub looping: bool,
    #[serde(default = "default_true")]
    pub muted: bool,
    #[serde(default, skip_serializing_if = "is_default_split")]
    pub split: SplitLayout,
    #[serde(default, skip_serializing_if = "is_default_alpha")]
    pub alpha: AlphaSource,
    /// Playback rate for frame-directory media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
}

impl ContentBinding {
    fn with_kind(kind: MediaKind, asset: AssetRef) -> Self {
        Self {
            kind,
            asset,
            looping: true,
            muted: true,
            split: SplitLayout::default(),
            alpha: AlphaSource::default(),
            fps: None,
        }
    }

    pub fn video(asset: AssetRef) -> Self {
        Self::with_kind(MediaKind::Video, asset)
    }

    pub fn animation(asset: AssetRef) -> Self {
        Self::with_kind(MediaKind::Animation, asset)
    }

    pub fn image(asset: AssetRef) -> Self {
        Self::with_kind(MediaKind::Image, asset)
    }

    pub fn with_split(mut self, split: SplitLayout) -> Self {
        self.split = split;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn validate(&self) -> MarkerlayResult<()> {
        if self.asset.name.trim().is_empty() {
            return Err(MarkerlayError::validation("binding asset name must be non-empty"));
        }
        if self.fps == Some(0) {
            return Err(MarkerlayError::validation("binding fps must be > 0"));
        }
        if self.kind != MediaKind::Video
            && (!is_default_split(&self.split) || !is_default_alpha(&self.alpha))
        {
            return Err(MarkerlayError::validation(format!(
                "'{}' carries native alpha; split/alpha apply to video bindings only",
                self.asset
            )));
        }
        Ok(())
    }
}

/// Declarative marker → content mapping, keyed by exact marker name.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct BindingTable(pub BTreeMap<MarkerId, ContentBinding>);

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marker: impl Into<MarkerId>, binding: ContentBinding) {
        self.0.insert(marker.into(), binding);
    }

    pub fn with(mut self, marker: impl Into<MarkerId>, binding: ContentBinding) -> Self {
        self.insert(marker, binding);
        self
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, marker: &MarkerId) -> Option<&ContentBinding> {
        self.0.get(marker)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MarkerId, &ContentBinding)> {
        self.0.iter()
    }

    pub fn validate(&self) -> MarkerlayResult<()> {
        for (marker, binding) in &self.0 {
            binding
                .validate()
                .map_err(|e| MarkerlayError::validation(format!("binding '{marker}': {e}")))?;
        }
        Ok(())
    }

    /// Bindings of the demo experience.
    pub fn demo() -> Self {
        Self::new()
            .with(
                "AficheMuseoMar",
                ContentBinding::video(AssetRef::new("MuseoMarAnimacionAlpha", "mov"))
                    .with_split(SplitLayout::Horizontal),
            )
            .with("Afiche", ContentBinding::video(AssetRef::new("Fire", "mp4")))
            .with(
                "HandEye",
                ContentBinding::animation(AssetRef::bare("love_explosion")),
            )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/binding.rs"]
mod tests;
