use image::RgbaImage;

use crate::animation::player::{AnimationPlayer, DEFAULT_ANIMATION_FPS};
use crate::assets::store::{AssetRef, AssetStore};
use crate::composite::compositor::{AlphaVideoCompositor, PlaybackSpec, PlaybackStats};
use crate::foundation::core::{Fps, MarkerId};
use crate::foundation::error::MarkerlayResult;
use crate::overlay::binding::{BindingTable, ContentBinding, MediaKind};
use crate::session::notify::NotificationPoster;

/// How a marker's content is produced, chosen once from its binding.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayStrategy {
    StaticPlane {
        image: AssetRef,
    },
    LoopingAlphaVideo {
        asset: AssetRef,
        playback: PlaybackSpec,
    },
    EmbeddedAnimation {
        asset: AssetRef,
        looping: bool,
        fps: Fps,
    },
}

impl OverlayStrategy {
    pub fn from_binding(binding: &ContentBinding) -> MarkerlayResult<Self> {
        binding.validate()?;
        let fps = binding.fps.map(|n| Fps::new(n, 1)).transpose()?;
        Ok(match binding.kind {
            MediaKind::Image => Self::StaticPlane {
                image: binding.asset.clone(),
            },
            MediaKind::Video => Self::LoopingAlphaVideo {
                asset: binding.asset.clone(),
                playback: PlaybackSpec {
                    looping: binding.looping,
                    muted: binding.muted,
                    layout: binding.split,
                    alpha: binding.alpha,
                    fps,
                },
            },
            MediaKind::Animation => Self::EmbeddedAnimation {
                asset: binding.asset.clone(),
                looping: binding.looping,
                fps: fps.unwrap_or(DEFAULT_ANIMATION_FPS),
            },
        })
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::StaticPlane { .. } => MediaKind::Image,
            Self::LoopingAlphaVideo { .. } => MediaKind::Video,
            Self::EmbeddedAnimation { .. } => MediaKind::Animation,
        }
    }

    pub fn asset(&self) -> &AssetRef {
        match self {
            Self::StaticPlane { image } => image,
            Self::LoopingAlphaVideo { asset, .. } | Self::EmbeddedAnimation { asset, .. } => asset,
        }
    }

    /// Open the content. `None` means the asset is missing or unusable; the reason is logged.
    pub fn instantiate(
        &self,
        assets: &AssetStore,
        marker: &MarkerId,
        notifier: Option<&NotificationPoster>,
    ) -> Option<OverlayContent> {
        match self {
            Self::StaticPlane { image } => assets.open_image(image).map(OverlayContent::Still),
            Self::LoopingAlphaVideo { asset, playback } => AlphaVideoCompositor::open(
                assets,
                marker.clone(),
                asset,
                *playback,
                notifier.cloned(),
            )
            .map(|c| OverlayContent::Video(Box::new(c))),
            Self::EmbeddedAnimation {
                asset,
                looping,
                fps,
            } => {
                let frames = assets.open_animation(asset)?;
                match AnimationPlayer::new(frames, *fps, *looping) {
                    Ok(player) => Some(OverlayContent::Animation(player)),
                    Err(e) => {
                        tracing::warn!(asset = %asset, error = %e, "animation overlay unavailable");
                        None
                    }
                }
            }
        }
    }
}

impl BindingTable {
    /// Strategy for `marker`, or `None` when it has no usable binding.
    pub fn strategy_for(&self, marker: &MarkerId) -> Option<OverlayStrategy> {
        let binding = self.get(marker)?;
        match OverlayStrategy::from_binding(binding) {
            Ok(strategy) => Some(strategy),
            Err(e) => {
                tracing::warn!(marker = %marker, error = %e, "ignoring invalid content binding");
                None
            }
        }
    }
}

/// Live overlay content attached to a marker plane.
#[derive(Debug)]
pub enum OverlayContent {
    Still(RgbaImage),
    Video(Box<AlphaVideoCompositor>),
    Animation(AnimationPlayer),
}

impl OverlayContent {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Still(_) => MediaKind::Image,
            Self::Video(_) => MediaKind::Video,
            Self::Animation(_) => MediaKind::Animation,
        }
    }

    /// Advance playback. Returns whether the surface changed.
    pub fn advance(&mut self, dt: f64) -> MarkerlayResult<bool> {
        match self {
            Self::Still(_) => Ok(false),
            Self::Video(video) => video.advance(dt),
            Self::Animation(player) => Ok(player.advance(dt)),
        }
    }

    /// Apply a loop restart. Only video content loops by seeking.
    pub fn restart_loop(&mut self) -> MarkerlayResult<bool> {
        match self {
            Self::Video(video) => video.restart(),
            Self::Still(_) | Self::Animation(_) => Ok(false),
        }
    }

    pub fn surface(&self) -> &RgbaImage {
        match self {
            Self::Still(img) => img,
            Self::Video(video) => video.surface(),
            Self::Animation(player) => player.surface(),
        }
    }

    pub fn playback_stats(&self) -> Option<PlaybackStats> {
        match self {
            Self::Video(video) => Some(video.stats()),
            Self::Still(_) | Self::Animation(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/strategy.rs"]
mod tests;
