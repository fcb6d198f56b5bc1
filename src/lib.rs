//! Markerlay anchors media overlays to tracked reference images.
//!
//! A session pairs an image-tracking source with a scene of marker anchors:
//!
//! - Configure an [`ExperienceConfig`] (reference image group, tracking, content bindings)
//! - Create an [`ArSession`] over an asset directory and a [`TrackingSource`]
//! - Drive it with [`ArSession::advance`] and collect overlay surfaces as RGBA frames
//!
//! Overlay videos are opaque dual-band frames (color band + alpha band); the
//! [`AlphaVideoCompositor`] turns them into straight-alpha RGBA surfaces.
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod assets;
pub(crate) mod composite;
pub(crate) mod output;
pub(crate) mod overlay;
pub(crate) mod scene;
pub(crate) mod session;

pub use crate::foundation::core::{
    Affine, Fps, FrameIndex, Isometry3, MarkerDescriptor, MarkerId, PhysicalSize, Pose,
    UnitQuaternion,
};
pub use crate::foundation::error::{MarkerlayError, MarkerlayResult};

pub use crate::animation::ease::Ease;
pub use crate::animation::highlight::{
    HIGHLIGHT_BASE_OPACITY, HighlightAction, HighlightDone, HighlightProgress, HighlightStep,
};
pub use crate::animation::player::AnimationPlayer;
pub use crate::assets::catalog::{ReferenceCatalog, ReferenceImage};
pub use crate::assets::media::{FrameSource, FrameSourceInfo, InMemorySource};
pub use crate::assets::store::{AssetRef, AssetStore};
pub use crate::composite::compositor::{
    AlphaVideoCompositor, PlaybackNotice, PlaybackSpec, PlaybackState, PlaybackStats,
};
pub use crate::composite::dual_band::{
    AlphaSource, BandMapping, DualBandFrame, SplitLayout, composite_frame, composite_into,
};
pub use crate::output::sink::{InMemorySink, PngSequenceSink, SurfaceFrame, SurfaceSink};
pub use crate::overlay::binding::{BindingTable, ContentBinding, MediaKind};
pub use crate::overlay::strategy::{OverlayContent, OverlayStrategy};
pub use crate::scene::graph::{
    AnchorSnapshot, DetectionOutcome, HighlightSnapshot, OverlaySnapshot, SceneContext,
    SceneGraph, SceneSnapshot,
};
pub use crate::scene::plane::{PlaneGeometry, PlaneNode, build_plane};
pub use crate::scene::queue::{SceneCommand, SceneHandle, SceneQueue, SceneQueueStats};
pub use crate::session::ar_session::{ArSession, SessionDelegate, SessionSummary};
pub use crate::session::config::ExperienceConfig;
pub use crate::session::notify::{NotificationCenter, NotificationPoster};
pub use crate::session::status::{
    MessageCategory, StatusBoard, StatusReport, StatusSurface, UiDispatcher, UiHandle,
};
pub use crate::session::tracking::{
    DetectionMode, ReplayTracking, Sighting, SightingKind, TrackingConfig, TrackingDelegate,
    TrackingScript, TrackingSource,
};
