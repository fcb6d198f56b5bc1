use std::collections::BTreeMap;
use std::sync::Arc;

use crate::animation::highlight::{
    HIGHLIGHT_BASE_OPACITY, HighlightAction, HighlightDone, HighlightProgress,
};
use crate::assets::store::{AssetRef, AssetStore};
use crate::composite::compositor::PlaybackStats;
use crate::foundation::core::{FrameIndex, MarkerDescriptor, MarkerId, PhysicalSize, Pose};
use crate::output::sink::SurfaceFrame;
use crate::overlay::binding::{BindingTable, MediaKind};
use crate::overlay::strategy::{OverlayContent, OverlayStrategy};
use crate::scene::plane::{PlaneGeometry, PlaneNode, build_plane};
use crate::session::notify::NotificationPoster;

/// Read-only collaborators of the scene, shared with the worker thread.
#[derive(Clone, Debug)]
pub struct SceneContext {
    pub assets: Arc<AssetStore>,
    pub bindings: Arc<BindingTable>,
    pub notifier: Option<NotificationPoster>,
    pub highlight_opacity: f64,
}

impl SceneContext {
    pub fn new(assets: Arc<AssetStore>, bindings: Arc<BindingTable>) -> Self {
        Self {
            assets,
            bindings,
            notifier: None,
            highlight_opacity: HIGHLIGHT_BASE_OPACITY,
        }
    }

    pub fn with_notifier(mut self, notifier: NotificationPoster) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

#[derive(Debug)]
struct HighlightNode {
    plane: PlaneNode,
    action: HighlightAction,
}

#[derive(Debug)]
struct OverlayNode {
    plane: PlaneNode,
    asset: AssetRef,
    content: OverlayContent,
    attached_at_sec: f64,
    next_index: u64,
    dirty: bool,
}

/// Scene state of one detected marker.
///
/// Holds at most one highlight plane and at most one overlay plane, however often the marker is
/// re-detected.
#[derive(Debug)]
pub struct MarkerAnchor {
    descriptor: MarkerDescriptor,
    pose: Pose,
    detected_at_sec: f64,
    highlight: Option<HighlightNode>,
    overlay: Option<OverlayNode>,
    /// Content waiting for the highlight to finish.
    pending: Option<OverlayStrategy>,
}

impl MarkerAnchor {
    fn new(
        descriptor: MarkerDescriptor,
        pose: Pose,
        now_sec: f64,
        highlight_opacity: f64,
        pending: Option<OverlayStrategy>,
    ) -> Self {
        let action = HighlightAction::standard(highlight_opacity);
        let plane = build_plane(&descriptor).with_opacity(action.opacity());
        Self {
            descriptor,
            pose,
            detected_at_sec: now_sec,
            highlight: Some(HighlightNode { plane, action }),
            overlay: None,
            pending,
        }
    }

    pub fn descriptor(&self) -> &MarkerDescriptor {
        &self.descriptor
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn has_highlight(&self) -> bool {
        self.highlight.is_some()
    }

    /// Anchor node plus its child planes.
    pub fn node_count(&self) -> usize {
        1 + usize::from(self.highlight.is_some()) + usize::from(self.overlay.is_some())
    }

    /// Open the pending content. Requires the finished highlight's token.
    fn attach_pending(&mut self, ctx: &SceneContext, done: HighlightDone, now_sec: f64) {
        let Some(strategy) = self.pending.take() else {
            return;
        };
        let marker = &self.descriptor.id;
        match strategy.instantiate(&ctx.assets, marker, ctx.notifier.as_ref()) {
            Some(content) => {
                tracing::info!(
                    marker = %marker,
                    asset = %strategy.asset(),
                    kind = ?content.kind(),
                    after_highlight_sec = done.finished_at_sec(),
                    "overlay attached"
                );
                self.overlay = Some(OverlayNode {
                    plane: build_plane(&self.descriptor),
                    asset: strategy.asset().clone(),
                    content,
                    attached_at_sec: now_sec,
                    next_index: 0,
                    dirty: true,
                });
            }
            None => {
                tracing::warn!(marker = %marker, asset = %strategy.asset(), "overlay absent");
            }
        }
    }

    fn advance(&mut self, ctx: &SceneContext, dt: f64, now_sec: f64) {
        if let Some(overlay) = self.overlay.as_mut() {
            match overlay.content.advance(dt) {
                Ok(changed) => overlay.dirty |= changed,
                Err(e) => {
                    tracing::warn!(marker = %self.descriptor.id, error = %e, "dropping overlay");
                    self.overlay = None;
                }
            }
        }

        let Some(node) = self.highlight.as_mut() else {
            return;
        };
        match node.action.advance(dt) {
            HighlightProgress::Running { opacity } => node.plane.opacity = opacity,
            HighlightProgress::Completed(done) => {
                node.plane.opacity = node.action.opacity();
                if node.action.removes_node() {
                    self.highlight = None;
                }
                self.attach_pending(ctx, done, now_sec);
            }
            HighlightProgress::Finished => {}
        }
    }

    fn restart_loop(&mut self) {
        let Some(overlay) = self.overlay.as_mut() else {
            tracing::debug!(
                marker = %self.descriptor.id,
                "loop restart for marker without overlay"
            );
            return;
        };
        match overlay.content.restart_loop() {
            Ok(changed) => overlay.dirty |= changed,
            Err(e) => {
                tracing::warn!(marker = %self.descriptor.id, error = %e, "dropping overlay");
                self.overlay = None;
            }
        }
    }
}

/// What a detection did to the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// First sighting: anchor and highlight created.
    Added { content_bound: bool },
    /// Marker already in the scene: pose refreshed in place.
    Refreshed,
}

/// All marker anchors of a session. Mutated only by the scene-update worker.
#[derive(Debug, Default)]
pub struct SceneGraph {
    anchors: BTreeMap<MarkerId, MarkerAnchor>,
    clock_sec: f64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock_sec(&self) -> f64 {
        self.clock_sec
    }

    pub fn anchor(&self, marker: &MarkerId) -> Option<&MarkerAnchor> {
        self.anchors.get(marker)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.anchors.values().map(MarkerAnchor::node_count).sum()
    }

    pub fn image_detected(
        &mut self,
        ctx: &SceneContext,
        descriptor: MarkerDescriptor,
        pose: Pose,
    ) -> DetectionOutcome {
        if let Some(anchor) = self.anchors.get_mut(&descriptor.id) {
            tracing::debug!(marker = %descriptor.id, "re-detected marker; refreshing pose");
            anchor.pose = pose;
            return DetectionOutcome::Refreshed;
        }

        let pending = ctx.bindings.strategy_for(&descriptor.id);
        let content_bound = pending.is_some();
        if !content_bound {
            tracing::debug!(marker = %descriptor.id, "no content bound; highlight only");
        }
        let anchor = MarkerAnchor::new(
            descriptor.clone(),
            pose,
            self.clock_sec,
            ctx.highlight_opacity,
            pending,
        );
        self.anchors.insert(descriptor.id, anchor);
        DetectionOutcome::Added { content_bound }
    }

    /// Returns false for markers not in the scene.
    pub fn pose_updated(&mut self, marker: &MarkerId, pose: Pose) -> bool {
        match self.anchors.get_mut(marker) {
            Some(anchor) => {
                anchor.pose = pose;
                true
            }
            None => {
                tracing::debug!(marker = %marker, "pose update for unknown marker");
                false
            }
        }
    }

    pub fn advance(&mut self, ctx: &SceneContext, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.clock_sec += dt;
        let now = self.clock_sec;
        for anchor in self.anchors.values_mut() {
            anchor.advance(ctx, dt, now);
        }
    }

    pub fn loop_playback(&mut self, marker: &MarkerId) {
        match self.anchors.get_mut(marker) {
            Some(anchor) => anchor.restart_loop(),
            None => tracing::debug!(marker = %marker, "loop restart for removed marker"),
        }
    }

    pub fn remove_all(&mut self) -> usize {
        let n = self.anchors.len();
        self.anchors.clear();
        n
    }

    /// Take every overlay surface that changed since the last drain.
    pub fn drain_surfaces(&mut self) -> Vec<SurfaceFrame> {
        let now = self.clock_sec;
        let mut out = Vec::new();
        for (marker, anchor) in &mut self.anchors {
            let Some(overlay) = anchor.overlay.as_mut() else {
                continue;
            };
            if !overlay.dirty {
                continue;
            }
            overlay.dirty = false;
            out.push(SurfaceFrame {
                marker: marker.clone(),
                index: FrameIndex(overlay.next_index),
                time_sec: now,
                image: overlay.content.surface().clone(),
            });
            overlay.next_index += 1;
        }
        out
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            clock_sec: self.clock_sec,
            node_count: self.node_count(),
            anchors: self
                .anchors
                .values()
                .map(|a| AnchorSnapshot {
                    marker: a.descriptor.id.clone(),
                    physical_size: a.descriptor.physical_size,
                    pose: a.pose,
                    detected_at_sec: a.detected_at_sec,
                    highlight: a.highlight.as_ref().map(|h| HighlightSnapshot {
                        opacity: h.plane.opacity,
                        elapsed_sec: h.action.elapsed(),
                        plane: h.plane.geometry,
                    }),
                    overlay: a.overlay.as_ref().map(|o| OverlaySnapshot {
                        kind: o.content.kind(),
                        asset: o.asset.clone(),
                        plane: o.plane.geometry,
                        world_pose: o.plane.world_pose(&a.pose),
                        surface_size: o.content.surface().dimensions(),
                        attached_at_sec: o.attached_at_sec,
                        surfaces_emitted: o.next_index,
                        playback: o.content.playback_stats(),
                    }),
                    content_pending: a.pending.is_some(),
                })
                .collect(),
        }
    }
}

/// Serializable view of the scene.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SceneSnapshot {
    pub clock_sec: f64,
    pub node_count: usize,
    pub anchors: Vec<AnchorSnapshot>,
}

impl SceneSnapshot {
    pub fn anchor(&self, marker: &str) -> Option<&AnchorSnapshot> {
        self.anchors.iter().find(|a| a.marker.as_str() == marker)
    }

    pub fn overlay_count(&self) -> usize {
        self.anchors.iter().filter(|a| a.overlay.is_some()).count()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AnchorSnapshot {
    pub marker: MarkerId,
    pub physical_size: PhysicalSize,
    pub pose: Pose,
    pub detected_at_sec: f64,
    pub highlight: Option<HighlightSnapshot>,
    pub overlay: Option<OverlaySnapshot>,
    pub content_pending: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct HighlightSnapshot {
    pub opacity: f64,
    pub elapsed_sec: f64,
    pub plane: PlaneGeometry,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OverlaySnapshot {
    pub kind: MediaKind,
    pub asset: AssetRef,
    pub plane: PlaneGeometry,
    pub world_pose: Pose,
    pub surface_size: (u32, u32),
    pub attached_at_sec: f64,
    pub surfaces_emitted: u64,
    pub playback: Option<PlaybackStats>,
}

#[cfg(test)]
#[path = "../../tests/unit/scene/graph.rs"]
mod tests;
