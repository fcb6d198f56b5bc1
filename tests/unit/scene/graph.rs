use std::path::PathBuf;

use super::*;
use crate::foundation::core::UnitQuaternion;
use crate::overlay::binding::ContentBinding;
use image::{Rgba, RgbaImage};

fn fixture(name: &str, video_frames: u8) -> SceneContext {
    let root = PathBuf::from("target").join("markerlay-unit").join(name);
    let _ = std::fs::remove_dir_all(&root);
    let dir = root.join("Fire.mp4");
    std::fs::create_dir_all(&dir).unwrap();
    for i in 0..video_frames {
        RgbaImage::from_fn(2, 4, |_, y| {
            if y < 2 {
                Rgba([i * 10, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
        .save(dir.join(format!("{i:04}.png")))
        .unwrap();
    }

    let bindings = BindingTable::new().with(
        "Afiche",
        ContentBinding::video(AssetRef::new("Fire", "mp4")).with_fps(4),
    );
    SceneContext::new(Arc::new(AssetStore::new(root)), Arc::new(bindings))
}

fn afiche() -> MarkerDescriptor {
    MarkerDescriptor::new("Afiche", PhysicalSize::new(0.2, 0.3).unwrap())
}

fn settle_highlight(scene: &mut SceneGraph, ctx: &SceneContext) {
    for _ in 0..3 {
        scene.advance(ctx, 0.5);
    }
}

#[test]
fn overlay_waits_for_highlight_completion() {
    let ctx = fixture("graph_waits", 3);
    let mut scene = SceneGraph::new();
    let outcome = scene.image_detected(&ctx, afiche(), Pose::identity());
    assert_eq!(outcome, DetectionOutcome::Added { content_bound: true });

    let snap = scene.snapshot();
    let a = snap.anchor("Afiche").unwrap();
    assert!(a.content_pending);
    assert!(a.overlay.is_none());
    assert_eq!(a.highlight.as_ref().unwrap().opacity, 0.25);

    scene.advance(&ctx, 1.0);
    assert!(!scene.anchor(&MarkerId::new("Afiche")).unwrap().has_overlay());
    assert!(scene.drain_surfaces().is_empty());

    scene.advance(&ctx, 0.5);
    let snap = scene.snapshot();
    let a = snap.anchor("Afiche").unwrap();
    assert!(a.highlight.is_none());
    assert!(!a.content_pending);
    let overlay = a.overlay.as_ref().unwrap();
    assert_eq!(overlay.kind, MediaKind::Video);
    assert_eq!((overlay.plane.width, overlay.plane.height), (0.2, 0.3));
    assert_eq!(overlay.surface_size, (2, 2));
    assert_eq!(overlay.attached_at_sec, 1.5);

    let surfaces = scene.drain_surfaces();
    assert_eq!(surfaces.len(), 1);
    assert_eq!(surfaces[0].index, FrameIndex(0));
    assert_eq!(surfaces[0].image.get_pixel(0, 0).0, [0, 0, 0, 255]);
    assert!(scene.drain_surfaces().is_empty());
}

#[test]
fn unknown_marker_gets_highlight_but_no_overlay() {
    let ctx = fixture("graph_unknown", 2);
    let mut scene = SceneGraph::new();
    let homero = MarkerDescriptor::new("HomeroMaddona", PhysicalSize::new(0.1, 0.1).unwrap());
    assert_eq!(
        scene.image_detected(&ctx, homero, Pose::identity()),
        DetectionOutcome::Added {
            content_bound: false
        }
    );
    assert!(scene.anchor(&MarkerId::new("HomeroMaddona")).unwrap().has_highlight());
    assert_eq!(scene.node_count(), 2);

    scene.advance(&ctx, 0.5);
    let opacity = scene.snapshot().anchors[0].highlight.as_ref().unwrap().opacity;
    assert!((opacity - 0.85).abs() < 1e-9);

    settle_highlight(&mut scene, &ctx);
    let snap = scene.snapshot();
    assert_eq!(snap.overlay_count(), 0);
    assert!(snap.anchors[0].highlight.is_none());
    assert_eq!(snap.node_count, 1);
}

#[test]
fn re_detection_refreshes_pose_without_duplicates() {
    let ctx = fixture("graph_redetect", 3);
    let mut scene = SceneGraph::new();
    scene.image_detected(&ctx, afiche(), Pose::identity());
    settle_highlight(&mut scene, &ctx);
    assert_eq!(scene.node_count(), 2);

    let moved = Pose::new([1.0, 0.0, -2.0], UnitQuaternion::identity());
    assert_eq!(
        scene.image_detected(&ctx, afiche(), moved),
        DetectionOutcome::Refreshed
    );
    settle_highlight(&mut scene, &ctx);

    let snap = scene.snapshot();
    assert_eq!(snap.anchors.len(), 1);
    assert_eq!(snap.node_count, 2);
    let a = snap.anchor("Afiche").unwrap();
    assert!(a.highlight.is_none());
    assert_eq!(a.pose, moved);
    assert_eq!(a.overlay.as_ref().unwrap().world_pose.position(), [1.0, 0.0, -2.0]);
}

#[test]
fn pose_updates_move_existing_anchors_only() {
    let ctx = fixture("graph_pose", 2);
    let mut scene = SceneGraph::new();
    scene.image_detected(&ctx, afiche(), Pose::identity());
    let p = Pose::new([0.0, 0.5, 0.0], UnitQuaternion::identity());
    assert!(scene.pose_updated(&MarkerId::new("Afiche"), p));
    assert!(!scene.pose_updated(&MarkerId::new("HandEye"), p));
    assert_eq!(scene.anchor(&MarkerId::new("Afiche")).unwrap().pose(), p);
    assert_eq!(scene.len(), 1);
}

#[test]
fn missing_asset_leaves_overlay_absent() {
    let ctx = fixture("graph_missing", 0);
    let _ = std::fs::remove_dir_all(ctx.assets.root().join("Fire.mp4"));
    let mut scene = SceneGraph::new();
    scene.image_detected(&ctx, afiche(), Pose::identity());
    settle_highlight(&mut scene, &ctx);

    let snap = scene.snapshot();
    assert_eq!(snap.overlay_count(), 0);
    assert!(!snap.anchors[0].content_pending);
    assert_eq!(snap.node_count, 1);
}

#[test]
fn loop_restart_is_applied_to_the_marker_video() {
    let ctx = fixture("graph_loop", 2);
    let mut scene = SceneGraph::new();
    scene.image_detected(&ctx, afiche(), Pose::identity());
    settle_highlight(&mut scene, &ctx);
    scene.drain_surfaces();

    scene.advance(&ctx, 0.25);
    scene.advance(&ctx, 0.25);
    assert_eq!(scene.drain_surfaces().len(), 1);

    scene.loop_playback(&MarkerId::new("Afiche"));
    scene.loop_playback(&MarkerId::new("Afiche"));
    scene.loop_playback(&MarkerId::new("HandEye"));

    let surfaces = scene.drain_surfaces();
    assert_eq!(surfaces.len(), 1);
    assert_eq!(surfaces[0].index, FrameIndex(2));
    assert_eq!(surfaces[0].image.get_pixel(0, 0).0, [0, 0, 0, 255]);

    let stats = scene.snapshot().anchors[0]
        .overlay
        .as_ref()
        .unwrap()
        .playback
        .unwrap();
    assert_eq!(stats.seeks, 1);
    assert_eq!(stats.resumes, 1);
}

#[test]
fn remove_all_clears_every_anchor() {
    let ctx = fixture("graph_remove", 2);
    let mut scene = SceneGraph::new();
    scene.image_detected(&ctx, afiche(), Pose::identity());
    scene.image_detected(
        &ctx,
        MarkerDescriptor::new("HandEye", PhysicalSize::new(0.1, 0.1).unwrap()),
        Pose::identity(),
    );
    assert_eq!(scene.len(), 2);
    assert_eq!(scene.remove_all(), 2);
    assert!(scene.is_empty());
    assert!(scene.snapshot().anchors.is_empty());
}
