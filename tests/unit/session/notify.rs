use std::path::PathBuf;
use std::sync::Arc;

use super::*;
use crate::assets::store::{AssetRef, AssetStore};
use crate::foundation::core::{MarkerDescriptor, MarkerId, PhysicalSize, Pose};
use crate::overlay::binding::{BindingTable, ContentBinding};
use crate::scene::graph::SceneContext;
use crate::scene::queue::SceneQueue;
use image::{Rgba, RgbaImage};

fn video_store(name: &str) -> Arc<AssetStore> {
    let root = PathBuf::from("target").join("markerlay-unit").join(name);
    let _ = std::fs::remove_dir_all(&root);
    let dir = root.join("Fire.mp4");
    std::fs::create_dir_all(&dir).unwrap();
    for i in 0..2u8 {
        RgbaImage::from_pixel(2, 4, Rgba([i, i, i, 255]))
            .save(dir.join(format!("{i:04}.png")))
            .unwrap();
    }
    Arc::new(AssetStore::new(root))
}

#[test]
fn end_of_stream_is_relayed_back_as_one_loop_restart() {
    let bindings = BindingTable::new().with(
        "Afiche",
        ContentBinding::video(AssetRef::new("Fire", "mp4")).with_fps(4),
    );
    let (poster, rx) = NotificationCenter::channel();
    let ctx = SceneContext::new(video_store("notify_relay"), Arc::new(bindings))
        .with_notifier(poster.clone());
    let scene = SceneQueue::spawn(ctx).unwrap();
    let center = NotificationCenter::spawn(poster, rx, scene.handle()).unwrap();

    scene
        .submit(SceneCommand::ImageDetected {
            descriptor: MarkerDescriptor::new("Afiche", PhysicalSize::new(0.2, 0.3).unwrap()),
            pose: Pose::identity(),
        })
        .unwrap();
    // Highlight (1.5 s), then two frames at 4 fps run out.
    scene.submit(SceneCommand::Advance { dt: 1.5 }).unwrap();
    scene.submit(SceneCommand::Advance { dt: 0.25 }).unwrap();
    scene.submit(SceneCommand::Advance { dt: 0.25 }).unwrap();
    scene.barrier().unwrap();
    center.flush().unwrap();

    let snap = scene.snapshot().unwrap();
    let playback = snap.anchors[0].overlay.as_ref().unwrap().playback.unwrap();
    assert_eq!(playback.seeks, 1);
    assert_eq!(playback.resumes, 1);
    assert!((playback.max_frame_gap_sec - 0.25).abs() < 1e-9);

    assert_eq!(center.shutdown().unwrap(), 1);
}

#[test]
fn notices_for_removed_markers_are_harmless() {
    let (poster, rx) = NotificationCenter::channel();
    let ctx = SceneContext::new(video_store("notify_removed"), Arc::new(BindingTable::new()));
    let scene = SceneQueue::spawn(ctx).unwrap();
    let center = NotificationCenter::spawn(poster, rx, scene.handle()).unwrap();

    center.poster().post(PlaybackNotice::DidPlayToEnd {
        marker: MarkerId::new("Afiche"),
    });
    center.flush().unwrap();
    assert!(scene.snapshot().unwrap().anchors.is_empty());
}

#[test]
fn posting_after_shutdown_is_silent() {
    let (poster, rx) = NotificationCenter::channel();
    drop(rx);
    poster.post(PlaybackNotice::DidPlayToEnd {
        marker: MarkerId::new("Afiche"),
    });
}
