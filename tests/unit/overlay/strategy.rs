use std::path::PathBuf;

use super::*;
use crate::composite::dual_band::SplitLayout;
use image::Rgba;

fn fresh_store(name: &str) -> (PathBuf, AssetStore) {
    let root = PathBuf::from("target").join("markerlay-unit").join(name);
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();
    let store = AssetStore::new(&root);
    (root, store)
}

#[test]
fn selector_dispatches_by_content_kind() {
    let table = BindingTable::demo();

    match table.strategy_for(&MarkerId::new("Afiche")).unwrap() {
        OverlayStrategy::LoopingAlphaVideo { asset, playback } => {
            assert_eq!(asset.file_name(), "Fire.mp4");
            assert!(playback.looping);
            assert!(playback.muted);
            assert_eq!(playback.layout, SplitLayout::Vertical);
        }
        other => panic!("unexpected strategy {other:?}"),
    }

    let hand = table.strategy_for(&MarkerId::new("HandEye")).unwrap();
    assert_eq!(hand.kind(), MediaKind::Animation);
    assert_eq!(hand.asset().file_name(), "love_explosion");

    let museo = table.strategy_for(&MarkerId::new("AficheMuseoMar")).unwrap();
    assert!(matches!(
        museo,
        OverlayStrategy::LoopingAlphaVideo { playback, .. } if playback.layout == SplitLayout::Horizontal
    ));

    assert!(table.strategy_for(&MarkerId::new("HomeroMaddona")).is_none());
}

#[test]
fn invalid_binding_yields_no_strategy() {
    let table = BindingTable::new().with(
        "Afiche",
        ContentBinding::video(AssetRef::new("Fire", "mp4")).with_fps(0),
    );
    assert!(table.strategy_for(&MarkerId::new("Afiche")).is_none());
}

#[test]
fn animation_fps_defaults_and_overrides() {
    let default = OverlayStrategy::from_binding(&ContentBinding::animation(AssetRef::bare("heart")))
        .unwrap();
    assert!(matches!(default, OverlayStrategy::EmbeddedAnimation { fps, .. } if fps == DEFAULT_ANIMATION_FPS));

    let custom = OverlayStrategy::from_binding(
        &ContentBinding::animation(AssetRef::bare("heart")).with_fps(12),
    )
    .unwrap();
    assert!(matches!(custom, OverlayStrategy::EmbeddedAnimation { fps, .. } if fps.num == 12));
}

#[test]
fn static_plane_instantiates_with_native_alpha() {
    let (root, store) = fresh_store("strategy_static");
    RgbaImage::from_pixel(4, 2, Rgba([9, 8, 7, 60]))
        .save(root.join("Plane.png"))
        .unwrap();

    let strategy = OverlayStrategy::StaticPlane {
        image: AssetRef::new("Plane", "png"),
    };
    let mut content = strategy
        .instantiate(&store, &MarkerId::new("Afiche"), None)
        .unwrap();
    assert_eq!(content.kind(), MediaKind::Image);
    assert_eq!(content.surface().get_pixel(0, 0).0, [9, 8, 7, 60]);
    assert!(!content.advance(1.0).unwrap());
    assert!(!content.restart_loop().unwrap());
    assert!(content.playback_stats().is_none());
}

#[test]
fn animation_instantiates_from_frame_directory() {
    let (root, store) = fresh_store("strategy_animation");
    let dir = root.join("love_explosion");
    std::fs::create_dir_all(&dir).unwrap();
    for i in 0..3u8 {
        RgbaImage::from_pixel(2, 2, Rgba([i, 0, 0, 100]))
            .save(dir.join(format!("{i:04}.png")))
            .unwrap();
    }

    let strategy = BindingTable::demo()
        .strategy_for(&MarkerId::new("HandEye"))
        .unwrap();
    let mut content = strategy
        .instantiate(&store, &MarkerId::new("HandEye"), None)
        .unwrap();
    assert_eq!(content.kind(), MediaKind::Animation);
    assert!(content.advance(1.0 / 24.0 + 1e-9).unwrap());
    assert_eq!(content.surface().get_pixel(0, 0).0, [1, 0, 0, 100]);
}

#[test]
fn missing_assets_leave_no_content() {
    let (_root, store) = fresh_store("strategy_missing");
    let marker = MarkerId::new("Afiche");
    for strategy in [
        OverlayStrategy::StaticPlane {
            image: AssetRef::new("Plane", "png"),
        },
        BindingTable::demo().strategy_for(&marker).unwrap(),
        BindingTable::demo()
            .strategy_for(&MarkerId::new("HandEye"))
            .unwrap(),
    ] {
        assert!(strategy.instantiate(&store, &marker, None).is_none());
    }
}
