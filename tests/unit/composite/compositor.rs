use std::path::PathBuf;

use super::*;
use crate::assets::media::InMemorySource;
use crate::session::notify::{NotificationCenter, NotificationMessage};
use image::Rgba;

const FRAME: f64 = 0.25;

/// 2x4 vertical dual-band frame: color red channel `i * 10`, alpha 200.
fn band_frame(i: u8) -> RgbaImage {
    RgbaImage::from_fn(2, 4, |_, y| {
        if y < 2 {
            Rgba([i * 10, 0, 0, 255])
        } else {
            Rgba([200, 200, 200, 255])
        }
    })
}

fn source(n: u8) -> Box<dyn FrameSource> {
    let frames = (0..n).map(band_frame).collect();
    Box::new(InMemorySource::new(frames, Fps::new(4, 1).unwrap()).unwrap())
}

fn red_at_origin(c: &AlphaVideoCompositor) -> [u8; 4] {
    c.surface().get_pixel(0, 0).0
}

#[test]
fn first_frame_is_presented_on_open() {
    let c = AlphaVideoCompositor::new("Afiche".into(), source(3), PlaybackSpec::default(), None)
        .unwrap();
    assert_eq!(c.output_size(), (2, 2));
    assert_eq!(red_at_origin(&c), [0, 0, 0, 200]);
    assert_eq!(c.state(), PlaybackState::Playing);
    assert_eq!(c.stats().frames_presented, 1);
    assert_eq!(c.volume(), 0.0);
}

#[test]
fn advance_composites_only_the_latest_due_frame() {
    let mut c =
        AlphaVideoCompositor::new("Afiche".into(), source(4), PlaybackSpec::default(), None)
            .unwrap();
    assert!(!c.advance(FRAME / 2.0).unwrap());
    assert!(c.advance(FRAME * 2.0).unwrap());

    assert_eq!(red_at_origin(&c), [20, 0, 0, 200]);
    let stats = c.stats();
    assert_eq!(stats.frames_decoded, 3);
    assert_eq!(stats.frames_presented, 2);
    assert!(!c.advance(0.0).unwrap());
}

#[test]
fn end_of_stream_holds_last_frame_and_posts_one_notice() {
    let (poster, rx) = NotificationCenter::channel();
    let mut c = AlphaVideoCompositor::new(
        "Afiche".into(),
        source(2),
        PlaybackSpec::default(),
        Some(poster),
    )
    .unwrap();

    c.advance(FRAME).unwrap();
    assert_eq!(red_at_origin(&c), [10, 0, 0, 200]);
    assert!(!c.advance(FRAME).unwrap());
    assert_eq!(c.state(), PlaybackState::AwaitingRestart);
    assert_eq!(red_at_origin(&c), [10, 0, 0, 200]);

    // Further ticks while waiting neither change the surface nor notify again.
    assert!(!c.advance(FRAME).unwrap());

    let notices: Vec<_> = rx.try_iter().collect();
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0],
        NotificationMessage::Playback(PlaybackNotice::DidPlayToEnd { marker })
            if marker.as_str() == "Afiche"
    ));
}

#[test]
fn restart_is_one_seek_and_one_resume_without_a_gap() {
    let mut c =
        AlphaVideoCompositor::new("Afiche".into(), source(3), PlaybackSpec::default(), None)
            .unwrap();
    for _ in 0..3 {
        c.advance(FRAME).unwrap();
    }
    assert_eq!(c.state(), PlaybackState::AwaitingRestart);

    assert!(c.restart().unwrap());
    assert_eq!(c.state(), PlaybackState::Playing);
    assert_eq!(red_at_origin(&c), [0, 0, 0, 200]);

    let stats = c.stats();
    assert_eq!(stats.seeks, 1);
    assert_eq!(stats.resumes, 1);
    assert_eq!(stats.loops_completed, 1);
    assert!((stats.max_frame_gap_sec - FRAME).abs() < 1e-9);

    // A duplicate restart request is ignored.
    assert!(!c.restart().unwrap());
    assert_eq!(c.stats().seeks, 1);

    c.advance(FRAME).unwrap();
    assert_eq!(red_at_origin(&c), [10, 0, 0, 200]);
}

#[test]
fn late_restart_catches_up_with_elapsed_time() {
    let mut c =
        AlphaVideoCompositor::new("Afiche".into(), source(4), PlaybackSpec::default(), None)
            .unwrap();
    c.advance(FRAME * 4.0).unwrap();
    assert_eq!(c.state(), PlaybackState::AwaitingRestart);

    // The notice takes a while to come back.
    c.advance(FRAME * 2.0).unwrap();
    c.restart().unwrap();
    assert_eq!(red_at_origin(&c), [0, 0, 0, 200]);

    c.advance(1e-6).unwrap();
    assert_eq!(red_at_origin(&c), [20, 0, 0, 200]);
}

#[test]
fn non_looping_video_ends_on_its_last_frame() {
    let spec = PlaybackSpec {
        looping: false,
        muted: false,
        ..PlaybackSpec::default()
    };
    let mut c = AlphaVideoCompositor::new("Afiche".into(), source(2), spec, None).unwrap();
    c.advance(FRAME * 5.0).unwrap();
    assert_eq!(c.state(), PlaybackState::Ended);
    assert_eq!(red_at_origin(&c), [10, 0, 0, 200]);
    assert!(!c.restart().unwrap());
    assert_eq!(c.stats().seeks, 0);
    assert_eq!(c.volume(), 1.0);
}

#[test]
fn odd_height_stream_is_rejected() {
    let frames = vec![RgbaImage::new(2, 3)];
    let src = Box::new(InMemorySource::new(frames, Fps::new(4, 1).unwrap()).unwrap());
    let err = AlphaVideoCompositor::new("Afiche".into(), src, PlaybackSpec::default(), None)
        .unwrap_err();
    assert!(matches!(err, MarkerlayError::Validation(_)));
}

#[test]
fn open_returns_none_for_missing_asset() {
    let root = PathBuf::from("target")
        .join("markerlay-unit")
        .join("compositor_missing");
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();
    let store = AssetStore::new(&root);
    assert!(
        AlphaVideoCompositor::open(
            &store,
            "Afiche".into(),
            &AssetRef::new("Fire", "mp4"),
            PlaybackSpec::default(),
            None,
        )
        .is_none()
    );
}

#[test]
fn open_plays_a_frame_directory() {
    let root = PathBuf::from("target")
        .join("markerlay-unit")
        .join("compositor_dir");
    let _ = std::fs::remove_dir_all(&root);
    let dir = root.join("Fire.mp4");
    std::fs::create_dir_all(&dir).unwrap();
    band_frame(1).save(dir.join("0001.png")).unwrap();
    band_frame(2).save(dir.join("0002.png")).unwrap();

    let store = AssetStore::new(&root);
    let spec = PlaybackSpec {
        fps: Some(Fps::new(4, 1).unwrap()),
        ..PlaybackSpec::default()
    };
    let mut c = AlphaVideoCompositor::open(
        &store,
        "Afiche".into(),
        &AssetRef::new("Fire", "mp4"),
        spec,
        None,
    )
    .unwrap();
    assert_eq!(red_at_origin(&c), [10, 0, 0, 200]);
    c.advance(FRAME).unwrap();
    assert_eq!(red_at_origin(&c), [20, 0, 0, 200]);
}
