use std::path::PathBuf;

use super::*;

fn fresh_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("markerlay-unit").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn solid(w: u32, h: u32, v: u8) -> RgbaImage {
    RgbaImage::from_pixel(w, h, image::Rgba([v, v, v, 255]))
}

#[test]
fn in_memory_source_signals_end_and_rewinds() {
    let fps = Fps::new(10, 1).unwrap();
    let mut src = InMemorySource::new(vec![solid(2, 4, 1), solid(2, 4, 2)], fps).unwrap();
    assert_eq!(src.info().frame_count, Some(2));

    assert_eq!(src.next_frame().unwrap().unwrap().get_pixel(0, 0).0[0], 1);
    assert_eq!(src.next_frame().unwrap().unwrap().get_pixel(0, 0).0[0], 2);
    assert!(src.next_frame().unwrap().is_none());
    assert!(src.next_frame().unwrap().is_none());

    src.seek_to_start().unwrap();
    assert_eq!(src.next_frame().unwrap().unwrap().get_pixel(0, 0).0[0], 1);
}

#[test]
fn in_memory_source_rejects_empty_and_mixed_sizes() {
    let fps = Fps::new(10, 1).unwrap();
    assert!(InMemorySource::new(Vec::new(), fps).is_err());
    assert!(InMemorySource::new(vec![solid(2, 4, 0), solid(4, 2, 0)], fps).is_err());
}

#[test]
fn image_sequence_orders_frames_by_name() {
    let dir = fresh_dir("image_sequence_order");
    solid(2, 4, 30).save(dir.join("0002.png")).unwrap();
    solid(2, 4, 10).save(dir.join("0001.png")).unwrap();
    std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let mut src = ImageSequenceSource::open(&dir, Fps::new(24, 1).unwrap()).unwrap();
    assert_eq!(src.info().width, 2);
    assert_eq!(src.info().height, 4);
    assert_eq!(src.info().frame_count, Some(2));

    assert_eq!(src.next_frame().unwrap().unwrap().get_pixel(0, 0).0[0], 10);
    assert_eq!(src.next_frame().unwrap().unwrap().get_pixel(0, 0).0[0], 30);
    assert!(src.next_frame().unwrap().is_none());
    src.seek_to_start().unwrap();
    assert_eq!(src.next_frame().unwrap().unwrap().get_pixel(0, 0).0[0], 10);
}

#[test]
fn image_sequence_without_frames_is_an_asset_error() {
    let dir = fresh_dir("image_sequence_empty");
    let err = ImageSequenceSource::open(&dir, Fps::new(24, 1).unwrap()).unwrap_err();
    assert!(matches!(err, MarkerlayError::Asset(_)));

    let missing = dir.join("does-not-exist");
    assert!(ImageSequenceSource::open(&missing, Fps::new(24, 1).unwrap()).is_err());
}

#[test]
fn image_sequence_reports_mismatched_frame_size() {
    let dir = fresh_dir("image_sequence_mismatch");
    solid(2, 4, 0).save(dir.join("0001.png")).unwrap();
    solid(4, 4, 0).save(dir.join("0002.png")).unwrap();

    let mut src = ImageSequenceSource::open(&dir, Fps::new(24, 1).unwrap()).unwrap();
    assert!(src.next_frame().unwrap().is_some());
    assert!(matches!(
        src.next_frame().unwrap_err(),
        MarkerlayError::Decode(_)
    ));
}

#[cfg(not(feature = "media-ffmpeg"))]
#[test]
fn container_probe_requires_feature() {
    assert!(probe_video(std::path::Path::new("Fire.mp4")).is_err());
}
