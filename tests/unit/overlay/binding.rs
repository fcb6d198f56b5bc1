use super::*;

#[test]
fn json_defaults_loop_muted_and_vertical_split() {
    let table: BindingTable = serde_json::from_str(
        r#"{
            "Afiche": { "kind": "video", "asset": { "name": "Fire", "ext": "mp4" } },
            "HandEye": { "kind": "animation", "asset": { "name": "love_explosion" }, "loop": false }
        }"#,
    )
    .unwrap();
    table.validate().unwrap();

    let afiche = table.get(&MarkerId::new("Afiche")).unwrap();
    assert_eq!(afiche.kind, MediaKind::Video);
    assert!(afiche.looping);
    assert!(afiche.muted);
    assert_eq!(afiche.split, SplitLayout::Vertical);
    assert_eq!(afiche.asset.file_name(), "Fire.mp4");

    let hand = table.get(&MarkerId::new("HandEye")).unwrap();
    assert!(!hand.looping);
    assert_eq!(hand.asset.file_name(), "love_explosion");
}

#[test]
fn lookup_is_exact_match_only() {
    let table = BindingTable::demo();
    assert!(table.get(&MarkerId::new("Afiche")).is_some());
    assert!(table.get(&MarkerId::new("afiche")).is_none());
    assert!(table.get(&MarkerId::new("Afiche ")).is_none());
    assert!(table.get(&MarkerId::new("HomeroMaddona")).is_none());
}

#[test]
fn demo_table_round_trips_through_json() {
    let table = BindingTable::demo();
    assert_eq!(table.len(), 3);
    table.validate().unwrap();

    let json = serde_json::to_string(&table).unwrap();
    assert!(json.contains("\"loop\":true"));
    assert!(json.contains("\"split\":\"horizontal\""));
    let back: BindingTable = serde_json::from_str(&json).unwrap();
    assert_eq!(back, table);
}

#[test]
fn validation_rejects_bad_bindings() {
    let zero_fps = ContentBinding::video(AssetRef::new("Fire", "mp4")).with_fps(0);
    assert!(zero_fps.validate().is_err());

    let blank = ContentBinding::image(AssetRef::bare("  "));
    assert!(blank.validate().is_err());

    let split_animation =
        ContentBinding::animation(AssetRef::bare("heart")).with_split(SplitLayout::Horizontal);
    assert!(split_animation.validate().is_err());

    let table = BindingTable::new().with("Afiche", zero_fps);
    let err = table.validate().unwrap_err().to_string();
    assert!(err.contains("Afiche"), "{err}");
}
