use super::*;

const CATALOG: &str = r#"{
  "images": [
    { "name": "Afiche", "physical_width": 0.2, "physical_height": 0.3 },
    { "name": "HandEye", "physical_width": 0.1, "physical_height": 0.1 }
  ]
}"#;

#[test]
fn catalog_fills_group_and_resolves_descriptors() {
    let cat = ReferenceCatalog::from_json_str("AR Resources", CATALOG).unwrap();
    assert_eq!(cat.group, "AR Resources");
    assert_eq!(cat.len(), 2);

    let desc = cat.descriptor(&MarkerId::from("Afiche")).unwrap();
    assert_eq!(desc.physical_size, PhysicalSize::new(0.2, 0.3).unwrap());
}

#[test]
fn descriptor_lookup_is_exact_match_only() {
    let cat = ReferenceCatalog::from_json_str("AR Resources", CATALOG).unwrap();
    assert!(cat.descriptor(&MarkerId::from("afiche")).is_none());
    assert!(cat.descriptor(&MarkerId::from("Afiche ")).is_none());
}

#[test]
fn empty_or_malformed_catalog_is_missing_resource() {
    let err = ReferenceCatalog::from_json_str("g", r#"{ "images": [] }"#).unwrap_err();
    assert!(err.is_fatal());
    let err = ReferenceCatalog::from_json_str("g", "{").unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn duplicate_names_and_bad_sizes_are_rejected() {
    let dup = r#"{ "images": [
        { "name": "A", "physical_width": 0.1, "physical_height": 0.1 },
        { "name": "A", "physical_width": 0.2, "physical_height": 0.2 }
    ] }"#;
    assert!(ReferenceCatalog::from_json_str("g", dup).is_err());

    let bad = r#"{ "images": [ { "name": "A", "physical_width": 0.0, "physical_height": 0.1 } ] }"#;
    assert!(ReferenceCatalog::from_json_str("g", bad).is_err());
}
