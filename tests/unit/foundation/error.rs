use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MarkerlayError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        MarkerlayError::missing_resource("x")
            .to_string()
            .contains("missing required resource:")
    );
    assert!(MarkerlayError::asset("x").to_string().contains("asset error:"));
    assert!(MarkerlayError::decode("x").to_string().contains("decode error:"));
    assert!(
        MarkerlayError::channel("x")
            .to_string()
            .contains("channel error:")
    );
    assert!(
        MarkerlayError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn only_missing_resource_is_fatal() {
    assert!(MarkerlayError::missing_resource("catalog").is_fatal());
    assert!(!MarkerlayError::asset("Fire.mp4").is_fatal());
    assert!(!MarkerlayError::decode("bad frame").is_fatal());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MarkerlayError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
