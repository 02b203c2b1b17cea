use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        AtrousError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        AtrousError::allocation("x")
            .to_string()
            .contains("allocation error:")
    );
    assert!(AtrousError::device("x").to_string().contains("device error:"));
    assert!(
        AtrousError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = AtrousError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn json_errors_map_to_serde_variant() {
    let err: AtrousError = serde_json::from_str::<u32>("not json").unwrap_err().into();
    assert!(matches!(err, AtrousError::Serde(_)));
}
