use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FightframeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        FightframeError::exhausted("x")
            .to_string()
            .contains("choreography exhausted:")
    );
    assert!(
        FightframeError::encoding("x")
            .to_string()
            .contains("encoding error:")
    );
    assert!(
        FightframeError::storage("x")
            .to_string()
            .contains("storage error:")
    );
    assert!(
        FightframeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn render_error_names_stage_and_cause() {
    let err = FightframeError::render(
        RenderStage::Interpolation,
        FightframeError::validation("At least two keyframes are required"),
    );
    let msg = err.to_string();
    assert!(msg.contains("frame interpolation"));
    assert!(msg.contains("At least two keyframes are required"));
    assert_eq!(err.render_stage(), Some(RenderStage::Interpolation));
    assert!(err.is_validation());
}

#[test]
fn root_cause_unwraps_nested_render_layers() {
    let inner = FightframeError::render(
        RenderStage::Encoding,
        FightframeError::storage("disk full"),
    );
    let outer = FightframeError::render(RenderStage::Effects, inner);
    assert!(matches!(outer.root_cause(), FightframeError::Storage(_)));
    assert!(!outer.is_validation());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FightframeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
