use super::*;
use crate::choreography::Style;
use crate::render::EffectsMode;

#[test]
fn empty_document_yields_defaults() {
    let cfg = EngineConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, EngineConfig::default());
    cfg.validate().unwrap();
    assert_eq!(cfg.physics.solver_iterations, 10);
    assert_eq!(cfg.choreography.max_iterations, 10_000);
    assert_eq!(cfg.render.default_fps, 30);
    assert_eq!(cfg.jobs.workers, 2);
    assert_eq!(cfg.jobs.retain_finished, DEFAULT_RETAINED_FINISHED);
}

#[test]
fn partial_sections_merge_with_defaults() {
    let cfg = EngineConfig::from_json_str(
        r#"{
            "physics": { "gravity": -3.7 },
            "choreography": { "default_style": "cinematic" },
            "render": { "effects_mode": "strict", "canvas": { "width": 64, "height": 32 } },
            "jobs": { "output_format": "png" }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.physics.gravity, -3.7);
    assert_eq!(cfg.physics.timestep, 1.0 / 240.0);
    assert_eq!(cfg.choreography.default_style, Style::Cinematic);
    assert_eq!(cfg.render.effects_mode, EffectsMode::Strict);
    assert_eq!(cfg.render.canvas.width, 64);
    assert_eq!(cfg.jobs.output_format, OutputFormat::Png);
    assert_eq!(
        cfg.jobs.output_target(7),
        PathBuf::from("outputs").join("animation_7")
    );
}

#[test]
fn invalid_values_fail_validation() {
    let cfg = EngineConfig::from_json_str(r#"{ "jobs": { "workers": 0 } }"#).unwrap();
    assert!(cfg.validate().unwrap_err().is_validation());

    let cfg = EngineConfig::from_json_str(r#"{ "render": { "default_fps": 0 } }"#).unwrap();
    assert!(cfg.validate().is_err());

    let cfg = EngineConfig::from_json_str(r#"{ "render": { "default_fps": 1000 } }"#).unwrap();
    assert!(cfg.validate().unwrap_err().is_validation());

    let cfg = EngineConfig::from_json_str(r#"{ "jobs": { "retain_finished": 0 } }"#).unwrap();
    assert!(cfg.validate().unwrap_err().is_validation());

    assert!(
        EngineConfig::from_json_str("[1]")
            .unwrap_err()
            .is_validation()
    );
}

#[test]
fn overrides_replace_output_dir_and_workers() {
    let mut cfg = EngineConfig::default();
    cfg.apply_overrides(|k| match k {
        ENV_OUTPUT_DIR => Some("/tmp/renders".to_owned()),
        ENV_WORKERS => Some(" 6 ".to_owned()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.jobs.output_dir, PathBuf::from("/tmp/renders"));
    assert_eq!(cfg.jobs.workers, 6);
    assert_eq!(
        cfg.jobs.output_target(3),
        PathBuf::from("/tmp/renders").join("animation_3.mp4")
    );

    let err = cfg
        .apply_overrides(|k| (k == ENV_WORKERS).then(|| "many".to_owned()))
        .unwrap_err();
    assert!(err.is_validation());
}
