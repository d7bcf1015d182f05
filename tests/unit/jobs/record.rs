use super::*;
use serde_json::json;

fn draft() -> Animation {
    Animation::draft(
        1,
        42,
        1,
        NewAnimation {
            title: "  Rooftop duel ".to_owned(),
            description: None,
            scene_data: SceneData::from_value(json!({ "description": "two warriors clash" }))
                .unwrap(),
            settings: Map::new(),
        },
    )
}

#[test]
fn draft_starts_clean() {
    let a = draft();
    assert_eq!(a.status, AnimationStatus::Draft);
    assert_eq!(a.title, "Rooftop duel");
    assert_eq!(a.render_progress, 0);
    assert!(a.render_task_id.is_none());
}

#[test]
fn full_lifecycle_to_completed() {
    let mut a = draft();
    a.begin_render(TaskId(7)).unwrap();
    assert_eq!(a.status, AnimationStatus::Rendering);
    assert_eq!(a.render_task_id, Some(TaskId(7)));

    a.record_progress(50).unwrap();
    a.record_progress(25).unwrap();
    assert_eq!(a.render_progress, 50);

    a.complete("outputs/animation_1.mp4").unwrap();
    assert_eq!(a.status, AnimationStatus::Completed);
    assert_eq!(a.render_progress, 100);
    assert_eq!(a.output_path.as_deref(), Some("outputs/animation_1.mp4"));
    assert!(a.status.is_finished());
}

#[test]
fn duplicate_render_is_a_conflict() {
    let mut a = draft();
    a.begin_render(TaskId(1)).unwrap();
    let err = a.begin_render(TaskId(2)).unwrap_err();
    assert!(matches!(err, FightframeError::Conflict(_)));
    assert_eq!(a.render_task_id, Some(TaskId(1)));
}

#[test]
fn failed_render_can_be_requested_again() {
    let mut a = draft();
    a.begin_render(TaskId(1)).unwrap();
    a.record_progress(75).unwrap();
    a.fail("Animation rendering failed: boom").unwrap();
    assert_eq!(a.status, AnimationStatus::Failed);
    assert_eq!(a.render_progress, 75);

    a.begin_render(TaskId(2)).unwrap();
    assert_eq!(a.render_progress, 0);
    assert!(a.error_message.is_none());
    assert!(a.output_path.is_none());
}

#[test]
fn transitions_outside_rendering_are_rejected() {
    let mut a = draft();
    assert!(matches!(
        a.record_progress(10).unwrap_err(),
        FightframeError::Conflict(_)
    ));
    assert!(a.complete("x").is_err());
    assert!(a.fail("x").is_err());
    assert_eq!(a.status, AnimationStatus::Draft);
}

#[test]
fn empty_failure_message_gets_a_default() {
    let mut a = draft();
    a.begin_render(TaskId(1)).unwrap();
    a.fail("  ").unwrap();
    assert_eq!(a.error_message.as_deref(), Some("render failed"));
}

#[test]
fn patch_rules() {
    let mut a = draft();
    a.apply_patch(AnimationPatch {
        title: Some("Harbor brawl".to_owned()),
        description: Some("rain".to_owned()),
        ..AnimationPatch::default()
    })
    .unwrap();
    assert_eq!(a.title, "Harbor brawl");
    assert_eq!(a.description.as_deref(), Some("rain"));

    assert!(
        a.apply_patch(AnimationPatch {
            title: Some(" ".to_owned()),
            ..AnimationPatch::default()
        })
        .unwrap_err()
        .is_validation()
    );

    a.begin_render(TaskId(3)).unwrap();
    let err = a
        .apply_patch(AnimationPatch {
            scene_data: Some(SceneData::default()),
            ..AnimationPatch::default()
        })
        .unwrap_err();
    assert!(matches!(err, FightframeError::Conflict(_)));
}

#[test]
fn ownership_is_checked() {
    let a = draft();
    a.ensure_owner(42).unwrap();
    assert!(matches!(
        a.ensure_owner(7).unwrap_err(),
        FightframeError::Forbidden(_)
    ));
}

#[test]
fn status_serializes_snake_case() {
    assert_eq!(
        serde_json::to_value(AnimationStatus::Rendering).unwrap(),
        json!("rendering")
    );
}
