use super::*;
use crate::choreography::character::{CharacterClass, Weapon};
use crate::choreography::moves::{MoveBuilder, Requirement};
use crate::choreography::physics::PhysicsSettings;

fn fighter(name: &str, weapon: Weapon) -> CharacterDescriptor {
    CharacterDescriptor {
        name: name.to_owned(),
        class: CharacterClass::Warrior,
        weapon,
        health: 120,
        attack: 20,
        defense: 10,
        stamina: 100.0,
        special_ability: None,
    }
}

fn physics() -> Arc<PhysicsContext> {
    Arc::new(PhysicsContext::new(&PhysicsSettings::default()).unwrap())
}

fn builtin() -> FightChoreographer {
    FightChoreographer::with_builtin_library(physics(), ChoreographyOpts::default()).unwrap()
}

fn step(name: &str, category: MoveCategory, duration: f64) -> FightMove {
    MoveBuilder::new(name, category)
        .duration(duration)
        .keyframe(0, Pose::at(0.0, 0.0))
        .keyframe(6, Pose::at(0.1, 0.0))
        .build()
        .unwrap()
}

#[test]
fn invalid_requests_are_validation_failures() {
    let c = builtin();
    let env = Environment::preset(Terrain::Arena);
    let duo = [fighter("a", Weapon::Sword)];

    let err = c.generate_fight_sequence(&[], &env, 5.0, Style::Dynamic).unwrap_err();
    assert!(err.is_validation());
    for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = c.generate_fight_sequence(&duo, &env, bad, Style::Dynamic).unwrap_err();
        assert!(err.is_validation(), "duration {bad} should be rejected");
    }
}

#[test]
fn sequence_reaches_target_and_sums_durations() {
    let c = builtin();
    let env = Environment::preset(Terrain::Arena);
    let chars = [fighter("a", Weapon::Sword), fighter("b", Weapon::Bow)];
    let seq = c.generate_fight_sequence(&chars, &env, 8.0, Style::Dynamic).unwrap();

    let sum: f64 = seq.moves.iter().map(|m| m.duration).sum();
    assert!((sum - seq.duration).abs() < 1e-9);
    assert!(seq.timeline_duration() >= 8.0);
    assert!(seq.moves.first().unwrap().category().is_some());
    assert!(!seq.transitions.contains(&0));
    assert!(seq.transition_moves().all(|m| m.is_transition()));
    assert_eq!(
        seq.transitions.len(),
        seq.moves.iter().filter(|m| m.is_transition()).count()
    );
}

#[test]
fn generation_is_deterministic() {
    let c = builtin();
    let env = Environment::preset(Terrain::UrbanRuins);
    let chars = [fighter("a", Weapon::Axe)];
    let a = c.generate_fight_sequence(&chars, &env, 6.0, Style::Cinematic).unwrap();
    let b = c.generate_fight_sequence(&chars, &env, 6.0, Style::Cinematic).unwrap();
    assert_eq!(a, b);
}

#[test]
fn transitions_bridge_consecutive_moves() {
    let c = builtin();
    let env = Environment::preset(Terrain::DenseForest);
    let seq = c
        .generate_fight_sequence(&[fighter("a", Weapon::Sword)], &env, 4.0, Style::Aggressive)
        .unwrap();
    for &i in &seq.transitions {
        let t = &seq.moves[i];
        let next = &seq.moves[i + 1];
        assert!(next.category().is_some());
        assert_eq!(t.last_pose(), next.first_pose());
        assert!(t.name.starts_with("transition_"));
        assert!(t.name.ends_with(&format!("_to_{}", next.name)));
    }
}

#[test]
fn no_eligible_move_is_exhaustion() {
    let mut lib = MoveLibrary::new();
    lib.register(
        MoveBuilder::new("volley", MoveCategory::Attack)
            .duration(0.5)
            .keyframe(0, Pose::at(0.0, 0.0))
            .requires(Requirement::Weapon(Weapon::Bow))
            .build()
            .unwrap(),
    )
    .unwrap();
    let c = FightChoreographer::new(lib, physics(), ChoreographyOpts::default()).unwrap();
    let err = c
        .generate_fight_sequence(
            &[fighter("a", Weapon::Sword)],
            &Environment::arena(10.0, 10.0),
            3.0,
            Style::Dynamic,
        )
        .unwrap_err();
    assert!(matches!(err, FightframeError::ChoreographyExhausted(_)));

    let empty = FightChoreographer::new(MoveLibrary::new(), physics(), ChoreographyOpts::default())
        .unwrap();
    let err = empty
        .generate_fight_sequence(
            &[fighter("a", Weapon::Sword)],
            &Environment::arena(10.0, 10.0),
            3.0,
            Style::Dynamic,
        )
        .unwrap_err();
    assert!(matches!(err, FightframeError::ChoreographyExhausted(_)));
}

#[test]
fn iteration_cap_stops_long_requests() {
    let opts = ChoreographyOpts {
        max_iterations: 3,
        ..ChoreographyOpts::default()
    };
    let c = FightChoreographer::with_builtin_library(physics(), opts).unwrap();
    let err = c
        .generate_fight_sequence(
            &[fighter("a", Weapon::Sword)],
            &Environment::preset(Terrain::Arena),
            600.0,
            Style::Dynamic,
        )
        .unwrap_err();
    assert!(matches!(err, FightframeError::ChoreographyExhausted(_)));
    assert!(err.to_string().contains("max_iterations"));

    // The cap counts turns, so the same short library fills a longer timeline once raised.
    let roomy = ChoreographyOpts {
        max_iterations: 1_000,
        ..ChoreographyOpts::default()
    };
    let seq = FightChoreographer::with_builtin_library(physics(), roomy)
        .unwrap()
        .generate_fight_sequence(
            &[fighter("a", Weapon::Sword)],
            &Environment::preset(Terrain::Arena),
            60.0,
            Style::Dynamic,
        )
        .unwrap();
    assert!(seq.timeline_duration() >= 60.0);

    let zero = ChoreographyOpts {
        max_iterations: 0,
        ..ChoreographyOpts::default()
    };
    assert!(FightChoreographer::with_builtin_library(physics(), zero).is_err());
}

#[test]
fn ties_go_to_the_first_registered_move() {
    let mut lib = MoveLibrary::new();
    lib.register(step("first", MoveCategory::Attack, 0.5)).unwrap();
    lib.register(step("second", MoveCategory::Attack, 0.5)).unwrap();
    let c = FightChoreographer::new(lib, physics(), ChoreographyOpts::default()).unwrap();
    let env = Environment::arena(10.0, 10.0);
    let state = SequenceState::new(Pose::default(), 100.0);
    let pick = c
        .select_next_move(&[fighter("a", Weapon::Sword)], &state, &env, Style::Dynamic)
        .unwrap();
    assert_eq!(pick.name, "first");
}

#[test]
fn repeating_a_move_lowers_its_score() {
    let c = builtin();
    let env = Environment::arena(10.0, 10.0);
    let jab = c.library().get("jab").unwrap().clone();
    let fresh = SequenceState::new(Pose::default(), 100.0);
    let mut repeated = fresh.clone();
    repeated.observe(0, &jab);
    repeated.observe(1, &jab);
    assert_eq!(repeated.repeat, 2);
    assert!(
        c.score(&jab, &repeated, &env, Style::Dynamic) < c.score(&jab, &fresh, &env, Style::Dynamic)
    );
}

#[test]
fn style_steers_the_opening_move() {
    let c = builtin();
    let env = Environment::preset(Terrain::Arena);
    let chars = [fighter("a", Weapon::Sword)];
    let state = SequenceState::new(Pose::default(), 100.0);

    let aggressive = c.select_next_move(&chars, &state, &env, Style::Aggressive).unwrap();
    assert_eq!(aggressive.category(), Some(MoveCategory::Attack));
    let defensive = c.select_next_move(&chars, &state, &env, Style::Defensive).unwrap();
    assert_eq!(defensive.category(), Some(MoveCategory::Defense));
}

#[test]
fn low_stamina_prefers_recovery() {
    let c = builtin();
    let env = Environment::arena(10.0, 10.0);
    let mut state = SequenceState::new(Pose::default(), 100.0);
    state.stamina = 10.0;
    let pick = c
        .select_next_move(&[fighter("a", Weapon::Sword)], &state, &env, Style::Dynamic)
        .unwrap();
    assert!(pick.stamina_cost < 0.0, "picked {}", pick.name);
}

#[test]
fn cramped_arena_produces_overlays_without_advancing_time() {
    let c = builtin();
    let env = Environment::arena(0.3, 0.3);
    let seq = c
        .generate_fight_sequence(&[fighter("a", Weapon::Sword)], &env, 3.0, Style::Aggressive)
        .unwrap();

    assert!(!seq.environment_interactions.is_empty());
    let overlays: Vec<&FightMove> = seq
        .moves
        .iter()
        .filter(|m| m.is_environment_interaction())
        .collect();
    assert_eq!(overlays.len(), seq.environment_interactions.len());
    assert!(overlays.iter().all(|m| m.name.starts_with("env_interaction_")));
    let overlay_time: f64 = overlays.iter().map(|m| m.duration).sum();
    assert!((seq.duration - seq.timeline_duration() - overlay_time).abs() < 1e-9);
    for hit in &seq.environment_interactions {
        assert!(hit.time >= 0.0 && hit.time <= seq.timeline_duration());
        assert!(!hit.effects.is_empty());
    }
}

#[test]
fn compile_places_interactions_at_trigger_time() {
    let a = step("a", MoveCategory::Attack, 1.0);
    let b = step("b", MoveCategory::Defense, 1.0);
    let t = generate_transition(&a, &b);
    let t_len = t.duration;
    let overlay = FightMove {
        name: "env_interaction_wall".to_owned(),
        kind: MoveKind::EnvironmentInteraction {
            kind: InteractionKind::Obstacle(ObstacleKind::Wall),
            contact_time: 0.2,
        },
        duration: 0.3,
        keyframes: vec![Keyframe::new(0, Pose::default())],
        impact_frames: smallvec![0],
        requirements: Vec::new(),
        effects: vec![EffectDescriptor {
            cue: EffectCue::Debris,
            frame: 0,
            intensity: 0.5,
        }],
        stamina_cost: 0.0,
    };
    let seq = compile_sequence(vec![a, t, b, overlay]);

    assert_eq!(seq.transitions, vec![1]);
    assert_eq!(seq.environment_interactions.len(), 1);
    let hit = &seq.environment_interactions[0];
    assert!((hit.time - (1.0 + t_len + 0.2)).abs() < 1e-12);
    assert_eq!(hit.kind.tag(), "wall");
    assert!((seq.duration - (2.3 + t_len)).abs() < 1e-12);
    assert!((seq.timeline_duration() - (2.0 + t_len)).abs() < 1e-12);
    assert_eq!(seq.effects.len(), 1);
}

#[test]
fn interaction_record_serializes_kind_as_type() {
    let rec = EnvironmentInteraction {
        time: 1.0,
        kind: InteractionKind::Ground,
        effects: Vec::new(),
    };
    let v = serde_json::to_value(&rec).unwrap();
    assert_eq!(v["type"], "ground");
}

#[test]
fn style_parses_case_insensitively() {
    assert_eq!("Cinematic".parse::<Style>().unwrap(), Style::Cinematic);
    assert_eq!(" dynamic ".parse::<Style>().unwrap(), Style::Dynamic);
    assert!("chaotic".parse::<Style>().unwrap_err().is_validation());
    assert_eq!(Style::Aggressive.to_string(), "aggressive");
}
