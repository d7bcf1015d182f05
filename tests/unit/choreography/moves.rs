use super::*;
use crate::choreography::character::SpecialAbility;

fn fighter(class: CharacterClass, weapon: Weapon, attack: u32, defense: u32) -> CharacterDescriptor {
    CharacterDescriptor {
        name: "Test".to_owned(),
        class,
        weapon,
        health: 100,
        attack,
        defense,
        stamina: 100.0,
        special_ability: None,
    }
}

#[test]
fn builtin_library_covers_every_category_in_order() {
    let lib = MoveLibrary::builtin().unwrap();
    assert!(!lib.moves(MoveCategory::Attack).is_empty());
    assert!(!lib.moves(MoveCategory::Defense).is_empty());
    assert!(!lib.moves(MoveCategory::Special).is_empty());

    let cats: Vec<MoveCategory> = lib.iter().filter_map(|m| m.category()).collect();
    let mut sorted = cats.clone();
    sorted.sort();
    assert_eq!(cats, sorted, "iteration must visit attacks, defenses, specials");
    assert_eq!(lib.iter().next().unwrap().name, "jab");
}

#[test]
fn builder_rejects_invalid_moves() {
    let no_keyframes = MoveBuilder::new("empty", MoveCategory::Attack)
        .duration(0.3)
        .build();
    assert!(no_keyframes.unwrap_err().is_validation());

    let bad_impact = MoveBuilder::new("bad", MoveCategory::Attack)
        .duration(0.3)
        .keyframe(0, Pose::at(0.0, 0.0))
        .impact(3)
        .build();
    assert!(bad_impact.is_err());

    let unordered = MoveBuilder::new("unordered", MoveCategory::Defense)
        .duration(0.3)
        .keyframe(10, Pose::at(0.0, 0.0))
        .keyframe(10, Pose::at(0.1, 0.0))
        .build();
    assert!(unordered.is_err());

    let negative = MoveBuilder::new("negative", MoveCategory::Defense)
        .duration(-1.0)
        .keyframe(0, Pose::at(0.0, 0.0))
        .build();
    assert!(negative.is_err());
}

#[test]
fn register_rejects_duplicates_and_non_library_moves() {
    let mut lib = MoveLibrary::new();
    let mv = MoveBuilder::new("tap", MoveCategory::Attack)
        .duration(0.2)
        .keyframe(0, Pose::at(0.0, 0.0))
        .build()
        .unwrap();
    lib.register(mv.clone()).unwrap();
    assert!(lib.register(mv.clone()).is_err());

    let mut transition = mv;
    transition.name = "transition_x".to_owned();
    transition.kind = MoveKind::Transition;
    assert!(lib.register(transition).is_err());
    assert_eq!(lib.len(), 1);
}

#[test]
fn performer_checks_pool_and_character_requirements() {
    let lib = MoveLibrary::builtin().unwrap();
    let cleave = lib.get("overhead_cleave").unwrap();
    let weak = fighter(CharacterClass::Mage, Weapon::Staff, 5, 5);
    let strong = fighter(CharacterClass::Warrior, Weapon::Axe, 20, 5);

    assert_eq!(cleave.performer(&[weak.clone()], 100.0), None);
    assert_eq!(cleave.performer(&[weak.clone(), strong.clone()], 100.0), Some(1));
    assert_eq!(cleave.performer(&[strong.clone()], 5.0), None);

    let strike = lib.get("lightning_strike").unwrap();
    let mut caster = weak;
    assert_eq!(strike.performer(&[caster.clone()], 100.0), None);
    caster.special_ability = Some(SpecialAbility::LightningStrike);
    assert_eq!(strike.performer(&[caster], 100.0), Some(0));

    let guard = lib.get("guard").unwrap();
    assert_eq!(guard.performer(&[strong], 0.0), Some(0));
}

#[test]
fn placed_at_translates_every_keyframe() {
    let lib = MoveLibrary::builtin().unwrap();
    let jab = lib.get("jab").unwrap();
    let placed = jab.placed_at(Point::new(2.0, -1.0));
    assert_eq!(placed.first_pose().root, Point::new(2.0, -1.0));
    assert!((placed.displacement() - jab.displacement()).hypot() < 1e-9);
    assert_eq!(placed.keyframes.len(), jab.keyframes.len());
}

#[test]
fn library_loads_from_category_keyed_json() {
    let json = r#"{
        "defense": [
            { "name": "brace", "duration": 0.5,
              "keyframes": [ { "frame": 0, "pose": { "root": { "x": 0.0, "y": 0.0 } } } ],
              "stamina_cost": -5.0 }
        ],
        "attack": [
            { "name": "headbutt", "duration": 0.4,
              "keyframes": [
                { "frame": 0, "pose": { "root": { "x": 0.0, "y": 0.0 } } },
                { "frame": 12, "pose": { "root": { "x": 0.3, "y": 0.0 } } }
              ],
              "impact_frames": [1],
              "requirements": [ { "min_health": 80 } ],
              "effects": [ { "cue": "impact_flash", "frame": 12, "intensity": 0.5 } ] }
        ]
    }"#;
    let lib = MoveLibrary::from_json_str(json).unwrap();
    assert_eq!(lib.len(), 2);
    let names: Vec<&str> = lib.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["headbutt", "brace"]);
    let headbutt = lib.get("headbutt").unwrap();
    assert_eq!(headbutt.requirements, vec![Requirement::MinHealth(80)]);
    assert_eq!(headbutt.impact_frames.as_slice(), &[1]);
}

#[test]
fn library_json_rejects_invalid_moves() {
    let json = r#"{ "attack": [ { "name": "nothing", "duration": 0.4, "keyframes": [] } ] }"#;
    assert!(MoveLibrary::from_json_str(json).unwrap_err().is_validation());
}
