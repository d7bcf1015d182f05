use super::*;

#[test]
fn same_seed_same_scenario() {
    let a = ScenarioGenerator::new(42).generate_combat_scenario(4).unwrap();
    let b = ScenarioGenerator::new(42).generate_combat_scenario(4).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.participants.len(), 4);
    assert_ne!(a.environment.terrain, Terrain::Arena);
}

#[test]
fn generated_attributes_stay_in_range() {
    let mut g = ScenarioGenerator::new(7);
    for _ in 0..200 {
        let c = g.generate_character().unwrap();
        assert!((50..=200).contains(&c.health));
        assert!((5..=25).contains(&c.attack));
        assert!((3..=20).contains(&c.defense));
        assert!(c.special_ability.is_some());
        assert!(c.name.contains(' '));
    }
}

#[test]
fn zero_participants_is_rejected() {
    let err = ScenarioGenerator::new(1).generate_combat_scenario(0).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn strongest_participant_wins_and_ties_go_to_the_first() {
    let mut scenario = ScenarioGenerator::new(3).generate_combat_scenario(3).unwrap();
    for (i, c) in scenario.participants.iter_mut().enumerate() {
        c.name = format!("p{i}");
        c.attack = 10;
        c.health = 100;
    }
    scenario.participants[2].health = 150;
    let out = simulate_combat(&scenario).unwrap();
    assert_eq!(out.winner.name, "p2");

    scenario.participants[1].health = 150;
    let out = simulate_combat(&scenario).unwrap();
    assert_eq!(out.winner.name, "p1");
    assert_eq!(
        out.combat_log,
        format!("Combat in {} resolved!", scenario.environment.name)
    );
}

#[test]
fn empty_scenario_cannot_be_resolved() {
    let mut scenario = ScenarioGenerator::new(3).generate_combat_scenario(1).unwrap();
    scenario.participants.clear();
    assert!(simulate_combat(&scenario).is_err());
}

#[test]
fn scenario_round_trips_through_json() {
    let scenario = ScenarioGenerator::new(9).generate_combat_scenario(2).unwrap();
    let json = serde_json::to_string(&scenario).unwrap();
    let back: CombatScenario = serde_json::from_str(&json).unwrap();
    assert_eq!(back, scenario);
}
