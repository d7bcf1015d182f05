use super::*;

#[test]
fn presets_are_valid_and_named_after_terrain() {
    for terrain in Terrain::ALL {
        let env = Environment::preset(terrain);
        env.validate().unwrap();
        assert_eq!(env.terrain, terrain);
        assert_eq!(env.name, terrain.display_name());
    }
}

#[test]
fn degenerate_bounds_are_rejected() {
    let mut env = Environment::arena(4.0, 4.0);
    env.bounds = Rect::new(1.0, 1.0, 1.0, 3.0);
    assert!(env.validate().is_err());

    let mut env = Environment::arena(4.0, 4.0);
    env.obstacles.push(Obstacle {
        name: "ghost".to_owned(),
        kind: ObstacleKind::Crate,
        bounds: Rect::new(0.0, 0.0, f64::NAN, 1.0),
    });
    assert!(env.validate().is_err());
}

#[test]
fn character_json_defaults_stamina_and_ability() {
    let c: CharacterDescriptor = serde_json::from_str(
        r#"{"name":"Ryu","class":"warrior","weapon":"sword","health":120,"attack":14,"defense":9}"#,
    )
    .unwrap();
    assert_eq!(c.stamina, 100.0);
    assert_eq!(c.special_ability, None);
    assert_eq!(c.class, CharacterClass::Warrior);
}

#[test]
fn environment_json_roundtrips_kurbo_rects() {
    let env = Environment::preset(Terrain::UrbanRuins);
    let json = serde_json::to_string(&env).unwrap();
    let back: Environment = serde_json::from_str(&json).unwrap();
    assert_eq!(env, back);
}

#[test]
fn slippery_terrain_has_less_traction() {
    assert!(Terrain::FrozenTundra.traction() < Terrain::Arena.traction());
}
