//! Character and environment descriptors consumed by move selection.

use crate::foundation::core::Rect;
use crate::foundation::error::{FightframeError, FightframeResult};
use serde::{Deserialize, Serialize};

/// Fighting class of a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Warrior,
    Mage,
    Rogue,
    Archer,
    Paladin,
    Berserker,
    Assassin,
    Necromancer,
}

impl CharacterClass {
    pub const ALL: [Self; 8] = [
        Self::Warrior,
        Self::Mage,
        Self::Rogue,
        Self::Archer,
        Self::Paladin,
        Self::Berserker,
        Self::Assassin,
        Self::Necromancer,
    ];
}

/// Weapon carried by a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weapon {
    Sword,
    Bow,
    Staff,
    Axe,
    Dagger,
    Spear,
    Mace,
    Crossbow,
}

impl Weapon {
    pub const ALL: [Self; 8] = [
        Self::Sword,
        Self::Bow,
        Self::Staff,
        Self::Axe,
        Self::Dagger,
        Self::Spear,
        Self::Mace,
        Self::Crossbow,
    ];
}

/// Signature ability unlocking special moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialAbility {
    LightningStrike,
    HealingAura,
    ShadowStep,
    FireBlast,
    IceShield,
    PoisonDart,
}

impl SpecialAbility {
    pub const ALL: [Self; 6] = [
        Self::LightningStrike,
        Self::HealingAura,
        Self::ShadowStep,
        Self::FireBlast,
        Self::IceShield,
        Self::PoisonDart,
    ];
}

fn default_stamina() -> f64 {
    100.0
}

/// A fighter taking part in a choreographed sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterDescriptor {
    pub name: String,
    pub class: CharacterClass,
    pub weapon: Weapon,
    pub health: u32,
    pub attack: u32,
    pub defense: u32,
    #[serde(default = "default_stamina")]
    pub stamina: f64,
    #[serde(default)]
    pub special_ability: Option<SpecialAbility>,
}

impl CharacterDescriptor {
    pub(crate) fn validate(&self) -> FightframeResult<()> {
        if !self.stamina.is_finite() || self.stamina < 0.0 {
            return Err(FightframeError::validation(format!(
                "character '{}' stamina must be finite and >= 0",
                self.name
            )));
        }
        Ok(())
    }
}

/// Ground type of a fight location. Traction scales how well fast moves hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Arena,
    DenseForest,
    MountainPass,
    DesertWasteland,
    UrbanRuins,
    FrozenTundra,
    VolcanicTerrain,
}

impl Terrain {
    pub const ALL: [Self; 7] = [
        Self::Arena,
        Self::DenseForest,
        Self::MountainPass,
        Self::DesertWasteland,
        Self::UrbanRuins,
        Self::FrozenTundra,
        Self::VolcanicTerrain,
    ];

    /// Grip in `[0, 1]`.
    pub fn traction(self) -> f64 {
        match self {
            Self::FrozenTundra => 0.4,
            Self::DesertWasteland => 0.75,
            Self::MountainPass | Self::VolcanicTerrain => 0.85,
            Self::Arena | Self::DenseForest | Self::UrbanRuins => 1.0,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Arena => "Arena",
            Self::DenseForest => "Dense Forest",
            Self::MountainPass => "Mountain Pass",
            Self::DesertWasteland => "Desert Wasteland",
            Self::UrbanRuins => "Urban Ruins",
            Self::FrozenTundra => "Frozen Tundra",
            Self::VolcanicTerrain => "Volcanic Terrain",
        }
    }
}

/// Kind of static collider placed in an environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Wall,
    Pillar,
    Tree,
    Boulder,
    Crate,
    Water,
    Lava,
}

impl ObstacleKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Pillar => "pillar",
            Self::Tree => "tree",
            Self::Boulder => "boulder",
            Self::Crate => "crate",
            Self::Water => "water",
            Self::Lava => "lava",
        }
    }
}

/// Axis-aligned collider on the ground plane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub name: String,
    pub kind: ObstacleKind,
    pub bounds: Rect,
}

/// Scene descriptor: arena footprint (meters, ground plane) and its obstacles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub terrain: Terrain,
    pub bounds: Rect,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

fn rect_is_valid(r: &Rect) -> bool {
    [r.x0, r.y0, r.x1, r.y1].iter().all(|v| v.is_finite()) && r.x1 > r.x0 && r.y1 > r.y0
}

impl Environment {
    /// Empty rectangular arena centered on the origin.
    pub fn arena(width: f64, depth: f64) -> Self {
        Self {
            name: "Arena".to_owned(),
            terrain: Terrain::Arena,
            bounds: Rect::new(-width / 2.0, -depth / 2.0, width / 2.0, depth / 2.0),
            obstacles: Vec::new(),
        }
    }

    /// Stock layout for a terrain.
    pub fn preset(terrain: Terrain) -> Self {
        fn obstacle(name: &str, kind: ObstacleKind, rect: Rect) -> Obstacle {
            Obstacle {
                name: name.to_owned(),
                kind,
                bounds: rect,
            }
        }

        let mut env = Self::arena(12.0, 8.0);
        env.name = terrain.display_name().to_owned();
        env.terrain = terrain;
        env.obstacles = match terrain {
            Terrain::Arena => vec![
                obstacle("north pillar", ObstacleKind::Pillar, Rect::new(-0.3, 3.0, 0.3, 3.6)),
                obstacle("south pillar", ObstacleKind::Pillar, Rect::new(-0.3, -3.6, 0.3, -3.0)),
            ],
            Terrain::DenseForest => vec![
                obstacle("oak", ObstacleKind::Tree, Rect::new(-3.4, 1.2, -2.8, 1.8)),
                obstacle("pine", ObstacleKind::Tree, Rect::new(2.6, -2.0, 3.2, -1.4)),
                obstacle("fallen log", ObstacleKind::Boulder, Rect::new(3.6, 0.8, 5.2, 1.2)),
            ],
            Terrain::MountainPass => {
                env.bounds = Rect::new(-6.0, -2.0, 6.0, 2.0);
                vec![obstacle(
                    "rockfall",
                    ObstacleKind::Boulder,
                    Rect::new(3.5, -0.6, 4.5, 0.4),
                )]
            }
            Terrain::DesertWasteland => vec![obstacle(
                "sandstone",
                ObstacleKind::Boulder,
                Rect::new(-4.5, -1.0, -3.5, 0.0),
            )],
            Terrain::UrbanRuins => vec![
                obstacle("broken wall", ObstacleKind::Wall, Rect::new(4.0, -3.0, 4.4, 1.0)),
                obstacle("column", ObstacleKind::Pillar, Rect::new(-2.2, 2.0, -1.6, 2.6)),
                obstacle("supply crate", ObstacleKind::Crate, Rect::new(1.5, 2.5, 2.3, 3.3)),
            ],
            Terrain::FrozenTundra => vec![obstacle(
                "ice hole",
                ObstacleKind::Water,
                Rect::new(3.0, -2.5, 4.5, -1.5),
            )],
            Terrain::VolcanicTerrain => vec![
                obstacle("lava pool", ObstacleKind::Lava, Rect::new(2.5, 1.0, 4.5, 2.5)),
                obstacle("basalt", ObstacleKind::Boulder, Rect::new(-4.0, -2.5, -3.2, -1.7)),
            ],
        };
        env
    }

    pub fn validate(&self) -> FightframeResult<()> {
        if !rect_is_valid(&self.bounds) {
            return Err(FightframeError::validation(format!(
                "environment '{}' bounds must be finite with positive area",
                self.name
            )));
        }
        for o in &self.obstacles {
            if !rect_is_valid(&o.bounds) {
                return Err(FightframeError::validation(format!(
                    "obstacle '{}' bounds must be finite with positive area",
                    o.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/character.rs"]
mod tests;
