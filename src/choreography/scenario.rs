//! Seeded generation of combat scenarios and their quick resolution.

use crate::choreography::character::{
    CharacterClass, CharacterDescriptor, Environment, SpecialAbility, Terrain, Weapon,
};
use crate::foundation::error::{FightframeError, FightframeResult};
use crate::foundation::math::SplitMix64;
use serde::{Deserialize, Serialize};

const FIRST_NAMES: [&str; 12] = [
    "Aria", "Bram", "Cato", "Dagny", "Eska", "Fenn", "Gale", "Hild", "Ivo", "Jorun", "Kael",
    "Lysa",
];
const LAST_NAMES: [&str; 10] = [
    "Ashford", "Blackwood", "Crane", "Dunmore", "Emberly", "Frost", "Greaves", "Hale", "Ironside",
    "Vance",
];

/// Terrains a generated scenario may pick. The bare arena is reserved for explicit requests.
const SCENARIO_TERRAINS: [Terrain; 6] = [
    Terrain::DenseForest,
    Terrain::MountainPass,
    Terrain::DesertWasteland,
    Terrain::UrbanRuins,
    Terrain::FrozenTundra,
    Terrain::VolcanicTerrain,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    CaptureStrategicPoint,
    DefeatBossEnemy,
    SurviveWaveOfEnemies,
    ProtectVip,
    RetrieveArtifact,
    EliminateEnemyCommander,
}

impl Objective {
    pub const ALL: [Self; 6] = [
        Self::CaptureStrategicPoint,
        Self::DefeatBossEnemy,
        Self::SurviveWaveOfEnemies,
        Self::ProtectVip,
        Self::RetrieveArtifact,
        Self::EliminateEnemyCommander,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Legendary,
}

impl Difficulty {
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Legendary];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatScenario {
    pub environment: Environment,
    pub participants: Vec<CharacterDescriptor>,
    pub objective: Objective,
    pub difficulty: Difficulty,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub winner: CharacterDescriptor,
    pub combat_log: String,
}

/// Deterministic generator: the same seed yields the same scenarios.
#[derive(Clone, Debug)]
pub struct ScenarioGenerator {
    rng: SplitMix64,
}

impl ScenarioGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SplitMix64::new(seed),
        }
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> FightframeResult<T> {
        self.rng
            .choose(items)
            .copied()
            .ok_or_else(|| FightframeError::validation("cannot pick from an empty table"))
    }

    pub fn generate_character(&mut self) -> FightframeResult<CharacterDescriptor> {
        let first = self.pick(&FIRST_NAMES)?;
        let last = self.pick(&LAST_NAMES)?;
        Ok(CharacterDescriptor {
            name: format!("{first} {last}"),
            class: self.pick(&CharacterClass::ALL)?,
            weapon: self.pick(&Weapon::ALL)?,
            health: self.rng.range_u32(50, 200),
            attack: self.rng.range_u32(5, 25),
            defense: self.rng.range_u32(3, 20),
            stamina: 100.0,
            special_ability: Some(self.pick(&SpecialAbility::ALL)?),
        })
    }

    pub fn generate_combat_scenario(&mut self, participants: usize) -> FightframeResult<CombatScenario> {
        if participants == 0 {
            return Err(FightframeError::validation(
                "a scenario needs at least one participant",
            ));
        }
        let terrain = self.pick(&SCENARIO_TERRAINS)?;
        let participants = (0..participants)
            .map(|_| self.generate_character())
            .collect::<FightframeResult<Vec<_>>>()?;
        Ok(CombatScenario {
            environment: Environment::preset(terrain),
            participants,
            objective: self.pick(&Objective::ALL)?,
            difficulty: self.pick(&Difficulty::ALL)?,
        })
    }
}

/// Resolve a scenario by raw strength: the highest `attack + health` wins, earliest on ties.
pub fn simulate_combat(scenario: &CombatScenario) -> FightframeResult<CombatOutcome> {
    let mut best: Option<&CharacterDescriptor> = None;
    for c in &scenario.participants {
        let strength = |c: &CharacterDescriptor| u64::from(c.attack) + u64::from(c.health);
        if best.is_none_or(|b| strength(c) > strength(b)) {
            best = Some(c);
        }
    }
    let winner = best
        .cloned()
        .ok_or_else(|| FightframeError::validation("scenario has no participants"))?;
    let combat_log = format!("Combat in {} resolved!", scenario.environment.name);
    tracing::info!(winner = %winner.name, "{combat_log}");
    Ok(CombatOutcome { winner, combat_log })
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/scenario.rs"]
mod tests;
