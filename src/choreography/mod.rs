//! Fight choreography: characters, moves, collision queries and sequence assembly.

pub mod character;
pub mod choreographer;
pub mod moves;
pub mod physics;
pub mod scenario;
mod transition;

pub use character::{
    CharacterClass, CharacterDescriptor, Environment, Obstacle, ObstacleKind, SpecialAbility,
    Terrain, Weapon,
};
pub use choreographer::{
    ChoreographyOpts, CombatSequence, EnvironmentInteraction, FightChoreographer, Style,
};
pub use moves::{
    EffectCue, EffectDescriptor, FightMove, InteractionKind, Keyframe, MoveBuilder, MoveCategory,
    MoveKind, MoveLibrary, Pose, Requirement,
};
pub use physics::{Collider, CollisionPoint, PhysicsContext, PhysicsSettings};
pub use scenario::{
    CombatOutcome, CombatScenario, Difficulty, Objective, ScenarioGenerator, simulate_combat,
};
