//! Move templates and the category-indexed move library.

use crate::choreography::character::{
    CharacterClass, CharacterDescriptor, ObstacleKind, Weapon,
};
use crate::foundation::core::{Point, Vec2};
use crate::foundation::error::{FightframeError, FightframeResult};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Frame rate assumed for move keyframes and synthesized transitions.
pub const CHOREOGRAPHY_FPS: f64 = 60.0;

pub(crate) const TRANSITION_PREFIX: &str = "transition_";
pub(crate) const INTERACTION_PREFIX: &str = "env_interaction_";

/// Library bucket a move belongs to. Ordering is the library iteration order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MoveCategory {
    Attack,
    Defense,
    Special,
}

/// Ground-plane pose snapshot of the acting fighter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Root position on the ground plane, meters.
    pub root: Point,
    /// Height above ground, meters. Zero means grounded.
    #[serde(default)]
    pub height: f64,
    /// Facing angle, radians.
    #[serde(default)]
    pub facing: f64,
}

impl Pose {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            root: Point::new(x, y),
            height: 0.0,
            facing: 0.0,
        }
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_facing(mut self, facing: f64) -> Self {
        self.facing = facing;
        self
    }

    pub fn translated(mut self, offset: Vec2) -> Self {
        self.root += offset;
        self
    }

    fn is_finite(&self) -> bool {
        self.root.x.is_finite()
            && self.root.y.is_finite()
            && self.height.is_finite()
            && self.facing.is_finite()
    }
}

/// A sampled pose at `frame` (60 fps, relative to the move start).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: u32,
    pub pose: Pose,
}

impl Keyframe {
    pub fn new(frame: u32, pose: Pose) -> Self {
        Self { frame, pose }
    }

    pub fn time(&self) -> f64 {
        f64::from(self.frame) / CHOREOGRAPHY_FPS
    }
}

/// Precondition a character (or the shared stamina pool) must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Shared stamina pool must hold at least this much.
    MinStamina(f64),
    MinAttack(u32),
    MinDefense(u32),
    MinHealth(u32),
    Weapon(Weapon),
    Class(CharacterClass),
    /// The performer must have any special ability.
    SpecialAbility,
}

impl Requirement {
    /// Per-character check. Pool requirements always pass here.
    pub fn met_by(&self, c: &CharacterDescriptor) -> bool {
        match *self {
            Self::MinStamina(_) => true,
            Self::MinAttack(v) => c.attack >= v,
            Self::MinDefense(v) => c.defense >= v,
            Self::MinHealth(v) => c.health >= v,
            Self::Weapon(w) => c.weapon == w,
            Self::Class(k) => c.class == k,
            Self::SpecialAbility => c.special_ability.is_some(),
        }
    }
}

/// Visual cue attached to a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCue {
    MotionTrail,
    ImpactFlash,
    Sparks,
    Shockwave,
    DustBurst,
    Debris,
    Splash,
    Embers,
    ScreenShake,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    pub cue: EffectCue,
    /// Keyframe-space frame (60 fps) where the cue fires.
    pub frame: u32,
    pub intensity: f64,
}

/// What an environment contact hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Boundary,
    Ground,
    Obstacle(ObstacleKind),
}

impl InteractionKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Boundary => "boundary",
            Self::Ground => "ground",
            Self::Obstacle(kind) => kind.tag(),
        }
    }
}

/// Origin of a move in a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Library(MoveCategory),
    Transition,
    /// Overlay triggered by a collision `contact_time` seconds into the triggering move.
    EnvironmentInteraction {
        kind: InteractionKind,
        contact_time: f64,
    },
}

/// An immutable, keyframed fight move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FightMove {
    pub name: String,
    pub kind: MoveKind,
    /// Seconds, finite and `>= 0`.
    pub duration: f64,
    /// Non-empty, strictly increasing by frame.
    pub keyframes: Vec<Keyframe>,
    /// Indices into `keyframes` marking contact events.
    pub impact_frames: SmallVec<[usize; 4]>,
    pub requirements: Vec<Requirement>,
    pub effects: Vec<EffectDescriptor>,
    /// Stamina drawn from the shared pool. Negative values recover stamina.
    pub stamina_cost: f64,
}

impl FightMove {
    pub fn category(&self) -> Option<MoveCategory> {
        match self.kind {
            MoveKind::Library(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self.kind, MoveKind::Transition)
    }

    pub fn is_environment_interaction(&self) -> bool {
        matches!(self.kind, MoveKind::EnvironmentInteraction { .. })
    }

    pub fn first_pose(&self) -> Pose {
        self.keyframes.first().map(|k| k.pose).unwrap_or_default()
    }

    pub fn last_pose(&self) -> Pose {
        self.keyframes.last().map(|k| k.pose).unwrap_or_default()
    }

    /// Root travel from first to last keyframe.
    pub fn displacement(&self) -> Vec2 {
        self.last_pose().root - self.first_pose().root
    }

    /// Average root speed over the move, meters per second.
    pub fn momentum(&self) -> f64 {
        self.displacement().hypot() / self.duration.max(1.0 / CHOREOGRAPHY_FPS)
    }

    /// Copy of this move with every keyframe shifted so local space starts at `origin`.
    pub fn placed_at(&self, origin: Point) -> FightMove {
        let offset = origin.to_vec2();
        let mut placed = self.clone();
        for k in &mut placed.keyframes {
            k.pose = k.pose.translated(offset);
        }
        placed
    }

    /// First character able to perform this move given the shared `stamina` pool.
    pub fn performer(&self, characters: &[CharacterDescriptor], stamina: f64) -> Option<usize> {
        let pool_ok = self.requirements.iter().all(|r| match *r {
            Requirement::MinStamina(min) => stamina >= min,
            _ => true,
        });
        if !pool_ok {
            return None;
        }
        characters
            .iter()
            .position(|c| self.requirements.iter().all(|r| r.met_by(c)))
    }

    pub(crate) fn validate(&self) -> FightframeResult<()> {
        let err = |msg: &str| {
            Err(FightframeError::validation(format!(
                "move '{}': {msg}",
                self.name
            )))
        };
        if self.name.trim().is_empty() {
            return Err(FightframeError::validation("move name must be non-empty"));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return err("duration must be finite and >= 0");
        }
        if !self.stamina_cost.is_finite() {
            return err("stamina_cost must be finite");
        }
        if self.keyframes.is_empty() {
            return err("at least one keyframe is required");
        }
        if self.keyframes.iter().any(|k| !k.pose.is_finite()) {
            return err("keyframe poses must be finite");
        }
        if self.keyframes.windows(2).any(|w| w[1].frame <= w[0].frame) {
            return err("keyframes must be strictly increasing by frame");
        }
        if let Some(&bad) = self
            .impact_frames
            .iter()
            .find(|&&i| i >= self.keyframes.len())
        {
            return err(&format!("impact frame {bad} is outside the keyframes"));
        }
        if self
            .effects
            .iter()
            .any(|e| !e.intensity.is_finite() || e.intensity < 0.0)
        {
            return err("effect intensity must be finite and >= 0");
        }
        Ok(())
    }
}

/// Builder for library moves.
#[derive(Clone, Debug)]
pub struct MoveBuilder {
    mv: FightMove,
}

impl MoveBuilder {
    pub fn new(name: impl Into<String>, category: MoveCategory) -> Self {
        Self {
            mv: FightMove {
                name: name.into(),
                kind: MoveKind::Library(category),
                duration: 0.0,
                keyframes: Vec::new(),
                impact_frames: SmallVec::new(),
                requirements: Vec::new(),
                effects: Vec::new(),
                stamina_cost: 0.0,
            },
        }
    }

    pub fn duration(mut self, secs: f64) -> Self {
        self.mv.duration = secs;
        self
    }

    pub fn keyframe(mut self, frame: u32, pose: Pose) -> Self {
        self.mv.keyframes.push(Keyframe::new(frame, pose));
        self
    }

    pub fn impact(mut self, keyframe_index: usize) -> Self {
        self.mv.impact_frames.push(keyframe_index);
        self
    }

    pub fn requires(mut self, req: Requirement) -> Self {
        self.mv.requirements.push(req);
        self
    }

    pub fn effect(mut self, cue: EffectCue, frame: u32, intensity: f64) -> Self {
        self.mv.effects.push(EffectDescriptor {
            cue,
            frame,
            intensity,
        });
        self
    }

    pub fn stamina(mut self, cost: f64) -> Self {
        self.mv.stamina_cost = cost;
        self
    }

    pub fn build(self) -> FightframeResult<FightMove> {
        self.mv.validate()?;
        Ok(self.mv)
    }
}

/// On-disk shape of one library move; the category comes from the enclosing map key.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct MoveDef {
    name: String,
    duration: f64,
    keyframes: Vec<Keyframe>,
    #[serde(default)]
    impact_frames: Vec<usize>,
    #[serde(default)]
    requirements: Vec<Requirement>,
    #[serde(default)]
    effects: Vec<EffectDescriptor>,
    #[serde(default)]
    stamina_cost: f64,
}

/// Move templates grouped by category.
///
/// Iteration visits attacks, then defenses, then specials, each in registration order. The
/// choreographer relies on that order for deterministic tie-breaking.
#[derive(Clone, Debug, Default)]
pub struct MoveLibrary {
    by_category: BTreeMap<MoveCategory, Vec<Arc<FightMove>>>,
}

impl MoveLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library move. Names are unique across categories.
    pub fn register(&mut self, mv: FightMove) -> FightframeResult<()> {
        let Some(category) = mv.category() else {
            return Err(FightframeError::validation(format!(
                "move '{}' is not a library move",
                mv.name
            )));
        };
        mv.validate()?;
        if self.get(&mv.name).is_some() {
            return Err(FightframeError::validation(format!(
                "move '{}' is already registered",
                mv.name
            )));
        }
        self.by_category
            .entry(category)
            .or_default()
            .push(Arc::new(mv));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<FightMove>> {
        self.iter().find(|m| m.name == name)
    }

    pub fn moves(&self, category: MoveCategory) -> &[Arc<FightMove>] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FightMove>> {
        self.by_category.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a `{ "attack": [...], "defense": [...], "special": [...] }` document.
    pub fn from_json_str(json: &str) -> FightframeResult<Self> {
        let defs: BTreeMap<MoveCategory, Vec<MoveDef>> = serde_json::from_str(json)?;
        let mut lib = Self::new();
        for (category, moves) in defs {
            for def in moves {
                lib.register(FightMove {
                    name: def.name,
                    kind: MoveKind::Library(category),
                    duration: def.duration,
                    keyframes: def.keyframes,
                    impact_frames: def.impact_frames.into_iter().collect(),
                    requirements: def.requirements,
                    effects: def.effects,
                    stamina_cost: def.stamina_cost,
                })?;
            }
        }
        Ok(lib)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FightframeResult<Self> {
        use anyhow::Context as _;
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read move library '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Stock library covering every category.
    pub fn builtin() -> FightframeResult<Self> {
        let mut lib = Self::new();
        for mv in builtin_moves()? {
            lib.register(mv)?;
        }
        Ok(lib)
    }
}

fn frames(secs: f64) -> u32 {
    (secs * CHOREOGRAPHY_FPS).round() as u32
}

/// Straight strike: wind-up, extension to `reach`, recovery to `settle`.
fn strike(name: &str, duration: f64, reach: f64, settle: f64) -> MoveBuilder {
    let end = frames(duration);
    MoveBuilder::new(name, MoveCategory::Attack)
        .duration(duration)
        .keyframe(0, Pose::at(0.0, 0.0))
        .keyframe(end * 2 / 5, Pose::at(reach * 0.7, 0.0))
        .keyframe(end * 3 / 5, Pose::at(reach, 0.0))
        .keyframe(end, Pose::at(settle, 0.0))
        .impact(2)
}

fn builtin_moves() -> FightframeResult<Vec<FightMove>> {
    use std::f64::consts::PI;
    use EffectCue::*;

    Ok(vec![
        strike("jab", 0.35, 0.4, 0.2)
            .stamina(6.0)
            .effect(MotionTrail, 8, 0.3)
            .effect(ImpactFlash, 13, 0.5)
            .build()?,
        strike("cross", 0.45, 0.7, 0.4)
            .stamina(8.0)
            .requires(Requirement::MinStamina(10.0))
            .effect(MotionTrail, 11, 0.4)
            .effect(ImpactFlash, 16, 0.7)
            .build()?,
        strike("overhead_cleave", 0.8, 0.9, 0.6)
            .stamina(18.0)
            .requires(Requirement::MinAttack(12))
            .requires(Requirement::MinStamina(20.0))
            .effect(Sparks, 29, 0.8)
            .effect(ScreenShake, 29, 0.4)
            .build()?,
        MoveBuilder::new("spinning_slash", MoveCategory::Attack)
            .duration(0.9)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(18, Pose::at(0.25, 0.0).with_facing(PI))
            .keyframe(36, Pose::at(0.5, 0.0).with_facing(2.0 * PI))
            .keyframe(54, Pose::at(0.5, 0.0).with_facing(2.0 * PI))
            .impact(1)
            .impact(2)
            .requires(Requirement::MinStamina(25.0))
            .stamina(20.0)
            .effect(MotionTrail, 18, 0.9)
            .effect(ImpactFlash, 36, 0.6)
            .build()?,
        MoveBuilder::new("flying_kick", MoveCategory::Attack)
            .duration(0.7)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(12, Pose::at(0.6, 0.0).with_height(0.8))
            .keyframe(24, Pose::at(1.4, 0.0).with_height(1.0))
            .keyframe(42, Pose::at(1.8, 0.0))
            .impact(2)
            .requires(Requirement::MinAttack(8))
            .requires(Requirement::MinStamina(30.0))
            .stamina(22.0)
            .effect(MotionTrail, 12, 0.7)
            .effect(ImpactFlash, 24, 0.9)
            .build()?,
        strike("arrow_volley", 0.9, 0.0, -0.3)
            .requires(Requirement::Weapon(Weapon::Bow))
            .requires(Requirement::MinStamina(12.0))
            .stamina(12.0)
            .effect(MotionTrail, 32, 0.5)
            .build()?,
        MoveBuilder::new("guard", MoveCategory::Defense)
            .duration(0.4)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(12, Pose::at(-0.1, 0.0))
            .keyframe(24, Pose::at(-0.1, 0.0))
            .stamina(-12.0)
            .build()?,
        MoveBuilder::new("parry", MoveCategory::Defense)
            .duration(0.35)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(9, Pose::at(0.05, 0.0).with_facing(-0.3))
            .keyframe(21, Pose::at(0.0, 0.0))
            .impact(1)
            .requires(Requirement::MinDefense(8))
            .stamina(-6.0)
            .effect(Sparks, 9, 0.6)
            .build()?,
        MoveBuilder::new("sidestep", MoveCategory::Defense)
            .duration(0.5)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(15, Pose::at(0.0, 0.5))
            .keyframe(30, Pose::at(0.0, 0.7))
            .stamina(-8.0)
            .effect(DustBurst, 15, 0.2)
            .build()?,
        MoveBuilder::new("backflip", MoveCategory::Defense)
            .duration(0.8)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(16, Pose::at(-0.5, 0.0).with_height(1.2).with_facing(PI))
            .keyframe(32, Pose::at(-1.0, 0.0).with_height(0.6).with_facing(2.0 * PI))
            .keyframe(48, Pose::at(-1.2, 0.0).with_facing(2.0 * PI))
            .requires(Requirement::MinStamina(15.0))
            .stamina(4.0)
            .effect(MotionTrail, 16, 0.5)
            .build()?,
        MoveBuilder::new("lightning_strike", MoveCategory::Special)
            .duration(1.2)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(30, Pose::at(0.0, 0.0).with_height(0.3))
            .keyframe(48, Pose::at(0.2, 0.0))
            .keyframe(72, Pose::at(0.2, 0.0))
            .impact(2)
            .requires(Requirement::SpecialAbility)
            .requires(Requirement::MinStamina(40.0))
            .stamina(35.0)
            .effect(ImpactFlash, 48, 1.0)
            .effect(Shockwave, 48, 0.8)
            .effect(ScreenShake, 50, 0.6)
            .build()?,
        MoveBuilder::new("whirlwind", MoveCategory::Special)
            .duration(1.4)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(28, Pose::at(0.6, 0.3).with_facing(2.0 * PI))
            .keyframe(56, Pose::at(1.2, 0.0).with_facing(4.0 * PI))
            .keyframe(84, Pose::at(1.3, 0.0).with_facing(4.0 * PI))
            .impact(1)
            .impact(2)
            .requires(Requirement::Class(CharacterClass::Berserker))
            .requires(Requirement::MinStamina(45.0))
            .stamina(40.0)
            .effect(MotionTrail, 28, 1.0)
            .effect(DustBurst, 56, 0.7)
            .build()?,
        MoveBuilder::new("shadow_step", MoveCategory::Special)
            .duration(0.6)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(12, Pose::at(1.0, 0.4))
            .keyframe(24, Pose::at(2.0, 0.0).with_facing(PI))
            .keyframe(36, Pose::at(2.0, 0.0).with_facing(PI))
            .impact(2)
            .requires(Requirement::Class(CharacterClass::Assassin))
            .requires(Requirement::MinStamina(25.0))
            .stamina(25.0)
            .effect(MotionTrail, 12, 0.8)
            .build()?,
        MoveBuilder::new("ground_slam", MoveCategory::Special)
            .duration(1.0)
            .keyframe(0, Pose::at(0.0, 0.0))
            .keyframe(24, Pose::at(0.5, 0.0).with_height(1.5))
            .keyframe(40, Pose::at(0.8, 0.0))
            .keyframe(60, Pose::at(0.8, 0.0))
            .impact(2)
            .requires(Requirement::MinAttack(15))
            .requires(Requirement::MinStamina(35.0))
            .stamina(30.0)
            .effect(Shockwave, 40, 1.0)
            .effect(DustBurst, 40, 0.9)
            .effect(ScreenShake, 40, 0.8)
            .build()?,
    ])
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/moves.rs"]
mod tests;
