//! Greedy fight-sequence assembly.

use crate::choreography::character::{CharacterDescriptor, Environment, ObstacleKind, Terrain};
use crate::choreography::moves::{
    CHOREOGRAPHY_FPS, EffectCue, EffectDescriptor, FightMove, INTERACTION_PREFIX,
    InteractionKind, Keyframe, MoveCategory, MoveKind, MoveLibrary, Pose,
};
use crate::choreography::physics::{Collider, CollisionPoint, PhysicsContext};
use crate::choreography::transition::generate_transition;
use crate::foundation::core::{Point, Vec2};
use crate::foundation::error::{FightframeError, FightframeResult};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Stamina regained per second spent in transitions.
const TRANSITION_REGEN_PER_SEC: f64 = 5.0;
/// Below this pool level recovery moves are favoured.
const LOW_STAMINA: f64 = 30.0;

/// Scoring profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Dynamic,
    Aggressive,
    Defensive,
    Cinematic,
}

impl Style {
    pub const ALL: [Self; 4] = [
        Self::Dynamic,
        Self::Aggressive,
        Self::Defensive,
        Self::Cinematic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dynamic => "dynamic",
            Self::Aggressive => "aggressive",
            Self::Defensive => "defensive",
            Self::Cinematic => "cinematic",
        }
    }

    fn category_weight(self, category: MoveCategory) -> f64 {
        use MoveCategory::*;
        match (self, category) {
            (Self::Dynamic, Attack) => 1.0,
            (Self::Dynamic, Defense) => 0.8,
            (Self::Dynamic, Special) => 0.9,
            (Self::Aggressive, Attack) => 1.3,
            (Self::Aggressive, Defense) => 0.5,
            (Self::Aggressive, Special) => 1.0,
            (Self::Defensive, Attack) => 0.6,
            (Self::Defensive, Defense) => 1.3,
            (Self::Defensive, Special) => 0.7,
            (Self::Cinematic, Attack) => 0.9,
            (Self::Cinematic, Defense) => 0.7,
            (Self::Cinematic, Special) => 1.3,
        }
    }

    /// Bonus per m/s of move momentum.
    fn momentum_affinity(self) -> f64 {
        match self {
            Self::Dynamic => 0.1,
            Self::Aggressive => 0.05,
            Self::Defensive => 0.0,
            Self::Cinematic => 0.2,
        }
    }

    /// Bonus per attached effect.
    fn spectacle(self) -> f64 {
        match self {
            Self::Cinematic => 0.05,
            _ => 0.0,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = FightframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FightframeError::validation(format!("unknown choreography style '{s}'")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreographyOpts {
    /// Upper bound on selection turns before giving up with `ChoreographyExhausted`.
    ///
    /// This counts turns, not moves or seconds: each turn places one library move plus its
    /// transition and contact overlays. Long target durations need a proportionally larger cap;
    /// the default covers roughly two hours of timeline with the builtin library.
    pub max_iterations: usize,
    pub default_style: Style,
}

impl Default for ChoreographyOpts {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            default_style: Style::Dynamic,
        }
    }
}

impl ChoreographyOpts {
    pub fn validate(&self) -> FightframeResult<()> {
        if self.max_iterations == 0 {
            return Err(FightframeError::validation(
                "choreography max_iterations must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Timeline record of a collision overlay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInteraction {
    /// Seconds from sequence start to the contact.
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub effects: Vec<EffectDescriptor>,
}

/// A compiled, immutable fight sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatSequence {
    /// Playback order.
    pub moves: Vec<FightMove>,
    /// Indices into `moves` of synthesized transitions.
    pub transitions: Vec<usize>,
    pub environment_interactions: Vec<EnvironmentInteraction>,
    /// Every move's effects, in move order.
    pub effects: Vec<EffectDescriptor>,
    /// Sum of all move durations, overlays included.
    pub duration: f64,
}

impl CombatSequence {
    pub fn transition_moves(&self) -> impl Iterator<Item = &FightMove> {
        self.transitions.iter().filter_map(|&i| self.moves.get(i))
    }

    /// Playback length: overlays run concurrently and are excluded.
    pub fn timeline_duration(&self) -> f64 {
        self.moves
            .iter()
            .filter(|m| !m.is_environment_interaction())
            .map(|m| m.duration)
            .sum()
    }
}

/// Summary of the sequence built so far, folded move by move.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SequenceState {
    pub last_pose: Pose,
    pub last_move: Option<String>,
    pub last_category: Option<MoveCategory>,
    /// Consecutive selections of `last_move`.
    pub repeat: u32,
    pub momentum: f64,
    pub stamina: f64,
    pub max_stamina: f64,
    /// Index of the most recent non-overlay move.
    pub last_timeline: Option<usize>,
    pub elapsed: f64,
}

impl SequenceState {
    pub(crate) fn new(start: Pose, max_stamina: f64) -> Self {
        Self {
            last_pose: start,
            last_move: None,
            last_category: None,
            repeat: 0,
            momentum: 0.0,
            stamina: max_stamina,
            max_stamina,
            last_timeline: None,
            elapsed: 0.0,
        }
    }

    /// Fold the move appended at `index`.
    pub(crate) fn observe(&mut self, index: usize, mv: &FightMove) {
        match mv.kind {
            MoveKind::EnvironmentInteraction { .. } => {}
            MoveKind::Transition => {
                self.stamina = (self.stamina + TRANSITION_REGEN_PER_SEC * mv.duration)
                    .min(self.max_stamina);
                self.last_pose = mv.last_pose();
                self.last_timeline = Some(index);
                self.elapsed += mv.duration;
            }
            MoveKind::Library(category) => {
                if self.last_move.as_deref() == Some(mv.name.as_str()) {
                    self.repeat += 1;
                } else {
                    self.repeat = 1;
                    self.last_move = Some(mv.name.clone());
                }
                self.last_category = Some(category);
                self.momentum = mv.momentum();
                self.stamina = (self.stamina - mv.stamina_cost).clamp(0.0, self.max_stamina);
                self.last_pose = mv.last_pose();
                self.last_timeline = Some(index);
                self.elapsed += mv.duration;
            }
        }
    }
}

/// Builds combat sequences from a move library against a shared physics session.
#[derive(Clone, Debug)]
pub struct FightChoreographer {
    library: MoveLibrary,
    physics: Arc<PhysicsContext>,
    opts: ChoreographyOpts,
}

impl FightChoreographer {
    pub fn new(
        library: MoveLibrary,
        physics: Arc<PhysicsContext>,
        opts: ChoreographyOpts,
    ) -> FightframeResult<Self> {
        opts.validate()?;
        Ok(Self {
            library,
            physics,
            opts,
        })
    }

    pub fn with_builtin_library(
        physics: Arc<PhysicsContext>,
        opts: ChoreographyOpts,
    ) -> FightframeResult<Self> {
        Self::new(MoveLibrary::builtin()?, physics, opts)
    }

    pub fn library(&self) -> &MoveLibrary {
        &self.library
    }

    pub fn opts(&self) -> &ChoreographyOpts {
        &self.opts
    }

    /// Assemble moves until the timeline reaches `duration` seconds.
    ///
    /// Each non-first selection is preceded by a synthesized transition. Collision overlays are
    /// appended after the move that caused them and do not advance the timeline.
    #[tracing::instrument(skip_all, fields(characters = characters.len(), duration = duration, style = %style))]
    pub fn generate_fight_sequence(
        &self,
        characters: &[CharacterDescriptor],
        environment: &Environment,
        duration: f64,
        style: Style,
    ) -> FightframeResult<CombatSequence> {
        if characters.is_empty() {
            return Err(FightframeError::validation(
                "at least one character is required",
            ));
        }
        for c in characters {
            c.validate()?;
        }
        environment.validate()?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(FightframeError::validation(format!(
                "target duration must be finite and > 0 (got {duration})"
            )));
        }

        let pool = characters
            .iter()
            .map(|c| c.stamina)
            .fold(0.0_f64, f64::max);
        let start = Pose {
            root: self
                .physics
                .clamp_to_arena(environment.bounds.center(), environment),
            ..Pose::default()
        };
        let mut state = SequenceState::new(start, pool);
        let mut moves: Vec<FightMove> = Vec::new();
        let mut turns = 0usize;

        while state.elapsed < duration {
            turns += 1;
            if turns > self.opts.max_iterations {
                return Err(FightframeError::exhausted(format!(
                    "gave up after {} turns (choreography.max_iterations) at {:.2}s of {duration:.2}s",
                    self.opts.max_iterations, state.elapsed
                )));
            }

            let pick = self.select_next_move(characters, &state, environment, style)?;
            let placed = pick.placed_at(self.origin_for(&pick, &state, environment));

            if let Some(prev) = state.last_timeline.and_then(|i| moves.get(i)) {
                let bridge = generate_transition(prev, &placed);
                moves.push(bridge);
                let i = moves.len() - 1;
                state.observe(i, &moves[i]);
            }

            let contacts = self
                .physics
                .detect_collisions(&placed.keyframes, environment);
            moves.push(placed);
            let i = moves.len() - 1;
            state.observe(i, &moves[i]);

            for contact in &contacts {
                let overlay = self.environment_interaction(contact, environment);
                tracing::debug!(name = %overlay.name, time = contact.time, "environment contact");
                moves.push(overlay);
                let i = moves.len() - 1;
                state.observe(i, &moves[i]);
            }
        }

        let seq = compile_sequence(moves);
        tracing::info!(
            moves = seq.moves.len(),
            transitions = seq.transitions.len(),
            interactions = seq.environment_interactions.len(),
            duration = seq.duration,
            "fight sequence generated"
        );
        Ok(seq)
    }

    /// Highest-scoring eligible move; the first registered wins ties.
    pub(crate) fn select_next_move(
        &self,
        characters: &[CharacterDescriptor],
        state: &SequenceState,
        environment: &Environment,
        style: Style,
    ) -> FightframeResult<Arc<FightMove>> {
        let mut best: Option<(&Arc<FightMove>, f64)> = None;
        for mv in self.library.iter() {
            if !self.is_eligible(mv, characters, state) {
                continue;
            }
            let score = self.score(mv, state, environment, style);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((mv, score));
            }
        }
        best.map(|(mv, _)| Arc::clone(mv)).ok_or_else(|| {
            FightframeError::exhausted(format!(
                "no move satisfies the requirements (stamina pool {:.1})",
                state.stamina
            ))
        })
    }

    fn is_eligible(
        &self,
        mv: &FightMove,
        characters: &[CharacterDescriptor],
        state: &SequenceState,
    ) -> bool {
        (mv.stamina_cost <= 0.0 || mv.stamina_cost <= state.stamina)
            && mv.performer(characters, state.stamina).is_some()
    }

    pub(crate) fn score(
        &self,
        mv: &FightMove,
        state: &SequenceState,
        environment: &Environment,
        style: Style,
    ) -> f64 {
        let Some(category) = mv.category() else {
            return f64::NEG_INFINITY;
        };
        let mut score = style.category_weight(category);

        if state.last_move.as_deref() == Some(mv.name.as_str()) {
            score -= 0.5 * f64::from(state.repeat);
        }
        if state.last_category == Some(category) {
            score -= 0.15;
        }

        let momentum = mv.momentum();
        score += style.momentum_affinity() * momentum;
        // Slippery ground punishes fast moves, more so right after another fast one.
        score -= (1.0 - environment.terrain.traction()) * 0.2 * (momentum + state.momentum);

        let origin = self.physics.clamp_to_arena(state.last_pose.root, environment);
        if mv.displacement().hypot() > self.physics.room_from(origin, environment) {
            score -= 0.4;
        }

        if state.stamina < LOW_STAMINA && mv.stamina_cost < 0.0 {
            score += 0.6;
        }
        score + style.spectacle() * mv.effects.len() as f64
    }

    /// Start point for `mv`: the previous end pose, pulled back when the move would leave the arena.
    fn origin_for(&self, mv: &FightMove, state: &SequenceState, env: &Environment) -> Point {
        let origin = self.physics.clamp_to_arena(state.last_pose.root, env);
        let travel = mv.displacement();
        let need = travel.hypot() - self.physics.room_from(origin, env);
        if need <= 0.0 || travel.hypot() == 0.0 {
            return origin;
        }
        let back: Vec2 = -travel.normalize() * need;
        self.physics.clamp_to_arena(origin + back, env)
    }

    fn environment_interaction(&self, contact: &CollisionPoint, env: &Environment) -> FightMove {
        let kind = match contact.collider {
            Collider::Boundary => InteractionKind::Boundary,
            Collider::Ground => InteractionKind::Ground,
            Collider::Obstacle(i) => InteractionKind::Obstacle(
                env.obstacles
                    .get(i)
                    .map_or(ObstacleKind::Wall, |o| o.kind),
            ),
        };
        let duration = (0.25 + 0.05 * contact.speed).clamp(0.25, 0.75);
        let end = (duration * CHOREOGRAPHY_FPS).round() as u32;
        let intensity = (contact.speed / 6.0).clamp(0.1, 1.0);
        let at = Pose {
            root: contact.point,
            ..Pose::default()
        };

        let effects = interaction_cues(kind, env.terrain, contact.speed)
            .into_iter()
            .map(|cue| EffectDescriptor {
                cue,
                frame: 0,
                intensity,
            })
            .collect();

        FightMove {
            name: format!("{INTERACTION_PREFIX}{}", kind.tag()),
            kind: MoveKind::EnvironmentInteraction {
                kind,
                contact_time: contact.time,
            },
            duration,
            keyframes: vec![
                Keyframe::new(0, at),
                Keyframe::new(end / 2, at.with_height(0.05 * intensity)),
                Keyframe::new(end, at),
            ],
            impact_frames: smallvec![0],
            requirements: Vec::new(),
            effects,
            stamina_cost: 0.0,
        }
    }
}

fn interaction_cues(kind: InteractionKind, terrain: Terrain, speed: f64) -> Vec<EffectCue> {
    let mut cues = match kind {
        InteractionKind::Boundary => vec![EffectCue::Debris],
        InteractionKind::Ground => match terrain {
            Terrain::VolcanicTerrain => vec![EffectCue::Embers, EffectCue::DustBurst],
            Terrain::FrozenTundra => vec![EffectCue::Debris],
            _ => vec![EffectCue::DustBurst],
        },
        InteractionKind::Obstacle(ObstacleKind::Water) => vec![EffectCue::Splash],
        InteractionKind::Obstacle(ObstacleKind::Lava) => vec![EffectCue::Embers],
        InteractionKind::Obstacle(_) => vec![EffectCue::Debris, EffectCue::ImpactFlash],
    };
    if speed > 4.0 {
        cues.push(EffectCue::ScreenShake);
    }
    cues
}

/// Flatten appended moves into a `CombatSequence`.
pub(crate) fn compile_sequence(moves: Vec<FightMove>) -> CombatSequence {
    let mut transitions = Vec::new();
    let mut environment_interactions = Vec::new();
    let mut effects = Vec::new();
    let mut duration = 0.0;
    let mut clock = 0.0;
    let mut trigger_start = 0.0;

    for (i, mv) in moves.iter().enumerate() {
        duration += mv.duration;
        effects.extend_from_slice(&mv.effects);
        match mv.kind {
            MoveKind::Transition => {
                transitions.push(i);
                clock += mv.duration;
            }
            MoveKind::Library(_) => {
                trigger_start = clock;
                clock += mv.duration;
            }
            MoveKind::EnvironmentInteraction { kind, contact_time } => {
                environment_interactions.push(EnvironmentInteraction {
                    time: trigger_start + contact_time,
                    kind,
                    effects: mv.effects.clone(),
                });
            }
        }
    }

    CombatSequence {
        moves,
        transitions,
        environment_interactions,
        effects,
        duration,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/choreographer.rs"]
mod tests;
