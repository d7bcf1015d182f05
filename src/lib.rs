//! fightframe generates fight choreography and renders combat animations.
//!
//! - Build a [`CombatSequence`] from characters and an arena with [`FightChoreographer`]
//! - Render a scene description to PNG frames or MP4 with [`AnimationGenerator`]
//! - Track render jobs for stored animations through [`AnimationService`]
#![forbid(unsafe_code)]

pub mod choreography;
pub mod config;
pub mod encode;
pub mod foundation;
pub mod jobs;
pub mod render;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, Point, Rect, Vec2};
pub use crate::foundation::error::{FightframeError, FightframeResult, RenderStage};

pub use crate::choreography::{
    CharacterDescriptor, CombatSequence, Environment, FightChoreographer, FightMove, MoveLibrary,
    PhysicsContext, Style,
};
pub use crate::config::EngineConfig;
pub use crate::encode::{FfmpegSink, FfmpegSinkOpts, FrameSink, InMemorySink, PngSequenceSink};
pub use crate::jobs::{AnimationService, AnimationStore, JobDispatcher};
pub use crate::render::{AnimationGenerator, FrameRGBA, ProgressObserver, SceneData};
