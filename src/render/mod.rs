//! Animation render pipeline: keyframes, interpolation, effects and encoding.

pub mod effects;
pub mod frame;
pub mod interpolate;
pub mod keyframes;
pub mod pipeline;
pub mod scene;

pub use effects::{EffectChain, EffectKind, EffectsMode};
pub use frame::FrameRGBA;
pub use interpolate::interpolate_frames;
pub use keyframes::{KeyframeModel, ProceduralKeyframes, scene_elements};
pub use pipeline::{AnimationGenerator, ProgressObserver, RenderOpts, RenderOutput};
pub use scene::{RenderPreset, SceneData};
