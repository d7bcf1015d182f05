use crate::choreography::moves::{
    FightMove, Keyframe, MoveKind, Pose, TRANSITION_PREFIX,
};
use crate::foundation::math::lerp;
use smallvec::SmallVec;
use std::f64::consts::PI;

/// Root travel allowed per 60 fps frame while bridging two moves.
const STRIDE_PER_FRAME: f64 = 0.05;
/// Turn rate allowed per frame.
const TURN_PER_FRAME: f64 = PI / 30.0;
/// Vertical travel allowed per frame.
const RISE_PER_FRAME: f64 = 0.08;

pub(crate) const MIN_TRANSITION_FRAMES: u32 = 4;
pub(crate) const MAX_TRANSITION_FRAMES: u32 = 30;

fn in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
    }
}

/// Shortest signed angle taking `from` to `to`.
fn angle_delta(from: f64, to: f64) -> f64 {
    (to - from + PI).rem_euclid(2.0 * PI) - PI
}

/// Frames needed to travel between two poses at the bridging limits.
pub(crate) fn transition_frames(from: &Pose, to: &Pose) -> u32 {
    let travel = (to.root - from.root).hypot() / STRIDE_PER_FRAME;
    let turn = angle_delta(from.facing, to.facing).abs() / TURN_PER_FRAME;
    let rise = (to.height - from.height).abs() / RISE_PER_FRAME;
    let needed = travel.max(turn).max(rise).ceil();
    (needed as u32).clamp(MIN_TRANSITION_FRAMES, MAX_TRANSITION_FRAMES)
}

/// Synthesize a move bridging the last keyframe of `prev` into the first keyframe of `next`.
///
/// The path is eased and sampled at 60 fps; the final keyframe lands exactly on `next`'s first
/// pose, and the duration equals `keyframes.len() / 60`.
pub(crate) fn generate_transition(prev: &FightMove, next: &FightMove) -> FightMove {
    let from = prev.last_pose();
    let to = next.first_pose();
    let frames = transition_frames(&from, &to);
    let turn = angle_delta(from.facing, to.facing);

    let keyframes: Vec<Keyframe> = (0..frames)
        .map(|i| {
            let t = in_out_cubic(f64::from(i + 1) / f64::from(frames));
            let pose = if i + 1 == frames {
                to
            } else {
                Pose {
                    root: from.root.lerp(to.root, t),
                    height: lerp(from.height, to.height, t),
                    facing: from.facing + turn * t,
                }
            };
            Keyframe::new(i, pose)
        })
        .collect();

    FightMove {
        name: format!("{TRANSITION_PREFIX}{}_to_{}", prev.name, next.name),
        kind: MoveKind::Transition,
        duration: keyframes.len() as f64 / crate::choreography::moves::CHOREOGRAPHY_FPS,
        keyframes,
        impact_frames: SmallVec::new(),
        requirements: Vec::new(),
        effects: Vec::new(),
        stamina_cost: 0.0,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/transition.rs"]
mod tests;
