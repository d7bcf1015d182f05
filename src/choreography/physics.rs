//! Rigid-body session settings and the collision queries the choreographer needs.

use crate::choreography::character::Environment;
use crate::choreography::moves::{CHOREOGRAPHY_FPS, Keyframe};
use crate::foundation::core::{Point, Rect};
use crate::foundation::error::{FightframeError, FightframeResult};
use crate::foundation::math::lerp;
use serde::{Deserialize, Serialize};

/// Simulation parameters for a physics session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Vertical acceleration, m/s^2 (negative is down).
    pub gravity: f64,
    /// Simulation step, seconds.
    pub timestep: f64,
    /// Upper bound on collision sub-steps between two keyframes.
    pub solver_iterations: u32,
    /// Contact distance, meters.
    pub collision_margin: f64,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            timestep: 1.0 / 240.0,
            solver_iterations: 10,
            collision_margin: 0.04,
        }
    }
}

impl PhysicsSettings {
    pub fn validate(&self) -> FightframeResult<()> {
        if !self.gravity.is_finite() {
            return Err(FightframeError::validation("physics gravity must be finite"));
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(FightframeError::validation("physics timestep must be > 0"));
        }
        if self.solver_iterations == 0 {
            return Err(FightframeError::validation(
                "physics solver_iterations must be >= 1",
            ));
        }
        if !self.collision_margin.is_finite() || self.collision_margin < 0.0 {
            return Err(FightframeError::validation(
                "physics collision_margin must be >= 0",
            ));
        }
        Ok(())
    }
}

/// What a contact was made with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collider {
    /// Left the arena bounds.
    Boundary,
    /// Landed after being airborne.
    Ground,
    /// Index into `Environment::obstacles`.
    Obstacle(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionPoint {
    pub collider: Collider,
    /// Keyframe at (or ending the segment of) first contact.
    pub keyframe: usize,
    pub point: Point,
    /// Seconds from the start of the move.
    pub time: f64,
    /// Closing speed at contact, m/s.
    pub speed: f64,
}

/// A headless physics session, created once and shared by reference.
#[derive(Clone, Debug)]
pub struct PhysicsContext {
    settings: PhysicsSettings,
    substeps: u32,
}

impl PhysicsContext {
    pub fn new(settings: &PhysicsSettings) -> FightframeResult<Self> {
        settings.validate()?;
        let per_frame = ((1.0 / CHOREOGRAPHY_FPS) / settings.timestep).ceil();
        let substeps = (per_frame as u32).clamp(1, settings.solver_iterations);
        tracing::debug!(substeps, gravity = settings.gravity, "physics session configured");
        Ok(Self {
            settings: settings.clone(),
            substeps,
        })
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Samples taken per keyframe segment during collision sweeps.
    pub fn substeps(&self) -> u32 {
        self.substeps
    }

    /// Landing speed after a free fall from `drop_height`.
    pub fn impact_speed(&self, drop_height: f64) -> f64 {
        (2.0 * self.settings.gravity.abs() * drop_height.max(0.0)).sqrt()
    }

    fn playable_area(&self, env: &Environment) -> Rect {
        let m = self.settings.collision_margin;
        let r = env.bounds;
        if r.width() <= 2.0 * m || r.height() <= 2.0 * m {
            let c = r.center();
            return Rect::new(c.x, c.y, c.x, c.y);
        }
        Rect::new(r.x0 + m, r.y0 + m, r.x1 - m, r.y1 - m)
    }

    /// Nearest point to `p` inside the playable area.
    pub fn clamp_to_arena(&self, p: Point, env: &Environment) -> Point {
        let area = self.playable_area(env);
        Point::new(p.x.clamp(area.x0, area.x1), p.y.clamp(area.y0, area.y1))
    }

    /// Distance from `p` to the closest arena edge, zero when outside.
    pub fn room_from(&self, p: Point, env: &Environment) -> f64 {
        let area = self.playable_area(env);
        let dx = (p.x - area.x0).min(area.x1 - p.x);
        let dy = (p.y - area.y0).min(area.y1 - p.y);
        dx.min(dy).max(0.0)
    }

    /// Sweep the root path through `keyframes` and report the first contact per collider.
    pub fn detect_collisions(&self, keyframes: &[Keyframe], env: &Environment) -> Vec<CollisionPoint> {
        let area = self.playable_area(env);
        let margin = self.settings.collision_margin;
        let grown: Vec<Rect> = env
            .obstacles
            .iter()
            .map(|o| o.bounds.inset(margin))
            .collect();

        let mut hits = Vec::<CollisionPoint>::new();
        let touch = |hits: &mut Vec<CollisionPoint>, keyframe: usize, p: Point, time: f64, speed: f64| {
            if !inside_closed(&area, p) {
                record_first(
                    hits,
                    CollisionPoint {
                        collider: Collider::Boundary,
                        keyframe,
                        point: p,
                        time,
                        speed,
                    },
                );
            }
            for (i, r) in grown.iter().enumerate() {
                if r.contains(p) {
                    record_first(
                        hits,
                        CollisionPoint {
                            collider: Collider::Obstacle(i),
                            keyframe,
                            point: p,
                            time,
                            speed,
                        },
                    );
                }
            }
        };

        let Some(first) = keyframes.first() else {
            return hits;
        };
        touch(&mut hits, 0, first.pose.root, first.time(), 0.0);

        let mut peak = first.pose.height.max(0.0);
        for (i, w) in keyframes.windows(2).enumerate() {
            let (a, b) = (&w[0], &w[1]);
            let dt = (b.time() - a.time()).max(1.0 / CHOREOGRAPHY_FPS);
            let speed = (b.pose.root - a.pose.root).hypot() / dt;
            for s in 1..=self.substeps {
                let t = f64::from(s) / f64::from(self.substeps);
                let p = a.pose.root.lerp(b.pose.root, t);
                touch(&mut hits, i + 1, p, lerp(a.time(), b.time(), t), speed);
            }

            peak = peak.max(b.pose.height);
            if a.pose.height > 0.0 && b.pose.height <= 0.0 {
                record_first(
                    &mut hits,
                    CollisionPoint {
                        collider: Collider::Ground,
                        keyframe: i + 1,
                        point: b.pose.root,
                        time: b.time(),
                        speed: self.impact_speed(peak),
                    },
                );
            }
        }

        hits
    }
}

fn record_first(hits: &mut Vec<CollisionPoint>, c: CollisionPoint) {
    if !hits.iter().any(|h| h.collider == c.collider) {
        hits.push(c);
    }
}

fn inside_closed(r: &Rect, p: Point) -> bool {
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}

#[cfg(test)]
#[path = "../../tests/unit/choreography/physics.rs"]
mod tests;
