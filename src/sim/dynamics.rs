//! Linear dynamics and force generators
//!
//! Bodies with zero inverse mass are static: forces, integration and
//! collision corrections leave them where they are.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Velocity, acceleration and accumulated force for one body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dynamics {
    pub vel: Vec2,
    /// Acceleration carried into the next integration step (cleared after it)
    pub accel: Vec2,
    pub sum_forces: Vec2,
    pub inverse_mass: f32,
}

impl Dynamics {
    /// Dynamic body with the given mass
    pub fn new(mass: f32) -> Self {
        Self {
            inverse_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
            ..Default::default()
        }
    }

    /// Immovable body (terrain)
    pub fn fixed() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.inverse_mass <= 0.0
    }

    /// Mass, or zero for static bodies
    pub fn mass(&self) -> f32 {
        if self.is_static() {
            0.0
        } else {
            1.0 / self.inverse_mass
        }
    }

    pub fn add_force(&mut self, force: Vec2) {
        self.sum_forces += force;
    }

    /// Semi-implicit Euler: velocity first, then position
    pub fn integrate(&mut self, pos: &mut Vec2, dt: f32) {
        if self.is_static() {
            self.sum_forces = Vec2::ZERO;
            return;
        }
        self.accel += self.sum_forces * self.inverse_mass;
        self.vel += self.accel * dt;
        *pos += self.vel * dt;

        self.accel = Vec2::ZERO;
        self.sum_forces = Vec2::ZERO;
    }
}

/// Weight of a body (screen space, +Y down)
///
/// `gravity` is in pixels/s².
pub fn gravity_force(mass: f32, gravity: f32) -> Vec2 {
    Vec2::new(0.0, mass * gravity)
}

/// Friction opposing horizontal motion
pub fn horizontal_friction_force(vel: Vec2, coefficient: f32) -> Vec2 {
    Vec2::new(-vel.x * coefficient, 0.0)
}

/// Scale horizontal velocity toward zero
pub fn apply_horizontal_damping(dynamics: &mut Dynamics, damping: f32) {
    dynamics.vel.x *= damping;
}
