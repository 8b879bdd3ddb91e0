//! Brickfall - brick breaker physics core
//!
//! Core modules:
//! - `sim`: Swept-circle collision, boss sweep and the per-tick frame orchestrator
//! - `config`: Data-driven physics tuning and difficulty presets

pub mod config;
pub mod sim;

pub use config::{ConfigError, Difficulty, PhysicsTuning};

use glam::Vec2;

/// Physics configuration constants
pub mod consts {
    /// Nominal simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Default substep ceiling handed to the CCD core per tick
    pub const MAX_SUBSTEPS: u32 = 16;
    /// Hard cap on CCD substeps, whatever the caller asks for
    pub const MAX_CCD_SUBSTEPS: u32 = 128;
    /// Bounce resolutions allowed inside one substep
    pub const MAX_RESOLVE_ITERATIONS: u32 = 4;
    /// No substep may move further than this fraction of the smallest obstacle dimension
    pub const MAX_STEP_FRACTION: f32 = 0.9;
    /// Post-bounce push along the normal, as a fraction of the ball radius
    pub const NUDGE_FRACTION: f32 = 0.02;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 8.0;
    pub const BALL_START_SPEED: f32 = 420.0;
    pub const BALL_MAX_SPEED: f32 = 900.0;
    /// Additive speed-up per brick hit (px/s)
    pub const BRICK_SPEED_UP: f32 = 6.0;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 110.0;
    pub const PADDLE_HEIGHT: f32 = 14.0;
    /// Maximum exit angle from vertical (degrees)
    pub const PADDLE_MAX_ANGLE_DEG: f32 = 60.0;
    pub const PADDLE_COOLDOWN_MS: f64 = 80.0;

    /// Boss defaults
    pub const BOSS_HIT_COOLDOWN_MS: f64 = 250.0;
    pub const BOSS_MIN_SAMPLES: u32 = 5;
    pub const BOSS_MAX_SAMPLES: u32 = 16;

    /// Explosive bricks
    pub const EXPLOSION_RADIUS: f32 = 70.0;
    pub const EXPLOSION_CHAIN_DELAY_MS: f64 = 120.0;

    /// Rally decay gravity
    pub const GRAVITY_GRACE_MS: f64 = 4000.0;
    pub const GRAVITY_ACCEL: f32 = 180.0;

    /// Homing steering cap (radians per frame)
    pub const HOMING_MAX_TURN: f32 = 0.06;

    /// Exposed hex core gravity well
    pub const CORE_WELL_RADIUS: f32 = 160.0;
    pub const CORE_WELL_STRENGTH: f32 = 240.0;

    /// Two events on one target closer than this (tick fraction) are one hit
    pub const DEDUP_TIME_EPSILON: f32 = 0.02;
}

/// Signed angle from `from` to `to` in [-π, π]
#[inline]
pub fn signed_angle(from: Vec2, to: Vec2) -> f32 {
    from.perp_dot(to).atan2(from.dot(to))
}

/// Rotate `v` by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Turn `vel` toward `target_dir` by at most `max_turn` radians, keeping its length
pub fn steer_toward(vel: Vec2, target_dir: Vec2, max_turn: f32) -> Vec2 {
    let speed = vel.length();
    if speed < 1e-6 || target_dir.length_squared() < 1e-12 {
        return vel;
    }
    let delta = signed_angle(vel, target_dir).clamp(-max_turn, max_turn);
    rotate(vel / speed, delta) * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_signed_angle() {
        let a = signed_angle(Vec2::X, Vec2::Y);
        assert!((a - FRAC_PI_2).abs() < 1e-5);
        let b = signed_angle(Vec2::Y, Vec2::X);
        assert!((b + FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_steer_toward_caps_turn_and_keeps_speed() {
        let vel = Vec2::new(300.0, 0.0);
        let steered = steer_toward(vel, Vec2::Y, 0.1);
        assert!((steered.length() - 300.0).abs() < 1e-3);
        assert!((signed_angle(vel, steered) - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_steer_toward_zero_velocity() {
        assert_eq!(steer_toward(Vec2::ZERO, Vec2::Y, 0.1), Vec2::ZERO);
    }
}
