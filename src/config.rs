//! Physics tuning and difficulty presets
//!
//! Tuning is loaded from JSON with every field optional, so a file only needs
//! to name the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading tuning
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    /// The JSON was malformed or had wrongly-typed fields
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Casual,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Casual => "Casual",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "casual" | "easy" => Some(Difficulty::Casual),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Ball speed ceiling before the global modifier
    pub fn max_ball_speed(&self) -> f32 {
        match self {
            Difficulty::Casual => BALL_MAX_SPEED * 0.8,
            Difficulty::Normal => BALL_MAX_SPEED,
            Difficulty::Hard => BALL_MAX_SPEED * 1.25,
        }
    }

    /// How long a rally may go without a collision before gravity kicks in
    pub fn gravity_grace_ms(&self) -> f64 {
        match self {
            Difficulty::Casual => GRAVITY_GRACE_MS * 1.5,
            Difficulty::Normal => GRAVITY_GRACE_MS,
            Difficulty::Hard => GRAVITY_GRACE_MS * 0.5,
        }
    }

    /// Chance that an ordinary brick drops a pickup
    pub fn pickup_chance(&self) -> f64 {
        match self {
            Difficulty::Casual => 0.12,
            Difficulty::Normal => 0.08,
            Difficulty::Hard => 0.05,
        }
    }

    /// Homing turn rate per frame (radians)
    pub fn homing_max_turn(&self) -> f32 {
        match self {
            Difficulty::Casual => HOMING_MAX_TURN * 1.5,
            Difficulty::Normal => HOMING_MAX_TURN,
            Difficulty::Hard => HOMING_MAX_TURN * 0.75,
        }
    }
}

/// Physics tunables read by the frame orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub difficulty: Difficulty,

    // === Ball ===
    /// Speed ceiling (px/sec), scaled by the global speed modifier
    pub max_ball_speed: f32,
    /// Additive speed-up per ordinary brick hit (px/sec)
    pub brick_speed_up: f32,

    // === Paddle ===
    /// Maximum exit angle from vertical (degrees)
    pub paddle_max_angle_deg: f32,
    /// Minimum time between counted paddle hits on one ball
    pub paddle_cooldown_ms: f64,

    // === Boss ===
    pub boss_hit_cooldown_ms: f64,
    /// Radius of the exposed-core gravity well
    pub core_well_radius: f32,
    /// Peak pull of the gravity well (px/sec²)
    pub core_well_strength: f32,

    // === Explosions ===
    pub explosion_radius: f32,
    pub explosion_chain_delay_ms: f64,

    // === Rally pressure ===
    pub gravity_grace_ms: f64,
    pub gravity_accel: f32,
    pub homing_max_turn: f32,

    // === Collision bookkeeping ===
    /// Events closer than this (fraction of a tick) on one target are one hit
    pub dedup_time_epsilon: f32,
    /// Chance that a brick without a power-up drops one anyway
    pub pickup_chance: f64,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self::from_preset(Difficulty::Normal)
    }
}

impl PhysicsTuning {
    /// Create tuning from a difficulty preset
    pub fn from_preset(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            max_ball_speed: difficulty.max_ball_speed(),
            brick_speed_up: BRICK_SPEED_UP,
            paddle_max_angle_deg: PADDLE_MAX_ANGLE_DEG,
            paddle_cooldown_ms: PADDLE_COOLDOWN_MS,
            boss_hit_cooldown_ms: BOSS_HIT_COOLDOWN_MS,
            core_well_radius: CORE_WELL_RADIUS,
            core_well_strength: CORE_WELL_STRENGTH,
            explosion_radius: EXPLOSION_RADIUS,
            explosion_chain_delay_ms: EXPLOSION_CHAIN_DELAY_MS,
            gravity_grace_ms: difficulty.gravity_grace_ms(),
            gravity_accel: GRAVITY_ACCEL,
            homing_max_turn: difficulty.homing_max_turn(),
            dedup_time_epsilon: DEDUP_TIME_EPSILON,
            pickup_chance: difficulty.pickup_chance(),
        }
    }

    /// Apply a preset's values to the preset-driven fields
    pub fn apply_preset(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.max_ball_speed = difficulty.max_ball_speed();
        self.gravity_grace_ms = difficulty.gravity_grace_ms();
        self.homing_max_turn = difficulty.homing_max_turn();
        self.pickup_chance = difficulty.pickup_chance();
    }

    #[inline]
    pub fn paddle_max_angle(&self) -> f32 {
        self.paddle_max_angle_deg.to_radians()
    }

    /// Parse tuning from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let tuning: Self = serde_json::from_str(json)?;
        for warning in tuning.validate() {
            log::warn!("tuning: {warning}");
        }
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let tuning = Self::from_json_str(&text)?;
        log::info!("Loaded physics tuning from {}", path.display());
        Ok(tuning)
    }

    /// Non-fatal sanity warnings; the physics core never re-validates
    pub fn validate(&self) -> Vec<String> {
        let mut w = Vec::new();
        if self.max_ball_speed <= 0.0 {
            w.push(format!("max_ball_speed {} must be > 0", self.max_ball_speed));
        }
        if self.brick_speed_up < 0.0 {
            w.push(format!("brick_speed_up {} negative; bricks will slow balls", self.brick_speed_up));
        }
        if !(0.0..90.0).contains(&self.paddle_max_angle_deg) {
            w.push(format!(
                "paddle_max_angle_deg {} outside [0, 90); exits may go sideways or down",
                self.paddle_max_angle_deg
            ));
        }
        if self.paddle_cooldown_ms < 0.0 || self.boss_hit_cooldown_ms < 0.0 {
            w.push("cooldowns must be >= 0".into());
        }
        if self.explosion_radius <= 0.0 {
            w.push(format!("explosion_radius {} disables blasts", self.explosion_radius));
        }
        if self.explosion_chain_delay_ms <= 0.0 {
            w.push("explosion_chain_delay_ms <= 0; chained blasts fire on the very next tick".into());
        }
        if self.dedup_time_epsilon <= 0.0 || self.dedup_time_epsilon >= 1.0 {
            w.push(format!(
                "dedup_time_epsilon {} should be inside (0, 1)",
                self.dedup_time_epsilon
            ));
        }
        if !(0.0..=1.0).contains(&self.pickup_chance) {
            w.push(format!("pickup_chance {} outside [0, 1]", self.pickup_chance));
        }
        w
    }
}
