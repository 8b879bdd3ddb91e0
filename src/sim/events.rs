//! Collision events and the per-tick frame result
//!
//! The CCD core and boss sweep only describe what happened; the orchestrator
//! turns those descriptions into a `PhysicsFrameResult` for the rendering,
//! audio, scoring and telemetry collaborators.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::boss::BossDamage;
use super::state::{EnemyKind, PowerUpKind};

/// Which arena wall was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
    Top,
}

/// What a collision event touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitTarget {
    Wall(WallSide),
    Paddle,
    PaddleCorner,
    Brick(u32),
    Enemy(u32),
    BossHitbox(u32),
}

impl HitTarget {
    /// Walls and the paddle may legitimately be hit repeatedly in one tick
    pub fn is_dedup_exempt(&self) -> bool {
        matches!(
            self,
            HitTarget::Wall(_) | HitTarget::Paddle | HitTarget::PaddleCorner
        )
    }
}

/// One logical collision, produced by the CCD core
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub ball_id: u32,
    /// Time of impact as a fraction of the whole tick, in [0, 1]
    pub toi: f32,
    /// Unit normal pointing from the surface toward the ball
    pub normal: Vec2,
    pub target: HitTarget,
    /// Surface contact point
    pub point: Vec2,
    /// The ball passed through without reflecting (fireball vs brick)
    pub pass_through: bool,
}

/// Sound cues for the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEvent {
    WallBounce,
    PaddleHit,
    BrickHit,
    BrickBreak,
    IndestructibleClank,
    Explosion,
    EnemyHit,
    EnemyDestroyed,
    BossHit,
    ShieldBreak,
    BossDefeated,
    RescueNet,
    ShieldBounce,
    BallLost,
}

/// Particle effect styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstKind {
    Spark,
    BrickShards,
    EnemyDebris,
    BossImpact,
}

/// Particle spawn request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleBurst {
    pub pos: Vec2,
    pub kind: BurstKind,
    pub count: u32,
}

/// Explosion spawn request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosionSpawn {
    pub pos: Vec2,
    pub radius: f32,
}

/// Pickup dropped by a brick or enemy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickupDrop {
    pub kind: PowerUpKind,
    pub pos: Vec2,
}

/// A counted (cooldown-passed) boss hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossHitEvent {
    pub boss_id: u32,
    pub ball_id: u32,
    pub point: Vec2,
    pub damage: BossDamage,
}

/// A destroyed enemy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DestroyedEnemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Vec2,
}

/// Counters for the optional telemetry collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub substeps: u32,
    pub ccd_events: u32,
    pub deduplicated: u32,
    pub boss_samples: u32,
    pub boss_contacts: u32,
}

/// Write-once aggregate of everything a tick produced
#[derive(Debug, Clone, Default)]
pub struct PhysicsFrameResult {
    pub score_delta: u64,
    pub sounds: Vec<SoundEvent>,
    pub particles: Vec<ParticleBurst>,
    pub explosions: Vec<ExplosionSpawn>,
    pub destroyed_bricks: Vec<u32>,
    /// Bricks hit but still standing (hit flash)
    pub damaged_bricks: Vec<u32>,
    pub destroyed_enemies: Vec<DestroyedEnemy>,
    pub destroyed_hitboxes: Vec<u32>,
    pub pickups: Vec<PickupDrop>,
    pub boss_hits: Vec<BossHitEvent>,
    /// Balls that bounced off the paddle this tick
    pub paddle_hit_balls: Vec<u32>,
    pub lost_balls: Vec<u32>,
    pub rescued_balls: Vec<u32>,
    /// Turret shot origins
    pub turret_shots: Vec<Vec2>,
    pub all_balls_lost: bool,
    pub all_bricks_cleared: bool,
    pub stats: FrameStats,
}

impl PhysicsFrameResult {
    /// Result for a tick that cannot run: nothing to simulate means the round is lost
    pub fn lost() -> Self {
        Self {
            all_balls_lost: true,
            ..Self::default()
        }
    }
}
