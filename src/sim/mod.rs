//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep and clock only
//! - Seeded RNG only
//! - Stable iteration order (ball list order)
//! - No rendering or platform dependencies

pub mod boss;
pub mod boss_sweep;
pub mod ccd;
pub mod events;
pub mod geometry;
pub mod state;
pub mod tick;

pub use boss::{Boss, BossDamage, BossShape, ShapeContact, ShieldLayer};
pub use boss_sweep::{BossContact, boss_sample_count, sweep_boss};
pub use ccd::{BallMotion, Obstacle, ObstacleSource, SweepOutcome, SweepWorld, paddle_exit_velocity, sweep_ball};
pub use events::{
    BossHitEvent, BurstKind, CollisionEvent, DestroyedEnemy, ExplosionSpawn, FrameStats, HitTarget, ParticleBurst,
    PhysicsFrameResult, PickupDrop, SoundEvent, WallSide,
};
pub use geometry::{Rect, SweepHit, ray_swept_aabb, reflect, safe_normal, segment_circle_toi};
pub use state::{
    Ball, BossHitbox, Brick, Enemy, EnemyHit, EnemyKind, Paddle, PendingExplosion, PowerUpKind, SimState,
};
pub use tick::{DebugFlags, FrameConfig, step_physics};
