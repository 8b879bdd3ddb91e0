//! Simulation state and core entity types
//!
//! Everything the frame orchestrator reads and mutates lives here. The state
//! is owned by the caller and handed to `step_physics` each tick.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::boss::Boss;
use super::geometry::Rect;
use crate::consts::*;

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    /// Velocity in px/sec
    pub vel: Vec2,
    pub radius: f32,
    /// Cruise speed; paddle bounces restore it, gravity never feeds it
    pub base_speed: f32,
    /// Passes through destructible bricks, destroying them
    pub fireball: bool,
    /// Steers toward the active boss
    pub homing: bool,
    /// Parked on the paddle, not simulated
    pub awaiting_launch: bool,
    /// Timestamp of the last paddle bounce that counted
    #[serde(default)]
    pub last_paddle_hit_ms: Option<f64>,
    /// Timestamp of the last collision of any kind (gravity grace window).
    /// `None` until the ball's first tick, which starts the window.
    #[serde(default)]
    pub last_collision_ms: Option<f64>,
}

impl Ball {
    pub fn new(id: u32, pos: Vec2, vel: Vec2) -> Self {
        Self {
            id,
            pos,
            vel,
            radius: BALL_RADIUS,
            base_speed: vel.length(),
            fireball: false,
            homing: false,
            awaiting_launch: false,
            last_paddle_hit_ms: None,
            last_collision_ms: None,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Whether the paddle bounce cooldown has elapsed at `now_ms`
    pub fn paddle_ready(&self, now_ms: f64, cooldown_ms: f64) -> bool {
        self.last_paddle_hit_ms
            .is_none_or(|last| now_ms - last >= cooldown_ms)
    }

    /// Launch the ball straight up off the paddle at cruise speed
    pub fn launch(&mut self, now_ms: f64) {
        if self.awaiting_launch {
            let speed = if self.base_speed > 0.0 {
                self.base_speed
            } else {
                BALL_START_SPEED
            };
            self.vel = Vec2::new(0.0, -speed);
            self.base_speed = speed;
            self.awaiting_launch = false;
            self.last_collision_ms = Some(now_ms);
        }
    }
}

/// Power-up types carried by bricks or dropped by enemies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    MultiBall,
    Fireball,
    Homing,
    Shield,
    Turrets,
    RescueNet,
    Slow,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 7] = [
        PowerUpKind::MultiBall,
        PowerUpKind::Fireball,
        PowerUpKind::Homing,
        PowerUpKind::Shield,
        PowerUpKind::Turrets,
        PowerUpKind::RescueNet,
        PowerUpKind::Slow,
    ];
}

/// A brick entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub id: u32,
    pub rect: Rect,
    pub visible: bool,
    pub hp: u32,
    pub indestructible: bool,
    /// Detonates when destroyed
    #[serde(default)]
    pub explosive: bool,
    /// Guaranteed drop when destroyed
    #[serde(default)]
    pub power_up: Option<PowerUpKind>,
}

impl Brick {
    pub fn new(id: u32, rect: Rect, hp: u32) -> Self {
        Self {
            id,
            rect,
            visible: true,
            hp,
            indestructible: false,
            explosive: false,
            power_up: None,
        }
    }

    pub fn indestructible(id: u32, rect: Rect) -> Self {
        Self {
            indestructible: true,
            ..Self::new(id, rect, 1)
        }
    }

    pub fn explosive(id: u32, rect: Rect) -> Self {
        Self {
            explosive: true,
            ..Self::new(id, rect, 1)
        }
    }

    /// Returns true if this brick must be destroyed to clear the level
    pub fn counts_for_clear(&self) -> bool {
        self.visible && !self.indestructible
    }

    /// Take one hit. Returns true if this hit destroyed the brick.
    pub fn damage(&mut self) -> bool {
        if self.indestructible || !self.visible {
            return false;
        }
        self.hp = self.hp.saturating_sub(1);
        if self.hp == 0 {
            self.visible = false;
        }
        !self.visible
    }

    /// Destroy outright, skipping hit points. Returns false if it was already gone.
    pub fn shatter(&mut self) -> bool {
        if self.indestructible || !self.visible {
            return false;
        }
        self.hp = 0;
        self.visible = false;
        true
    }

    /// Points awarded for destroying this brick on the given level
    pub fn score_value(&self, level: u32) -> u64 {
        let base = if self.explosive { 75 } else { 50 };
        base + 10 * level as u64
    }
}

/// Enemy types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKind {
    Pyramid,
    Sphere,
    CrossBall,
    Cube,
}

impl EnemyKind {
    /// Hits survived before the destroying one
    pub fn tolerated_hits(&self) -> u32 {
        match self {
            EnemyKind::Pyramid => 2,
            EnemyKind::Sphere => 1,
            EnemyKind::CrossBall => 3,
            EnemyKind::Cube => 0,
        }
    }

    pub fn score_value(&self) -> u64 {
        match self {
            EnemyKind::Pyramid => 300,
            EnemyKind::Sphere => 200,
            EnemyKind::CrossBall => 500,
            EnemyKind::Cube => 100,
        }
    }
}

/// Outcome of a ball hitting an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyHit {
    /// Survived; now angry and faster
    Enraged { hits_left: u32 },
    Destroyed,
    /// Already destroyed earlier this tick
    Ignored,
}

/// Speed multiplier applied on every non-fatal enemy hit
pub const ENEMY_ANGER_SPEEDUP: f32 = 1.25;

/// A destructible enemy drifting through the arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub center: Vec2,
    pub half_size: Vec2,
    pub vel: Vec2,
    pub hits_taken: u32,
    pub angry: bool,
    /// Cleared when destroyed; the list is compacted at the end of the tick
    pub alive: bool,
}

impl Enemy {
    pub fn new(id: u32, kind: EnemyKind, center: Vec2, half_size: Vec2, vel: Vec2) -> Self {
        Self {
            id,
            kind,
            center,
            half_size,
            vel,
            hits_taken: 0,
            angry: false,
            alive: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center(self.center, self.half_size)
    }

    /// Advance the per-kind hit state machine
    pub fn register_hit(&mut self) -> EnemyHit {
        if !self.alive {
            return EnemyHit::Ignored;
        }
        let tolerated = self.kind.tolerated_hits();
        if self.hits_taken < tolerated {
            self.hits_taken += 1;
            self.angry = true;
            self.vel *= ENEMY_ANGER_SPEEDUP;
            EnemyHit::Enraged {
                hits_left: tolerated - self.hits_taken,
            }
        } else {
            self.hits_taken += 1;
            self.alive = false;
            EnemyHit::Destroyed
        }
    }
}

/// Rectangular hitbox left behind by a resurrected boss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossHitbox {
    pub id: u32,
    pub rect: Rect,
    pub hp: u32,
    #[serde(default)]
    pub last_hit_ms: Option<f64>,
}

impl BossHitbox {
    pub fn alive(&self) -> bool {
        self.hp > 0
    }
}

/// The player's paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub rect: Rect,
    /// Floor bounces balls back while active
    #[serde(default)]
    pub shield: bool,
    /// Paddle bounces turn balls into homing shots
    #[serde(default)]
    pub reflect: bool,
    /// Paddle bounces fire a pair of turret shots
    #[serde(default)]
    pub turrets: bool,
    /// One-time save for the first ball to fall past the floor
    #[serde(default)]
    pub rescue_net: bool,
}

impl Paddle {
    pub fn new(center_x: f32, top: f32) -> Self {
        Self {
            rect: Rect::new(center_x - PADDLE_WIDTH / 2.0, top, PADDLE_WIDTH, PADDLE_HEIGHT),
            shield: false,
            reflect: false,
            turrets: false,
            rescue_net: false,
        }
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.rect.center().x
    }

    #[inline]
    pub fn half_width(&self) -> f32 {
        self.rect.w / 2.0
    }

    /// Normalized impact offset: 0 = center, -1/+1 = edges
    pub fn impact_offset(&self, impact_x: f32) -> f32 {
        let half = self.half_width();
        if half <= f32::EPSILON {
            return 0.0;
        }
        ((impact_x - self.center_x()) / half).clamp(-1.0, 1.0)
    }
}

/// Explosive brick caught in a blast, waiting to go off
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingExplosion {
    pub brick_id: u32,
    pub detonate_at_ms: f64,
}

/// Complete simulation state handed to the orchestrator each tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    /// Active balls (processed in list order)
    pub balls: Vec<Ball>,
    pub bricks: Vec<Brick>,
    pub enemies: Vec<Enemy>,
    /// Boss the homing balls track
    pub boss: Option<Boss>,
    /// Secondary full-shape boss instances
    #[serde(default)]
    pub extra_bosses: Vec<Boss>,
    /// Resurrected boss hitboxes
    #[serde(default)]
    pub resurrected: Vec<BossHitbox>,
    pub paddle: Option<Paddle>,
    /// Global speed modifier (slow power-up < 1.0)
    pub speed_multiplier: f32,
    /// Explosive bricks waiting to detonate on a later tick
    #[serde(default)]
    pub pending_explosions: Vec<PendingExplosion>,
    /// Balls held by a trapping mechanic (not lost, not simulated)
    #[serde(default)]
    pub captured_balls: u32,
    pub score: u64,
    /// RNG for pickup rolls
    pub rng: Pcg32,
    /// Next entity ID
    next_id: u32,
}

impl SimState {
    /// Create an empty state with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            balls: Vec::new(),
            bricks: Vec::new(),
            enemies: Vec::new(),
            boss: None,
            extra_bosses: Vec::new(),
            resurrected: Vec::new(),
            paddle: None,
            speed_multiplier: 1.0,
            pending_explosions: Vec::new(),
            captured_balls: 0,
            score: 0,
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_ball(&mut self, pos: Vec2, vel: Vec2) -> u32 {
        let id = self.next_entity_id();
        self.balls.push(Ball::new(id, pos, vel));
        id
    }

    pub fn add_brick(&mut self, rect: Rect, hp: u32) -> u32 {
        let id = self.next_entity_id();
        self.bricks.push(Brick::new(id, rect, hp));
        id
    }

    pub fn add_enemy(&mut self, kind: EnemyKind, center: Vec2, half_size: Vec2, vel: Vec2) -> u32 {
        let id = self.next_entity_id();
        self.enemies.push(Enemy::new(id, kind, center, half_size, vel));
        id
    }

    pub fn brick(&self, id: u32) -> Option<&Brick> {
        self.bricks.iter().find(|b| b.id == id)
    }

    pub fn brick_mut(&mut self, id: u32) -> Option<&mut Brick> {
        self.bricks.iter_mut().find(|b| b.id == id)
    }

    /// Ball speed ceiling after the global modifier
    pub fn speed_cap(&self, max_ball_speed: f32) -> f32 {
        max_ball_speed * self.speed_multiplier
    }

    /// True when every destructible brick is gone
    pub fn all_bricks_cleared(&self) -> bool {
        !self.bricks.iter().any(Brick::counts_for_clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brick_damage_hides_at_zero() {
        let mut brick = Brick::new(1, Rect::new(0.0, 0.0, 40.0, 20.0), 2);
        assert!(!brick.damage());
        assert_eq!(brick.hp, 1);
        assert!(brick.visible);
        assert!(brick.damage());
        assert_eq!(brick.hp, 0);
        assert!(!brick.visible);
        // Further hits are no-ops
        assert!(!brick.damage());
        assert_eq!(brick.hp, 0);
    }

    #[test]
    fn test_indestructible_brick_ignores_damage() {
        let mut brick = Brick::indestructible(1, Rect::new(0.0, 0.0, 40.0, 20.0));
        assert!(!brick.damage());
        assert!(!brick.shatter());
        assert!(brick.visible);
        assert!(!brick.counts_for_clear());
    }

    #[test]
    fn test_pyramid_state_machine() {
        let mut enemy = Enemy::new(7, EnemyKind::Pyramid, Vec2::ZERO, Vec2::splat(12.0), Vec2::new(40.0, 0.0));
        assert_eq!(enemy.register_hit(), EnemyHit::Enraged { hits_left: 1 });
        assert!(enemy.angry);
        assert!((enemy.vel.x - 50.0).abs() < 1e-4);
        assert_eq!(enemy.register_hit(), EnemyHit::Enraged { hits_left: 0 });
        assert_eq!(enemy.register_hit(), EnemyHit::Destroyed);
        assert!(!enemy.alive);
        assert_eq!(enemy.register_hit(), EnemyHit::Ignored);
    }

    #[test]
    fn test_cube_is_one_hit_kill() {
        let mut enemy = Enemy::new(1, EnemyKind::Cube, Vec2::ZERO, Vec2::splat(10.0), Vec2::ZERO);
        assert_eq!(enemy.register_hit(), EnemyHit::Destroyed);
        assert!(!enemy.angry);
    }

    #[test]
    fn test_paddle_impact_offset() {
        let paddle = Paddle::new(200.0, 500.0);
        assert_eq!(paddle.impact_offset(200.0), 0.0);
        assert_eq!(paddle.impact_offset(200.0 + PADDLE_WIDTH), 1.0);
        assert!((paddle.impact_offset(200.0 - PADDLE_WIDTH / 4.0) + 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_ball_paddle_cooldown() {
        let mut ball = Ball::new(1, Vec2::ZERO, Vec2::new(0.0, 300.0));
        assert!(ball.paddle_ready(0.0, 80.0));
        ball.last_paddle_hit_ms = Some(1000.0);
        assert!(!ball.paddle_ready(1050.0, 80.0));
        assert!(ball.paddle_ready(1080.0, 80.0));
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let mut state = SimState::new(1);
        let a = state.spawn_ball(Vec2::ZERO, Vec2::Y);
        let b = state.add_brick(Rect::new(0.0, 0.0, 10.0, 10.0), 1);
        assert_ne!(a, b);
    }
}
