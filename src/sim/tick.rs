//! Per-tick physics orchestration
//!
//! One call to [`step_physics`] advances every ball by one frame: boss sweep,
//! CCD against bricks/enemies/hitboxes, event resolution, explosions, homing,
//! gravity, then end-of-frame filtering. All side effects on game state happen
//! here; everything the other collaborators need comes back in the
//! [`PhysicsFrameResult`].

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::boss::{Boss, BossDamage};
use super::boss_sweep::{BossContact, boss_sample_count, sweep_boss};
use super::ccd::{BallMotion, Obstacle, ObstacleSource, SweepWorld, sweep_ball};
use super::events::{
    BossHitEvent, BurstKind, CollisionEvent, DestroyedEnemy, ExplosionSpawn, HitTarget, ParticleBurst,
    PhysicsFrameResult, PickupDrop, SoundEvent,
};
use super::geometry::Rect;
use super::state::{EnemyHit, Paddle, PendingExplosion, PowerUpKind, SimState};
use crate::config::PhysicsTuning;
use crate::consts::*;
use crate::steer_toward;

const BOSS_HIT_SCORE: u64 = 100;
const BOSS_DEFEAT_SCORE: u64 = 5000;
const HITBOX_HIT_SCORE: u64 = 100;
const HITBOX_DESTROY_SCORE: u64 = 1000;

/// Debug toggles
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugFlags {
    /// Trace every CCD contact
    pub trace_ccd: bool,
    /// Log each resolved collision event
    pub log_events: bool,
}

/// Per-tick configuration
#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    /// Frame duration in seconds
    pub dt: f32,
    pub tick: u64,
    /// Simulation clock for cooldowns
    pub now_ms: f64,
    /// Arena bounds; the bottom edge is open
    pub bounds: Rect,
    /// Substep ceiling for the orchestrator's speed-based estimate
    pub max_substeps: u32,
    pub level: u32,
    pub debug: DebugFlags,
}

impl FrameConfig {
    /// Fixed-timestep frame for tick number `tick`
    pub fn new(tick: u64, bounds: Rect, level: u32) -> Self {
        Self {
            dt: SIM_DT,
            tick,
            now_ms: tick as f64 * SIM_DT as f64 * 1000.0,
            bounds,
            max_substeps: MAX_SUBSTEPS,
            level,
            debug: DebugFlags::default(),
        }
    }
}

/// Substeps from speed versus the smallest obstacle
fn frame_substeps(speed: f32, dt: f32, min_dim: f32, max_substeps: u32) -> u32 {
    let max_substeps = max_substeps.max(1);
    let n = (speed * dt / (0.5 * min_dim)).ceil();
    if !n.is_finite() {
        return max_substeps;
    }
    (n as u32).clamp(1, max_substeps)
}

/// Advance the simulation by one frame
pub fn step_physics(state: &mut SimState, frame: &FrameConfig, tuning: &PhysicsTuning) -> PhysicsFrameResult {
    let Some(paddle) = state.paddle.clone() else {
        return PhysicsFrameResult::lost();
    };
    if state.balls.is_empty() {
        return PhysicsFrameResult {
            all_balls_lost: state.captured_balls == 0,
            ..PhysicsFrameResult::default()
        };
    }

    let mut result = PhysicsFrameResult::default();
    let now = frame.now_ms;

    // 1. Frame-start heights gate the paddle
    let prev_y: Vec<f32> = state.balls.iter().map(|b| b.pos.y).collect();

    // 2. Obstacle snapshot shared by every ball
    let obstacles = collect_obstacles(state);
    let world = SweepWorld {
        bounds: frame.bounds,
        paddle: Some(&paddle),
        obstacles: &obstacles,
        paddle_max_angle: tuning.paddle_max_angle(),
        trace: frame.debug.trace_ccd,
    };

    // 3. Boss-first sweep, limited to the path before the first solid CCD
    //    contact, then CCD over whatever part of the frame is left
    let mut events: Vec<CollisionEvent> = Vec::new();
    let mut motions: Vec<Option<BallMotion>> = Vec::with_capacity(state.balls.len());
    for (i, ball) in state.balls.iter_mut().enumerate() {
        let substeps = frame_substeps(ball.speed(), frame.dt, world.min_dimension(ball.radius), frame.max_substeps);
        let full = sweep_ball(ball, prev_y[i], frame.dt, substeps, &world);
        let reach = full
            .events
            .iter()
            .find(|e| !e.pass_through)
            .map_or(1.0, |e| e.toi.clamp(0.0, 1.0));

        let mut consumed = None;
        for boss in state.boss.iter_mut().chain(state.extra_bosses.iter_mut()) {
            if !boss.alive() || boss.core_exposed() {
                continue;
            }
            let slice = frame.dt * reach;
            result.stats.boss_samples += boss_sample_count(ball, slice, boss);
            if let Some(contact) = sweep_boss(ball, slice, boss, now, tuning.boss_hit_cooldown_ms) {
                consumed = Some(reach * contact.fraction);
                ball.last_collision_ms = Some(now);
                apply_boss_contact(boss, &contact, &mut result);
                break;
            }
        }

        let (outcome, offset) = match consumed {
            None => (full, 0.0),
            Some(offset) => {
                let slice = frame.dt * (1.0 - offset);
                let substeps = frame_substeps(ball.speed(), slice, world.min_dimension(ball.radius), frame.max_substeps);
                (sweep_ball(ball, prev_y[i], slice, substeps, &world), offset)
            }
        };
        result.stats.substeps += outcome.substeps;
        let remaining = 1.0 - offset;
        events.extend(outcome.events.into_iter().map(|mut e| {
            e.toi = offset + remaining * e.toi;
            e
        }));
        motions.push(outcome.end);
    }

    let mut degenerate = Vec::new();
    for (ball, motion) in state.balls.iter_mut().zip(motions) {
        match motion {
            Some(m) => {
                ball.pos = m.pos;
                ball.vel = m.vel;
            }
            None => degenerate.push(ball.id),
        }
    }

    // 4. Time-ordered resolution; ties keep ball list order
    events.sort_by(|a, b| a.toi.total_cmp(&b.toi));
    let mut resolved: Vec<(HitTarget, f32)> = Vec::new();
    let mut broken: Vec<u32> = Vec::new();
    for event in &events {
        if !event.target.is_dedup_exempt() {
            let duplicate = resolved
                .iter()
                .any(|(t, toi)| *t == event.target && (event.toi - toi).abs() < tuning.dedup_time_epsilon);
            if duplicate {
                result.stats.deduplicated += 1;
                continue;
            }
            resolved.push((event.target, event.toi));
        }
        result.stats.ccd_events += 1;
        if frame.debug.log_events {
            log::debug!(
                "tick {} ball {} -> {:?} at toi {:.4}",
                frame.tick,
                event.ball_id,
                event.target,
                event.toi
            );
        }
        resolve_event(state, event, &paddle, frame, tuning, &mut result, &mut broken);
    }

    for &id in &broken {
        drop_brick_pickup(state, id, tuning.pickup_chance, &mut result);
    }

    // 5. Explosions
    run_explosions(state, &broken, frame, tuning, &mut result);

    // 6. Homing toward the active boss
    let homing_target = state.boss.as_ref().filter(|b| b.alive()).map(|b| b.center);
    if let Some(target) = homing_target {
        for ball in state.balls.iter_mut().filter(|b| b.homing && !b.awaiting_launch) {
            let dir = (target - ball.pos).normalize_or_zero();
            if dir != Vec2::ZERO {
                ball.vel = steer_toward(ball.vel, dir, tuning.homing_max_turn);
            }
        }
    }

    // 7. Rally pressure
    for ball in state.balls.iter_mut().filter(|b| !b.awaiting_launch) {
        let quiet_since = *ball.last_collision_ms.get_or_insert(now);
        if now - quiet_since >= tuning.gravity_grace_ms {
            ball.vel.y += tuning.gravity_accel * frame.dt;
        }
    }

    // 8. End-of-frame filtering
    let wells: Vec<Vec2> = state
        .boss
        .iter()
        .chain(state.extra_bosses.iter())
        .filter(|b| b.alive() && b.core_exposed())
        .map(|b| b.center)
        .collect();
    let bounds = frame.bounds;
    let mut lost = Vec::new();
    for ball in state.balls.iter_mut() {
        if degenerate.contains(&ball.id) || ball.awaiting_launch {
            continue;
        }

        for &center in &wells {
            let d = center - ball.pos;
            let dist = d.length();
            if dist > 1.0 && dist < tuning.core_well_radius {
                let falloff = 1.0 - dist / tuning.core_well_radius;
                ball.vel += d / dist * tuning.core_well_strength * falloff * frame.dt;
            }
        }

        if ball.pos.y - ball.radius < bounds.top() {
            ball.pos.y = bounds.top() + ball.radius;
            ball.vel.y = ball.vel.y.abs();
        }

        if ball.pos.y > bounds.bottom() {
            if paddle.shield {
                ball.pos.y = bounds.bottom() - ball.radius;
                ball.vel.y = -ball.vel.y.abs();
                ball.last_collision_ms = Some(now);
                result.sounds.push(SoundEvent::ShieldBounce);
            } else if let Some(net) = state.paddle.as_mut().filter(|p| p.rescue_net) {
                net.rescue_net = false;
                ball.pos.y = bounds.bottom() - ball.radius;
                ball.vel.y = -ball.vel.y.abs().max(ball.base_speed * 0.5);
                ball.last_collision_ms = Some(now);
                result.rescued_balls.push(ball.id);
                result.sounds.push(SoundEvent::RescueNet);
                log::info!("Rescue net saved ball {}", ball.id);
            } else {
                lost.push(ball.id);
            }
        }
    }

    for &id in &lost {
        result.lost_balls.push(id);
        result.sounds.push(SoundEvent::BallLost);
    }
    result.lost_balls.extend(degenerate.iter().copied());
    state
        .balls
        .retain(|b| !lost.contains(&b.id) && !degenerate.contains(&b.id));
    state.enemies.retain(|e| e.alive);
    state.resurrected.retain(|h| h.alive());

    result.all_balls_lost = state.balls.is_empty() && state.captured_balls == 0;
    result.all_bricks_cleared = !state.bricks.is_empty() && state.all_bricks_cleared();
    state.score += result.score_delta;

    result
}

/// Bricks, live enemies and resurrected hitboxes as CCD obstacles
fn collect_obstacles(state: &SimState) -> Vec<Obstacle> {
    let bricks = state.bricks.iter().filter(|b| b.visible).map(|b| Obstacle {
        source: ObstacleSource::Brick(b.id),
        rect: b.rect,
        indestructible: b.indestructible,
    });
    let enemies = state.enemies.iter().filter(|e| e.alive).map(|e| Obstacle {
        source: ObstacleSource::Enemy(e.id),
        rect: e.rect(),
        indestructible: false,
    });
    let hitboxes = state.resurrected.iter().filter(|h| h.alive()).map(|h| Obstacle {
        source: ObstacleSource::BossHitbox(h.id),
        rect: h.rect,
        indestructible: false,
    });
    bricks.chain(enemies).chain(hitboxes).collect()
}

fn apply_boss_contact(boss: &mut Boss, contact: &BossContact, result: &mut PhysicsFrameResult) {
    result.stats.boss_contacts += 1;
    result.particles.push(ParticleBurst {
        pos: contact.point,
        kind: BurstKind::BossImpact,
        count: 8,
    });
    if !contact.counted {
        return;
    }

    let damage = boss.apply_hit();
    match damage {
        BossDamage::ShieldDamaged { .. } | BossDamage::Damaged { .. } => {
            result.sounds.push(SoundEvent::BossHit);
            result.score_delta += BOSS_HIT_SCORE;
        }
        BossDamage::ShieldBroken { layer, core_exposed } => {
            result.sounds.push(SoundEvent::ShieldBreak);
            result.score_delta += BOSS_HIT_SCORE;
            if core_exposed {
                log::info!("Boss {} core exposed after shield {} broke", boss.id, layer);
            }
        }
        BossDamage::Defeated => {
            result.sounds.push(SoundEvent::BossDefeated);
            result.score_delta += BOSS_DEFEAT_SCORE;
            log::info!("Boss {} defeated", boss.id);
        }
    }
    result.boss_hits.push(BossHitEvent {
        boss_id: contact.boss_id,
        ball_id: contact.ball_id,
        point: contact.point,
        damage,
    });
}

fn resolve_event(
    state: &mut SimState,
    event: &CollisionEvent,
    paddle: &Paddle,
    frame: &FrameConfig,
    tuning: &PhysicsTuning,
    result: &mut PhysicsFrameResult,
    broken: &mut Vec<u32>,
) {
    let now = frame.now_ms;
    if let Some(ball) = state.balls.iter_mut().find(|b| b.id == event.ball_id) {
        ball.last_collision_ms = Some(now);
    }

    match event.target {
        HitTarget::Wall(_) => {
            result.sounds.push(SoundEvent::WallBounce);
            result.particles.push(ParticleBurst {
                pos: event.point,
                kind: BurstKind::Spark,
                count: 3,
            });
        }
        HitTarget::Paddle | HitTarget::PaddleCorner => {
            let Some(ball) = state.balls.iter_mut().find(|b| b.id == event.ball_id) else {
                return;
            };
            if !ball.paddle_ready(now, tuning.paddle_cooldown_ms) {
                return;
            }
            ball.last_paddle_hit_ms = Some(now);
            result.paddle_hit_balls.push(ball.id);
            result.sounds.push(SoundEvent::PaddleHit);
            if event.target == HitTarget::Paddle {
                if paddle.reflect {
                    ball.homing = true;
                }
                if paddle.turrets {
                    result.turret_shots.push(Vec2::new(paddle.rect.left(), paddle.rect.top()));
                    result.turret_shots.push(Vec2::new(paddle.rect.right(), paddle.rect.top()));
                }
            }
        }
        HitTarget::Enemy(id) => resolve_enemy(state, id, result),
        HitTarget::BossHitbox(id) => {
            let Some(hitbox) = state.resurrected.iter_mut().find(|h| h.id == id) else {
                return;
            };
            let ready = hitbox
                .last_hit_ms
                .is_none_or(|last| now - last >= tuning.boss_hit_cooldown_ms);
            if !hitbox.alive() || !ready {
                return;
            }
            hitbox.hp -= 1;
            hitbox.last_hit_ms = Some(now);
            result.score_delta += HITBOX_HIT_SCORE;
            result.sounds.push(SoundEvent::BossHit);
            result.particles.push(ParticleBurst {
                pos: event.point,
                kind: BurstKind::BossImpact,
                count: 6,
            });
            if !hitbox.alive() {
                result.score_delta += HITBOX_DESTROY_SCORE;
                result.destroyed_hitboxes.push(id);
            }
        }
        HitTarget::Brick(id) => resolve_brick(state, id, event, frame, tuning, result, broken),
    }
}

fn resolve_enemy(state: &mut SimState, id: u32, result: &mut PhysicsFrameResult) {
    let Some(enemy) = state.enemies.iter_mut().find(|e| e.id == id) else {
        return;
    };
    match enemy.register_hit() {
        EnemyHit::Enraged { hits_left } => {
            log::debug!("Enemy {} enraged, {} hits left", id, hits_left);
            result.sounds.push(SoundEvent::EnemyHit);
            result.particles.push(ParticleBurst {
                pos: enemy.center,
                kind: BurstKind::Spark,
                count: 4,
            });
        }
        EnemyHit::Destroyed => {
            let (kind, pos) = (enemy.kind, enemy.center);
            result.score_delta += kind.score_value();
            result.destroyed_enemies.push(DestroyedEnemy { id, kind, pos });
            result.explosions.push(ExplosionSpawn {
                pos,
                radius: enemy.half_size.max_element() * 2.0,
            });
            result.sounds.push(SoundEvent::EnemyDestroyed);
            result.particles.push(ParticleBurst {
                pos,
                kind: BurstKind::EnemyDebris,
                count: 16,
            });
            let kind = random_power_up(&mut state.rng);
            result.pickups.push(PickupDrop { kind, pos });
        }
        EnemyHit::Ignored => {}
    }
}

fn resolve_brick(
    state: &mut SimState,
    id: u32,
    event: &CollisionEvent,
    frame: &FrameConfig,
    tuning: &PhysicsTuning,
    result: &mut PhysicsFrameResult,
    broken: &mut Vec<u32>,
) {
    let fireball = state
        .balls
        .iter()
        .find(|b| b.id == event.ball_id)
        .map_or(event.pass_through, |b| b.fireball);
    let cap = state.speed_cap(tuning.max_ball_speed);

    let Some(brick) = state.brick_mut(id) else {
        return;
    };
    if !brick.visible {
        return;
    }
    if brick.indestructible {
        result.sounds.push(SoundEvent::IndestructibleClank);
        if fireball {
            result.damaged_bricks.push(id);
        }
        return;
    }

    let destroyed = if fireball { brick.shatter() } else { brick.damage() };
    let value = brick.score_value(frame.level);
    if destroyed {
        result.score_delta += value;
        result.destroyed_bricks.push(id);
        result.sounds.push(SoundEvent::BrickBreak);
        result.particles.push(ParticleBurst {
            pos: brick.rect.center(),
            kind: BurstKind::BrickShards,
            count: 12,
        });
        broken.push(id);
    } else {
        result.damaged_bricks.push(id);
        result.sounds.push(SoundEvent::BrickHit);
        result.particles.push(ParticleBurst {
            pos: event.point,
            kind: BurstKind::Spark,
            count: 4,
        });
    }

    if !fireball {
        if let Some(ball) = state.balls.iter_mut().find(|b| b.id == event.ball_id) {
            let speed = (ball.speed() + tuning.brick_speed_up).min(cap);
            ball.vel = ball.vel.normalize_or_zero() * speed;
            ball.base_speed = (ball.base_speed + tuning.brick_speed_up).min(cap);
        }
    }
}

fn random_power_up(rng: &mut Pcg32) -> PowerUpKind {
    PowerUpKind::ALL[rng.random_range(0..PowerUpKind::ALL.len())]
}

/// Carried power-up, or a chance roll for plain bricks
fn drop_brick_pickup(state: &mut SimState, id: u32, chance: f64, result: &mut PhysicsFrameResult) {
    let Some((carried, pos)) = state.brick(id).map(|b| (b.power_up, b.rect.center())) else {
        return;
    };
    let kind = carried.or_else(|| {
        let roll = chance > 0.0 && state.rng.random_bool(chance.min(1.0));
        roll.then(|| random_power_up(&mut state.rng))
    });
    if let Some(kind) = kind {
        result.pickups.push(PickupDrop { kind, pos });
    }
}

/// Detonate due pending explosions, then this tick's explosive bricks
///
/// Explosive bricks caught in a blast are queued for a later tick rather than
/// detonated recursively.
fn run_explosions(
    state: &mut SimState,
    broken: &[u32],
    frame: &FrameConfig,
    tuning: &PhysicsTuning,
    result: &mut PhysicsFrameResult,
) {
    let now = frame.now_ms;
    let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending_explosions)
        .into_iter()
        .partition(|p| p.detonate_at_ms <= now);
    state.pending_explosions = waiting;

    let mut blasts = Vec::new();
    let mut detonated = Vec::new();
    for pending in due {
        let Some(brick) = state.brick_mut(pending.brick_id) else {
            continue;
        };
        // Already destroyed some other way
        if !brick.shatter() {
            continue;
        }
        result.score_delta += brick.score_value(frame.level);
        result.destroyed_bricks.push(brick.id);
        blasts.push(brick.rect.center());
        detonated.push(brick.id);
    }
    for id in detonated {
        drop_brick_pickup(state, id, tuning.pickup_chance, result);
    }
    blasts.extend(
        broken
            .iter()
            .filter_map(|&id| state.brick(id))
            .filter(|b| b.explosive)
            .map(|b| b.rect.center()),
    );

    for center in blasts {
        result.explosions.push(ExplosionSpawn {
            pos: center,
            radius: tuning.explosion_radius,
        });
        result.sounds.push(SoundEvent::Explosion);

        let mut shattered = Vec::new();
        for brick in state.bricks.iter_mut() {
            if !brick.counts_for_clear() || brick.rect.center().distance(center) > tuning.explosion_radius {
                continue;
            }
            if brick.explosive {
                if !state.pending_explosions.iter().any(|p| p.brick_id == brick.id) {
                    state.pending_explosions.push(PendingExplosion {
                        brick_id: brick.id,
                        detonate_at_ms: now + tuning.explosion_chain_delay_ms,
                    });
                }
            } else if brick.shatter() {
                result.score_delta += brick.score_value(frame.level);
                result.destroyed_bricks.push(brick.id);
                shattered.push(brick.id);
            }
        }
        for id in shattered {
            drop_brick_pickup(state, id, tuning.pickup_chance, result);
        }
    }
}
