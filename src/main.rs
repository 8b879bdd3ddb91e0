//! Brickfall headless demo
//!
//! Runs a scripted level through the physics core with a paddle that tracks
//! the lowest ball, logging a summary every second of simulated time.
//!
//! Usage: `brickfall [casual|normal|hard|<tuning.json>]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use brickfall::{Difficulty, PhysicsTuning};

    env_logger::init();
    log::info!("Brickfall (headless) starting...");

    let tuning = match std::env::args().nth(1) {
        None => PhysicsTuning::default(),
        Some(arg) => match Difficulty::from_str(&arg) {
            Some(preset) => PhysicsTuning::from_preset(preset),
            None => match PhysicsTuning::load_from_file(&arg) {
                Ok(tuning) => tuning,
                Err(e) => {
                    log::error!("{e}");
                    std::process::exit(1);
                }
            },
        },
    };
    log::info!("Difficulty: {}", tuning.difficulty.as_str());

    demo::run(&tuning);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host game on the web; nothing to run here
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use brickfall::PhysicsTuning;
    use brickfall::consts::*;
    use brickfall::sim::{
        Boss, BossShape, Brick, EnemyKind, FrameConfig, Paddle, PowerUpKind, Rect, SimState, step_physics,
    };
    use glam::Vec2;

    const ARENA: Rect = Rect::new(0.0, 0.0, 480.0, 640.0);
    const PADDLE_TOP: f32 = 600.0;
    const MAX_TICKS: u64 = 60 * 120;
    const LEVEL: u32 = 1;

    fn build_level() -> SimState {
        let mut state = SimState::new(0xB01D);
        state.paddle = Some(Paddle::new(ARENA.center().x, PADDLE_TOP));

        for row in 0..5 {
            for col in 0..8 {
                let id = state.next_entity_id();
                let rect = Rect::new(24.0 + col as f32 * 54.0, 180.0 + row as f32 * 24.0, 50.0, 20.0);
                let mut brick = match (row, col) {
                    (2, 3) | (2, 4) => Brick::explosive(id, rect),
                    (4, 0) | (4, 7) => Brick::indestructible(id, rect),
                    _ => Brick::new(id, rect, 1 + (4 - row) / 2),
                };
                if (row, col) == (1, 1) {
                    brick.power_up = Some(PowerUpKind::Fireball);
                }
                state.bricks.push(brick);
            }
        }

        state.add_enemy(EnemyKind::Pyramid, Vec2::new(120.0, 340.0), Vec2::splat(14.0), Vec2::new(40.0, 0.0));
        state.add_enemy(EnemyKind::Cube, Vec2::new(360.0, 340.0), Vec2::splat(12.0), Vec2::new(-30.0, 0.0));

        let boss_id = state.next_entity_id();
        state.boss = Some(Boss::new(
            boss_id,
            BossShape::Circle { radius: 36.0 },
            Vec2::new(ARENA.center().x, 90.0),
            12,
        ));

        let ball = state.spawn_ball(Vec2::new(ARENA.center().x, PADDLE_TOP - 20.0), Vec2::ZERO);
        if let Some(b) = state.balls.iter_mut().find(|b| b.id == ball) {
            b.awaiting_launch = true;
            b.base_speed = BALL_START_SPEED;
            b.launch(0.0);
        }
        state
    }

    /// Keep the paddle under the lowest ball
    fn track_paddle(state: &mut SimState) {
        let Some(target_x) = state
            .balls
            .iter()
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .map(|b| b.pos.x)
        else {
            return;
        };
        if let Some(paddle) = state.paddle.as_mut() {
            let half = paddle.half_width();
            let x = target_x.clamp(ARENA.left() + half, ARENA.right() - half);
            paddle.rect.x = x - half;
        }
    }

    /// Drift enemies horizontally, bouncing off the arena sides
    fn move_enemies(state: &mut SimState, dt: f32) {
        for enemy in state.enemies.iter_mut() {
            enemy.center += enemy.vel * dt;
            if enemy.center.x - enemy.half_size.x < ARENA.left() || enemy.center.x + enemy.half_size.x > ARENA.right() {
                enemy.vel.x = -enemy.vel.x;
            }
        }
    }

    pub fn run(tuning: &PhysicsTuning) {
        let mut state = build_level();
        let mut total_events = 0u32;

        for tick in 0..MAX_TICKS {
            track_paddle(&mut state);
            move_enemies(&mut state, SIM_DT);

            let frame = FrameConfig::new(tick, ARENA, LEVEL);
            let result = step_physics(&mut state, &frame, tuning);
            total_events += result.stats.ccd_events;

            for hit in &result.boss_hits {
                log::debug!("tick {tick}: boss {} hit by ball {} ({:?})", hit.boss_id, hit.ball_id, hit.damage);
            }
            for pickup in &result.pickups {
                log::debug!("tick {tick}: {:?} dropped at {:?}", pickup.kind, pickup.pos);
            }

            if tick % 60 == 0 {
                log::info!(
                    "t={:>3}s score={} balls={} bricks_left={} enemies={} substeps={}",
                    tick / 60,
                    state.score,
                    state.balls.len(),
                    state.bricks.iter().filter(|b| b.counts_for_clear()).count(),
                    state.enemies.len(),
                    result.stats.substeps,
                );
            }

            if result.all_balls_lost {
                log::info!("All balls lost at tick {tick}");
                break;
            }
            if result.all_bricks_cleared {
                log::info!("Level cleared at tick {tick}");
                break;
            }
        }

        let boss_health = state.boss.as_ref().map_or(0, |b| b.health);
        log::info!(
            "Final score {} after {} collision events, boss health {}",
            state.score,
            total_events,
            boss_health
        );
    }
}
