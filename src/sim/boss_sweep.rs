//! Boss-first sampled sweep
//!
//! Boss shapes are rotated and curved, so instead of an analytic TOI the
//! ball's straight-line path for the frame is sampled at a density scaled to
//! speed versus boss size, and each sample runs the shape's contact test.

use glam::Vec2;

use super::boss::Boss;
use super::geometry::reflect;
use super::state::Ball;
use crate::consts::*;

/// A boss contact found by the sampled sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossContact {
    pub boss_id: u32,
    pub ball_id: u32,
    /// Fraction of the frame at which the hit sample sits
    pub fraction: f32,
    /// Surface point on the boss
    pub point: Vec2,
    pub normal: Vec2,
    /// The shared damage cooldown had elapsed; the caller applies the hit
    pub counted: bool,
}

/// Number of path samples for this ball against this boss
pub fn boss_sample_count(ball: &Ball, dt: f32, boss: &Boss) -> u32 {
    let travel = ball.speed() * dt.max(0.0);
    let extra = (8.0 * travel / boss.size()).ceil();
    let extra = if extra.is_finite() { extra as u32 } else { BOSS_MAX_SAMPLES };
    (BOSS_MIN_SAMPLES + extra).clamp(BOSS_MIN_SAMPLES, BOSS_MAX_SAMPLES)
}

/// Sweep `ball` across `dt` against `boss`
///
/// On the first sample where the ball overlaps the boss while moving into it,
/// the ball is pushed back onto the surface at that sample and its velocity
/// reflected; the remaining samples are skipped. When the cooldown allows
/// damage, `boss.last_hit_ms` is written before returning so a second ball in
/// the same frame cannot count.
pub fn sweep_boss(ball: &mut Ball, dt: f32, boss: &mut Boss, now_ms: f64, cooldown_ms: f64) -> Option<BossContact> {
    if !boss.alive() || boss.core_exposed() || ball.awaiting_launch {
        return None;
    }

    let samples = boss_sample_count(ball, dt, boss);
    let start = ball.pos;
    let travel = ball.vel * dt;

    for i in 0..samples {
        let fraction = i as f32 / (samples - 1) as f32;
        let pos = start + travel * fraction;
        let Some(contact) = boss.contact(pos, ball.radius) else {
            continue;
        };
        if ball.vel.dot(contact.normal) >= 0.0 {
            // Overlapping but already separating
            continue;
        }

        ball.pos = pos + contact.normal * (contact.penetration + NUDGE_FRACTION * ball.radius);
        ball.vel = reflect(ball.vel, contact.normal);

        let counted = boss.hit_ready(now_ms, cooldown_ms);
        if counted {
            boss.last_hit_ms = Some(now_ms);
        }

        return Some(BossContact {
            boss_id: boss.id,
            ball_id: ball.id,
            fraction,
            point: contact.point,
            normal: contact.normal,
            counted,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boss::{BossShape, ShieldLayer};

    fn circle_boss() -> Boss {
        Boss::new(50, BossShape::Circle { radius: 40.0 }, Vec2::new(200.0, 100.0), 10)
    }

    #[test]
    fn test_sample_count_scales_with_speed() {
        let boss = circle_boss();
        let slow = Ball::new(1, Vec2::ZERO, Vec2::new(0.0, 60.0));
        assert_eq!(boss_sample_count(&slow, 1.0 / 60.0, &boss), 6);
        let fast = Ball::new(1, Vec2::ZERO, Vec2::new(0.0, 6000.0));
        assert_eq!(boss_sample_count(&fast, 1.0 / 60.0, &boss), BOSS_MAX_SAMPLES);
        let still = Ball::new(1, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(boss_sample_count(&still, 1.0 / 60.0, &boss), BOSS_MIN_SAMPLES);
    }

    #[test]
    fn test_hit_reflects_and_writes_cooldown() {
        let mut boss = circle_boss();
        let mut ball = Ball::new(1, Vec2::new(200.0, 160.0), Vec2::new(0.0, -600.0));
        let contact = sweep_boss(&mut ball, 0.05, &mut boss, 1000.0, BOSS_HIT_COOLDOWN_MS).unwrap();

        assert!(contact.counted);
        assert_eq!(boss.last_hit_ms, Some(1000.0));
        assert!(contact.fraction > 0.0 && contact.fraction <= 1.0);
        assert!(ball.vel.y > 0.0);
        assert!((ball.speed() - 600.0).abs() < 1e-3);
        // Pushed back outside the combined radius
        assert!(ball.pos.distance(boss.center) >= 48.0);
    }

    #[test]
    fn test_second_ball_same_frame_is_not_counted() {
        let mut boss = circle_boss();
        let mut a = Ball::new(1, Vec2::new(200.0, 160.0), Vec2::new(0.0, -600.0));
        let mut b = Ball::new(2, Vec2::new(260.0, 100.0), Vec2::new(-600.0, 0.0));
        let first = sweep_boss(&mut a, 0.05, &mut boss, 1000.0, BOSS_HIT_COOLDOWN_MS).unwrap();
        let second = sweep_boss(&mut b, 0.05, &mut boss, 1000.0, BOSS_HIT_COOLDOWN_MS).unwrap();
        assert!(first.counted);
        assert!(!second.counted);
        // Still reflected
        assert!(b.vel.x > 0.0);
    }

    #[test]
    fn test_separating_ball_passes() {
        let mut boss = circle_boss();
        let mut ball = Ball::new(1, Vec2::new(200.0, 145.0), Vec2::new(0.0, 600.0));
        assert!(sweep_boss(&mut ball, 0.05, &mut boss, 0.0, BOSS_HIT_COOLDOWN_MS).is_none());
        assert_eq!(ball.vel, Vec2::new(0.0, 600.0));
    }

    #[test]
    fn test_exposed_core_disables_sweep() {
        let mut boss = Boss::new(
            5,
            BossShape::MultiShieldHex {
                shields: vec![ShieldLayer { radius: 60.0, hp: 0 }],
                core_radius: 20.0,
            },
            Vec2::new(200.0, 100.0),
            10,
        );
        let mut ball = Ball::new(1, Vec2::new(200.0, 140.0), Vec2::new(0.0, -600.0));
        assert!(sweep_boss(&mut ball, 0.05, &mut boss, 0.0, BOSS_HIT_COOLDOWN_MS).is_none());
        assert_eq!(ball.vel.y, -600.0);
    }

    #[test]
    fn test_triangle_hit_from_below() {
        let mut boss = Boss::new(3, BossShape::RotatedTriangle { circumradius: 60.0 }, Vec2::new(200.0, 100.0), 4);
        let mut ball = Ball::new(1, Vec2::new(200.0, 170.0), Vec2::new(0.0, -900.0));
        let contact = sweep_boss(&mut ball, 0.05, &mut boss, 0.0, BOSS_HIT_COOLDOWN_MS).unwrap();
        assert!(contact.normal.y > 0.99);
        assert!(ball.vel.y > 0.0);
    }

    #[test]
    fn test_dead_boss_is_ignored() {
        let mut boss = circle_boss();
        boss.health = 0;
        let mut ball = Ball::new(1, Vec2::new(200.0, 160.0), Vec2::new(0.0, -600.0));
        assert!(sweep_boss(&mut ball, 0.05, &mut boss, 0.0, BOSS_HIT_COOLDOWN_MS).is_none());
    }
}
