//! Swept-circle continuous collision detection
//!
//! Advances one ball through a time slice. The slice is split into substeps
//! (never longer than a fraction of the smallest obstacle), and each substep
//! is resolved by repeatedly finding the earliest time of impact against the
//! walls, the paddle top and the candidate obstacles, reflecting, and
//! continuing with whatever time is left.
//!
//! The sweep works on a snapshot and never mutates game state: it returns the
//! ball's end-of-slice motion plus every collision it saw, in time order.

use glam::Vec2;

use super::events::{CollisionEvent, HitTarget, WallSide};
use super::geometry::{Rect, ray_swept_aabb, reflect, safe_normal, segment_circle_toi};
use super::state::{Ball, Paddle};
use crate::consts::*;

/// Slack allowed when deciding whether a ball was above the paddle
const PADDLE_GATE_SLOP: f32 = 2.0;
/// Obstacles thinner than this are ignored when sizing substeps
const MIN_SIZING_DIMENSION: f32 = 0.5;

/// Where a CCD obstacle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleSource {
    Brick(u32),
    Enemy(u32),
    BossHitbox(u32),
}

/// Rectangular obstacle as the CCD core sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub source: ObstacleSource,
    pub rect: Rect,
    pub indestructible: bool,
}

impl Obstacle {
    pub fn target(&self) -> HitTarget {
        match self.source {
            ObstacleSource::Brick(id) => HitTarget::Brick(id),
            ObstacleSource::Enemy(id) => HitTarget::Enemy(id),
            ObstacleSource::BossHitbox(id) => HitTarget::BossHitbox(id),
        }
    }

    /// Fireballs burn through ordinary bricks only
    fn fireball_passes(&self) -> bool {
        matches!(self.source, ObstacleSource::Brick(_)) && !self.indestructible
    }
}

/// Read-only snapshot the sweep runs against
#[derive(Debug, Clone, Copy)]
pub struct SweepWorld<'a> {
    /// Arena bounds; the bottom edge is the open floor
    pub bounds: Rect,
    pub paddle: Option<&'a Paddle>,
    pub obstacles: &'a [Obstacle],
    /// Maximum paddle exit angle from vertical, radians
    pub paddle_max_angle: f32,
    /// Emit per-hit trace logging
    pub trace: bool,
}

impl SweepWorld<'_> {
    /// Smallest dimension any substep must not outrun
    pub fn min_dimension(&self, ball_radius: f32) -> f32 {
        let obstacles = self.obstacles.iter().map(|o| o.rect.min_dimension());
        let paddle = self.paddle.map(|p| p.rect.min_dimension());
        obstacles
            .chain(paddle)
            .chain(std::iter::once(ball_radius * 2.0))
            .filter(|d| *d >= MIN_SIZING_DIMENSION)
            .fold(f32::INFINITY, f32::min)
            .min(self.bounds.min_dimension().max(MIN_SIZING_DIMENSION))
    }
}

/// Ball state at the end of a sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallMotion {
    pub pos: Vec2,
    pub vel: Vec2,
}

/// Result of sweeping one ball
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// `None` when the sweep produced a non-finite state; the ball should be dropped
    pub end: Option<BallMotion>,
    /// Events with `toi` relative to this sweep's slice
    pub events: Vec<CollisionEvent>,
    pub substeps: u32,
}

/// Earliest contact found during one resolve iteration
#[derive(Debug, Clone, Copy)]
struct Contact {
    t: f32,
    normal: Vec2,
    target: HitTarget,
    point: Vec2,
    pass_through: bool,
}

/// Exit velocity for a flat-top paddle bounce
///
/// The angle from vertical is a clamped linear function of the normalized
/// impact offset; the result always points up with magnitude `speed`.
pub fn paddle_exit_velocity(paddle: &Paddle, impact_x: f32, speed: f32, max_angle: f32) -> Vec2 {
    let angle = paddle.impact_offset(impact_x) * max_angle;
    let (s, c) = angle.sin_cos();
    Vec2::new(s * speed, -c * speed)
}

/// Substeps needed so no step travels further than `MAX_STEP_FRACTION` of the smallest obstacle
pub fn effective_substeps(ball: &Ball, dt: f32, requested: u32, world: &SweepWorld) -> u32 {
    let travel = ball.vel.length() * dt.max(0.0);
    let limit = MAX_STEP_FRACTION * world.min_dimension(ball.radius);
    let needed = (travel / limit).ceil() as u32;
    requested.max(needed).clamp(1, MAX_CCD_SUBSTEPS)
}

/// Advance `ball` through `dt` seconds against `world`
///
/// `prev_y` is the ball's Y at the start of the frame; the paddle only
/// catches balls that were above it then.
pub fn sweep_ball(ball: &Ball, prev_y: f32, dt: f32, substeps: u32, world: &SweepWorld) -> SweepOutcome {
    let mut pos = ball.pos;
    let mut vel = ball.vel;
    let mut events = Vec::new();

    if dt <= 0.0 || ball.awaiting_launch {
        return SweepOutcome {
            end: Some(BallMotion { pos, vel }),
            events,
            substeps: 0,
        };
    }

    let substeps = effective_substeps(ball, dt, substeps, world);
    let step_dt = dt / substeps as f32;
    let mut burned: Vec<HitTarget> = Vec::new();
    let speed = if ball.base_speed > 0.0 {
        ball.base_speed
    } else {
        ball.speed()
    };

    for step in 0..substeps {
        let mut remaining = 1.0f32;
        let mut bounces = 0;
        let mut guard = MAX_RESOLVE_ITERATIONS as usize + world.obstacles.len();

        while remaining > 0.0 && bounces < MAX_RESOLVE_ITERATIONS && guard > 0 {
            guard -= 1;
            let p0 = pos;
            let p1 = pos + vel * step_dt * remaining;

            let Some(contact) = earliest_contact(ball, p0, p1, vel, prev_y, world, &burned) else {
                pos = p1;
                remaining = 0.0;
                break;
            };

            let center = p0 + (p1 - p0) * contact.t;
            let toi = (step as f32 + (1.0 - remaining) + remaining * contact.t) / substeps as f32;
            events.push(CollisionEvent {
                ball_id: ball.id,
                toi: toi.clamp(0.0, 1.0),
                normal: contact.normal,
                target: contact.target,
                point: contact.point,
                pass_through: contact.pass_through,
            });
            remaining *= 1.0 - contact.t;

            if world.trace {
                log::trace!(
                    "ball {} hit {:?} at toi {:.4} normal {:?}",
                    ball.id,
                    contact.target,
                    toi,
                    contact.normal
                );
            }

            if contact.pass_through {
                burned.push(contact.target);
                pos = center;
                continue;
            }

            vel = match (contact.target, world.paddle) {
                (HitTarget::Paddle, Some(paddle)) => {
                    paddle_exit_velocity(paddle, center.x, speed, world.paddle_max_angle)
                }
                _ => reflect(vel, contact.normal),
            };
            pos = center + contact.normal * (NUDGE_FRACTION * ball.radius);
            bounces += 1;
        }
    }

    let end = (pos.is_finite() && vel.is_finite()).then_some(BallMotion { pos, vel });
    if end.is_none() {
        log::warn!("ball {} produced a non-finite state, dropping", ball.id);
    }

    SweepOutcome {
        end,
        events,
        substeps,
    }
}

fn earliest_contact(
    ball: &Ball,
    p0: Vec2,
    p1: Vec2,
    vel: Vec2,
    prev_y: f32,
    world: &SweepWorld,
    burned: &[HitTarget],
) -> Option<Contact> {
    let r = ball.radius;
    let mut best: Option<Contact> = None;
    let mut consider = |c: Contact| {
        if best.is_none_or(|b| c.t < b.t) {
            best = Some(c);
        }
    };

    for contact in wall_contacts(p0, p1, vel, r, &world.bounds) {
        consider(contact);
    }

    if let Some(paddle) = world.paddle {
        if let Some(contact) = paddle_contact(p0, p1, vel, r, prev_y, paddle) {
            consider(contact);
        }
    }

    let path = Rect::from_points(p0, p1).expand(r);
    for obstacle in world.obstacles {
        if !path.overlaps(&obstacle.rect) {
            continue;
        }
        let target = obstacle.target();
        if burned.contains(&target) {
            continue;
        }
        if let Some(hit) = rect_contact(p0, p1, vel, r, &obstacle.rect) {
            consider(Contact {
                t: hit.t,
                normal: hit.normal,
                target,
                point: hit.point,
                pass_through: ball.fireball && obstacle.fireball_passes(),
            });
        }
    }

    best
}

fn wall_contacts(p0: Vec2, p1: Vec2, vel: Vec2, r: f32, bounds: &Rect) -> Vec<Contact> {
    let mut out = Vec::with_capacity(2);
    let crossing = |from: f32, to: f32, plane: f32| -> f32 {
        if (from - to).abs() < f32::EPSILON {
            0.0
        } else {
            ((from - plane) / (from - to)).clamp(0.0, 1.0)
        }
    };

    let left = bounds.left() + r;
    if vel.x < 0.0 && p1.x < left {
        let t = if p0.x <= left { 0.0 } else { crossing(p0.x, p1.x, left) };
        let y = p0.y + (p1.y - p0.y) * t;
        out.push(Contact {
            t,
            normal: Vec2::X,
            target: HitTarget::Wall(WallSide::Left),
            point: Vec2::new(bounds.left(), y),
            pass_through: false,
        });
    }

    let right = bounds.right() - r;
    if vel.x > 0.0 && p1.x > right {
        let t = if p0.x >= right { 0.0 } else { crossing(p0.x, p1.x, right) };
        let y = p0.y + (p1.y - p0.y) * t;
        out.push(Contact {
            t,
            normal: Vec2::NEG_X,
            target: HitTarget::Wall(WallSide::Right),
            point: Vec2::new(bounds.right(), y),
            pass_through: false,
        });
    }

    let top = bounds.top() + r;
    if vel.y < 0.0 && p1.y < top {
        let t = if p0.y <= top { 0.0 } else { crossing(p0.y, p1.y, top) };
        let x = p0.x + (p1.x - p0.x) * t;
        out.push(Contact {
            t,
            normal: Vec2::Y,
            target: HitTarget::Wall(WallSide::Top),
            point: Vec2::new(x, bounds.top()),
            pass_through: false,
        });
    }

    out
}

/// Paddle top surface and top corners, for balls falling onto it from above
fn paddle_contact(p0: Vec2, p1: Vec2, vel: Vec2, r: f32, prev_y: f32, paddle: &Paddle) -> Option<Contact> {
    let top = paddle.rect.top();
    let was_above = prev_y + r <= top + PADDLE_GATE_SLOP && p0.y <= top;
    if vel.y <= 0.0 || !was_above {
        return None;
    }

    let hit = rect_contact(p0, p1, vel, r, &paddle.rect)?;
    if hit.corner {
        // Only the upward-facing half of the top corners counts
        (hit.normal.y < 0.0).then_some(Contact {
            t: hit.t,
            normal: hit.normal,
            target: HitTarget::PaddleCorner,
            point: hit.point,
            pass_through: false,
        })
    } else {
        (hit.normal == Vec2::NEG_Y).then_some(Contact {
            t: hit.t,
            normal: hit.normal,
            target: HitTarget::Paddle,
            point: hit.point,
            pass_through: false,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct RectHit {
    t: f32,
    normal: Vec2,
    point: Vec2,
    corner: bool,
}

/// Time of impact of a radius-`r` circle moving `p0 -> p1` against a rectangle with rounded corners
fn rect_contact(p0: Vec2, p1: Vec2, vel: Vec2, r: f32, rect: &Rect) -> Option<RectHit> {
    let expanded = rect.expand(r);
    let hit = ray_swept_aabb(p0, p1, &expanded)?;
    let d = p1 - p0;
    let t_face = hit.t_enter.max(0.0);
    let at_face = p0 + d * t_face;

    if let Some(corner) = rect.corner_region(at_face) {
        let t = segment_circle_toi(p0, p1, corner, r)?;
        let center = p0 + d * t;
        let normal = safe_normal(center - corner, corner, center, vel);
        if t == 0.0 && d.dot(normal) >= 0.0 {
            // Overlapping the corner but already leaving
            return None;
        }
        return Some(RectHit {
            t,
            normal,
            point: corner,
            corner: true,
        });
    }

    let normal = if hit.starts_inside() {
        inside_normal(&expanded, p0)
    } else {
        hit.normal
    };
    if hit.starts_inside() && d.dot(normal) >= 0.0 {
        return None;
    }

    Some(RectHit {
        t: t_face,
        normal,
        point: at_face - normal * r,
        corner: false,
    })
}

/// Outward normal of the face nearest to a point inside `rect`
fn inside_normal(rect: &Rect, p: Vec2) -> Vec2 {
    let faces = [
        (p.x - rect.left(), Vec2::NEG_X),
        (rect.right() - p.x, Vec2::X),
        (p.y - rect.top(), Vec2::NEG_Y),
        (rect.bottom() - p.y, Vec2::Y),
    ];
    faces
        .iter()
        .fold((f32::INFINITY, Vec2::NEG_Y), |best, &(depth, n)| {
            if depth < best.0 { (depth, n) } else { best }
        })
        .1
}
