//! Boss shapes and their analytic contact tests
//!
//! Bosses are not axis-aligned rectangles, so the CCD core cannot see them.
//! Each shape variant answers one question: given a ball center and radius,
//! is the ball touching, and if so along which normal and how deep.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};

use super::geometry::{Rect, closest_point_on_segment, safe_normal};
use crate::rotate;

/// One destructible shield ring of a hex boss
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShieldLayer {
    pub radius: f32,
    pub hp: u32,
}

/// Boss collision shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BossShape {
    Circle { radius: f32 },
    RotatedRect { half_extents: Vec2 },
    /// Equilateral triangle, apex up at rotation 0
    RotatedTriangle { circumradius: f32 },
    /// Shields ordered outermost first
    MultiShieldHex { shields: Vec<ShieldLayer>, core_radius: f32 },
}

/// Contact between a ball and a boss shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeContact {
    /// Unit normal pointing from the shape toward the ball
    pub normal: Vec2,
    /// How far the ball overlaps the surface
    pub penetration: f32,
    /// Surface point nearest the ball center
    pub point: Vec2,
}

/// What a counted hit did to the boss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossDamage {
    ShieldDamaged { layer: usize, remaining: u32 },
    ShieldBroken { layer: usize, core_exposed: bool },
    Damaged { health_left: u32 },
    Defeated,
}

/// A boss entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub id: u32,
    pub shape: BossShape,
    pub center: Vec2,
    /// Radians, counter-clockwise in screen space
    pub rotation: f32,
    pub health: u32,
    pub max_health: u32,
    /// Shared damage cooldown gate, written the moment a hit counts
    #[serde(default)]
    pub last_hit_ms: Option<f64>,
}

impl Boss {
    pub fn new(id: u32, shape: BossShape, center: Vec2, health: u32) -> Self {
        Self {
            id,
            shape,
            center,
            rotation: 0.0,
            health,
            max_health: health,
            last_hit_ms: None,
        }
    }

    pub fn alive(&self) -> bool {
        self.health > 0
    }

    /// Index of the outermost shield still standing
    pub fn active_shield(&self) -> Option<usize> {
        match &self.shape {
            BossShape::MultiShieldHex { shields, .. } => shields.iter().position(|s| s.hp > 0),
            _ => None,
        }
    }

    /// Hex boss with every shield down
    pub fn core_exposed(&self) -> bool {
        matches!(self.shape, BossShape::MultiShieldHex { .. }) && self.active_shield().is_none()
    }

    /// Triangle vertices in world space
    pub fn triangle_vertices(&self, circumradius: f32) -> [Vec2; 3] {
        let start = self.rotation - FRAC_PI_2;
        std::array::from_fn(|i| {
            let a = start + i as f32 * TAU / 3.0;
            self.center + Vec2::new(a.cos(), a.sin()) * circumradius
        })
    }

    /// Axis-aligned bounds of the current shape
    pub fn bounding_rect(&self) -> Rect {
        match &self.shape {
            BossShape::Circle { radius } => Rect::from_center(self.center, Vec2::splat(*radius)),
            BossShape::RotatedRect { half_extents } => {
                let (s, c) = self.rotation.sin_cos();
                let half = Vec2::new(
                    c.abs() * half_extents.x + s.abs() * half_extents.y,
                    s.abs() * half_extents.x + c.abs() * half_extents.y,
                );
                Rect::from_center(self.center, half)
            }
            BossShape::RotatedTriangle { circumradius } => {
                let [a, b, c] = self.triangle_vertices(*circumradius);
                Rect::from_points(a.min(b).min(c), a.max(b).max(c))
            }
            BossShape::MultiShieldHex {
                shields,
                core_radius,
            } => {
                let r = shields
                    .iter()
                    .filter(|s| s.hp > 0)
                    .map(|s| s.radius)
                    .fold(*core_radius, f32::max);
                Rect::from_center(self.center, Vec2::splat(r))
            }
        }
    }

    /// Characteristic diameter used to scale sweep sample density
    pub fn size(&self) -> f32 {
        let bounds = self.bounding_rect();
        bounds.w.max(bounds.h).max(1.0)
    }

    /// Analytic contact test against the true shape
    ///
    /// A hex boss with its core exposed never reports contact: balls pass
    /// through to the core mechanic instead.
    pub fn contact(&self, ball_pos: Vec2, ball_radius: f32) -> Option<ShapeContact> {
        match &self.shape {
            BossShape::Circle { radius } => circle_contact(self.center, *radius, ball_pos, ball_radius),
            BossShape::RotatedRect { half_extents } => {
                self.rect_contact(*half_extents, ball_pos, ball_radius)
            }
            BossShape::RotatedTriangle { circumradius } => {
                self.triangle_contact(*circumradius, ball_pos, ball_radius)
            }
            BossShape::MultiShieldHex { shields, .. } => {
                let shield = shields.iter().find(|s| s.hp > 0)?;
                circle_contact(self.center, shield.radius, ball_pos, ball_radius)
            }
        }
    }

    fn rect_contact(&self, half: Vec2, ball_pos: Vec2, ball_radius: f32) -> Option<ShapeContact> {
        let local = rotate(ball_pos - self.center, -self.rotation);
        let closest = local.clamp(-half, half);
        let diff = local - closest;
        let dist_sq = diff.length_squared();

        if dist_sq >= ball_radius * ball_radius {
            return None;
        }

        let (local_normal, penetration, surface) = if dist_sq > 1e-8 {
            let dist = dist_sq.sqrt();
            (diff / dist, ball_radius - dist, closest)
        } else {
            // Center inside the box: leave through the nearest face
            let depth_x = half.x - local.x.abs();
            let depth_y = half.y - local.y.abs();
            if depth_x < depth_y {
                let side = if local.x < 0.0 { -1.0 } else { 1.0 };
                (Vec2::new(side, 0.0), ball_radius + depth_x, Vec2::new(side * half.x, local.y))
            } else {
                let side = if local.y < 0.0 { -1.0 } else { 1.0 };
                (Vec2::new(0.0, side), ball_radius + depth_y, Vec2::new(local.x, side * half.y))
            }
        };

        Some(ShapeContact {
            normal: rotate(local_normal, self.rotation),
            penetration,
            point: self.center + rotate(surface, self.rotation),
        })
    }

    fn triangle_contact(&self, circumradius: f32, ball_pos: Vec2, ball_radius: f32) -> Option<ShapeContact> {
        let verts = self.triangle_vertices(circumradius);
        let centroid = self.center;

        let (nearest, dist) = (0..3)
            .map(|i| {
                let q = closest_point_on_segment(ball_pos, verts[i], verts[(i + 1) % 3]);
                (q, ball_pos.distance(q))
            })
            .fold((verts[0], f32::INFINITY), |best, cand| if cand.1 < best.1 { cand } else { best });

        let inside = point_in_triangle(ball_pos, &verts);
        if !inside && dist >= ball_radius {
            return None;
        }

        let mut normal = safe_normal(ball_pos - nearest, nearest, ball_pos, nearest - centroid);
        if normal.dot(nearest - centroid) < 0.0 {
            normal = -normal;
        }
        let penetration = if inside { ball_radius + dist } else { ball_radius - dist };

        Some(ShapeContact {
            normal,
            penetration,
            point: nearest,
        })
    }

    /// Whether a new hit counts at `now_ms`
    pub fn hit_ready(&self, now_ms: f64, cooldown_ms: f64) -> bool {
        self.last_hit_ms.is_none_or(|last| now_ms - last >= cooldown_ms)
    }

    /// Apply one counted hit: shields soak damage before health
    pub fn apply_hit(&mut self) -> BossDamage {
        if let BossShape::MultiShieldHex { shields, .. } = &mut self.shape {
            if let Some(layer) = shields.iter().position(|s| s.hp > 0) {
                shields[layer].hp -= 1;
                if shields[layer].hp > 0 {
                    return BossDamage::ShieldDamaged {
                        layer,
                        remaining: shields[layer].hp,
                    };
                }
                let core_exposed = shields.iter().all(|s| s.hp == 0);
                return BossDamage::ShieldBroken { layer, core_exposed };
            }
        }
        self.damage_health(1)
    }

    /// Core-hit mechanism for an exposed hex core, triggered by the caller
    pub fn hit_core(&mut self, amount: u32) -> Option<BossDamage> {
        self.core_exposed().then(|| self.damage_health(amount))
    }

    fn damage_health(&mut self, amount: u32) -> BossDamage {
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            BossDamage::Defeated
        } else {
            BossDamage::Damaged {
                health_left: self.health,
            }
        }
    }
}

fn circle_contact(center: Vec2, radius: f32, ball_pos: Vec2, ball_radius: f32) -> Option<ShapeContact> {
    let d = ball_pos - center;
    let combined = radius + ball_radius;
    let dist_sq = d.length_squared();
    if dist_sq >= combined * combined {
        return None;
    }
    let dist = dist_sq.sqrt();
    let normal = safe_normal(d, center, ball_pos, Vec2::ZERO);
    Some(ShapeContact {
        normal,
        penetration: combined - dist,
        point: center + normal * radius,
    })
}

fn point_in_triangle(p: Vec2, verts: &[Vec2; 3]) -> bool {
    let d1 = (verts[1] - verts[0]).perp_dot(p - verts[0]);
    let d2 = (verts[2] - verts[1]).perp_dot(p - verts[1]);
    let d3 = (verts[0] - verts[2]).perp_dot(p - verts[2]);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn hex(shields: &[u32]) -> Boss {
        let shields = shields
            .iter()
            .enumerate()
            .map(|(i, &hp)| ShieldLayer {
                radius: 80.0 - i as f32 * 15.0,
                hp,
            })
            .collect();
        Boss::new(
            9,
            BossShape::MultiShieldHex {
                shields,
                core_radius: 30.0,
            },
            Vec2::new(300.0, 200.0),
            10,
        )
    }

    #[test]
    fn test_circle_contact() {
        let boss = Boss::new(1, BossShape::Circle { radius: 40.0 }, Vec2::ZERO, 5);
        let c = boss.contact(Vec2::new(45.0, 0.0), 8.0).unwrap();
        assert_eq!(c.normal, Vec2::X);
        assert!((c.penetration - 3.0).abs() < 1e-5);
        assert!(boss.contact(Vec2::new(49.0, 0.0), 8.0).is_none());
    }

    #[test]
    fn test_rotated_rect_contact_in_local_frame() {
        let mut boss = Boss::new(
            1,
            BossShape::RotatedRect {
                half_extents: Vec2::new(50.0, 10.0),
            },
            Vec2::ZERO,
            5,
        );
        boss.rotation = FRAC_PI_4;
        // Along the rotated long axis, just past the short end
        let dir = Vec2::new(FRAC_PI_4.cos(), FRAC_PI_4.sin());
        let c = boss.contact(dir * 55.0, 8.0).unwrap();
        assert!((c.normal - dir).length() < 1e-4);
        assert!((c.penetration - 3.0).abs() < 1e-3);
        // An unrotated box would have reached this point; the rotated one does not
        assert!(boss.contact(Vec2::new(45.0, 0.0), 8.0).is_none());
    }

    #[test]
    fn test_rotated_rect_center_inside_fallback() {
        let boss = Boss::new(
            1,
            BossShape::RotatedRect {
                half_extents: Vec2::new(50.0, 20.0),
            },
            Vec2::ZERO,
            5,
        );
        let c = boss.contact(Vec2::new(0.0, 5.0), 8.0).unwrap();
        assert!((c.normal - Vec2::Y).length() < 1e-5);
        assert!(c.penetration > 8.0);
    }

    #[test]
    fn test_center_inside_near_long_face_pushes_clear() {
        let mut boss = Boss::new(
            1,
            BossShape::RotatedRect {
                half_extents: Vec2::new(50.0, 20.0),
            },
            Vec2::ZERO,
            5,
        );
        boss.rotation = 0.3;
        let local = Vec2::new(30.0, 15.0);
        let pos = rotate(local, boss.rotation);
        let c = boss.contact(pos, 8.0).unwrap();

        let expected = rotate(Vec2::Y, boss.rotation);
        assert!((c.normal - expected).length() < 1e-4);
        assert!((c.penetration - 13.0).abs() < 1e-3);

        let corrected = pos + c.normal * (c.penetration + 0.01);
        assert!(boss.contact(corrected, 8.0).is_none());
    }

    #[test]
    fn test_triangle_contact_normal_points_away_from_centroid() {
        let boss = Boss::new(1, BossShape::RotatedTriangle { circumradius: 60.0 }, Vec2::ZERO, 5);
        // Below the flat bottom edge (y = +30 for apex-up triangle in y-down space)
        let c = boss.contact(Vec2::new(0.0, 36.0), 8.0).unwrap();
        assert!(c.normal.y > 0.99);
        assert!((c.penetration - 2.0).abs() < 1e-3);
        // Ball center inside the triangle
        let inside = boss.contact(Vec2::new(0.0, 20.0), 8.0).unwrap();
        assert!(inside.normal.y > 0.99);
        assert!(inside.penetration > 8.0);
        assert!(boss.contact(Vec2::new(0.0, 50.0), 8.0).is_none());
    }

    #[test]
    fn test_hex_uses_active_shield_and_exposed_core_disables_contact() {
        let mut boss = hex(&[1, 1]);
        let probe = Vec2::new(300.0 + 85.0, 200.0);
        assert!(boss.contact(probe, 8.0).is_some());

        assert_eq!(
            boss.apply_hit(),
            BossDamage::ShieldBroken {
                layer: 0,
                core_exposed: false
            }
        );
        // Outer ring gone, inner ring (65) is now the surface
        assert!(boss.contact(probe, 8.0).is_none());
        assert!(boss.contact(Vec2::new(300.0 + 70.0, 200.0), 8.0).is_some());

        assert_eq!(
            boss.apply_hit(),
            BossDamage::ShieldBroken {
                layer: 1,
                core_exposed: true
            }
        );
        assert!(boss.core_exposed());
        assert!(boss.contact(Vec2::new(300.0, 200.0), 8.0).is_none());
        assert_eq!(boss.health, 10);
        assert_eq!(boss.hit_core(3), Some(BossDamage::Damaged { health_left: 7 }));
    }

    #[test]
    fn test_hit_cooldown_gate() {
        let mut boss = Boss::new(1, BossShape::Circle { radius: 10.0 }, Vec2::ZERO, 2);
        assert!(boss.hit_ready(0.0, 250.0));
        boss.last_hit_ms = Some(100.0);
        assert!(!boss.hit_ready(200.0, 250.0));
        assert!(boss.hit_ready(350.0, 250.0));
        assert_eq!(boss.apply_hit(), BossDamage::Damaged { health_left: 1 });
        assert_eq!(boss.apply_hit(), BossDamage::Defeated);
        assert!(!boss.alive());
    }

    #[test]
    fn test_bounding_rect_of_rotated_rect() {
        let mut boss = Boss::new(
            1,
            BossShape::RotatedRect {
                half_extents: Vec2::new(10.0, 10.0),
            },
            Vec2::ZERO,
            1,
        );
        boss.rotation = FRAC_PI_4;
        let r = boss.bounding_rect();
        assert!((r.w - 20.0 * std::f32::consts::SQRT_2).abs() < 1e-3);
    }
}
