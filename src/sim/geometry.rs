//! Geometry primitives for swept collision
//!
//! Pure math with no game knowledge: rectangles, the slab test against a
//! radius-expanded AABB, and the moving-point-vs-circle time of impact used
//! to curve the ball around rectangle corners.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Deltas below this are treated as "not moving along the axis"
const AXIS_EPSILON: f32 = 1e-9;
/// Entry times closer than this count as a simultaneous-axis hit
const TIE_EPSILON: f32 = 1e-6;
/// Relative tolerance for treating a slightly negative discriminant as tangent
const DISCRIMINANT_TOLERANCE: f32 = 1e-5;

/// Axis-aligned rectangle (top-left origin, +y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle centered on `center` with the given half extents
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self::new(center.x - half.x, center.y - half.y, half.x * 2.0, half.y * 2.0)
    }

    /// Smallest rectangle containing both points
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    #[inline]
    pub fn min_dimension(&self) -> f32 {
        self.w.min(self.h)
    }

    /// Grow every side by `amount` (Minkowski sum with a square of that half size)
    pub fn expand(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.w + amount * 2.0,
            self.h + amount * 2.0,
        )
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && self.right() >= other.left()
            && self.top() <= other.bottom()
            && self.bottom() >= other.top()
    }

    /// Corner nearest to `p` when `p` lies outside the rectangle on both axes
    ///
    /// Returns `None` when `p` is within the rectangle's x or y extent, i.e. it
    /// is facing one of the flat sides.
    pub fn corner_region(&self, p: Vec2) -> Option<Vec2> {
        let cx = if p.x < self.left() {
            self.left()
        } else if p.x > self.right() {
            self.right()
        } else {
            return None;
        };
        let cy = if p.y < self.top() {
            self.top()
        } else if p.y > self.bottom() {
            self.bottom()
        } else {
            return None;
        };
        Some(Vec2::new(cx, cy))
    }
}

/// Result of a swept slab test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Fraction of the segment where the point enters the box (may be < 0 if it starts inside)
    pub t_enter: f32,
    /// Fraction of the segment where the point leaves the box
    pub t_exit: f32,
    /// Axis-aligned face normal of the entry face
    pub normal: Vec2,
}

impl SweepHit {
    /// True when the segment starts inside the box
    #[inline]
    pub fn starts_inside(&self) -> bool {
        self.t_enter < 0.0
    }
}

fn slab(origin: f32, delta: f32, min: f32, max: f32) -> Option<(f32, f32)> {
    if delta.abs() < AXIS_EPSILON {
        if origin < min || origin > max {
            return None;
        }
        return Some((f32::NEG_INFINITY, f32::INFINITY));
    }
    let t1 = (min - origin) / delta;
    let t2 = (max - origin) / delta;
    Some((t1.min(t2), t1.max(t2)))
}

/// Slab test of the segment `p0 -> p1` against an AABB
///
/// The box is expected to be pre-expanded by the ball radius, so the segment
/// is the path of the ball's center. Returns `None` for zero-length segments
/// and for segments that never touch the box within `[0, 1]`.
///
/// When both axes are entered at the same time (a perfect diagonal into a
/// corner) the normal follows the segment's dominant movement axis.
pub fn ray_swept_aabb(p0: Vec2, p1: Vec2, aabb: &Rect) -> Option<SweepHit> {
    let d = p1 - p0;
    if d.length_squared() < AXIS_EPSILON {
        return None;
    }

    let (tx_enter, tx_exit) = slab(p0.x, d.x, aabb.left(), aabb.right())?;
    let (ty_enter, ty_exit) = slab(p0.y, d.y, aabb.top(), aabb.bottom())?;

    let t_enter = tx_enter.max(ty_enter);
    let t_exit = tx_exit.min(ty_exit);

    if t_enter > t_exit || t_exit < 0.0 || t_enter > 1.0 {
        return None;
    }

    let x_axis = if (tx_enter - ty_enter).abs() <= TIE_EPSILON {
        d.x.abs() >= d.y.abs()
    } else {
        tx_enter > ty_enter
    };

    let normal = if x_axis {
        Vec2::new(-d.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, -d.y.signum())
    };

    Some(SweepHit {
        t_enter,
        t_exit,
        normal,
    })
}

/// Smallest `t` in [0, 1] at which the point moving `p0 -> p1` is within `r` of `center`
///
/// Used for rectangle corners, which the expanded-AABB test alone treats as
/// square. A point that already starts within `r` returns `Some(0.0)`.
pub fn segment_circle_toi(p0: Vec2, p1: Vec2, center: Vec2, r: f32) -> Option<f32> {
    let d = p1 - p0;
    let f = p0 - center;
    let c = f.length_squared() - r * r;

    if c <= 0.0 {
        return Some(0.0);
    }

    let a = d.length_squared();
    if a < AXIS_EPSILON {
        // Zero-length segment outside the circle never touches it
        return None;
    }

    let b = 2.0 * f.dot(d);
    if b >= 0.0 {
        // Moving away from (or parallel past) the center
        return None;
    }

    let mut disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        if disc < -DISCRIMINANT_TOLERANCE * b * b {
            return None;
        }
        // Grazing hit; treat as exactly tangent
        disc = 0.0;
    }

    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect(vel: Vec2, normal: Vec2) -> Vec2 {
    vel - 2.0 * vel.dot(normal) * normal
}

/// Normalize a resolved normal, falling back when it is (nearly) zero
///
/// The first fallback is the vector from the contact point to the ball
/// center, the second is the reversed velocity, the last resort is "up".
pub fn safe_normal(candidate: Vec2, contact: Vec2, center: Vec2, vel: Vec2) -> Vec2 {
    if candidate.length_squared() > 1e-8 {
        return candidate.normalize();
    }
    let outward = center - contact;
    if outward.length_squared() > 1e-8 {
        return outward.normalize();
    }
    let back = -vel;
    if back.length_squared() > 1e-8 {
        return back.normalize();
    }
    Vec2::NEG_Y
}

/// Closest point to `p` on the segment `a -> b`
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-8 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ray_swept_aabb_hits_top_face() {
        let aabb = Rect::new(0.0, 0.0, 100.0, 20.0);
        let hit = ray_swept_aabb(Vec2::new(50.0, -50.0), Vec2::new(50.0, 50.0), &aabb).unwrap();
        assert!((hit.t_enter - 0.5).abs() < 1e-5);
        assert_eq!(hit.normal, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_ray_swept_aabb_hits_left_face() {
        let aabb = Rect::new(0.0, 0.0, 20.0, 100.0);
        let hit = ray_swept_aabb(Vec2::new(-40.0, 50.0), Vec2::new(10.0, 50.0), &aabb).unwrap();
        assert!((hit.t_enter - 0.8).abs() < 1e-5);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_ray_swept_aabb_miss() {
        let aabb = Rect::new(0.0, 0.0, 20.0, 20.0);
        assert!(ray_swept_aabb(Vec2::new(-10.0, 50.0), Vec2::new(50.0, 50.0), &aabb).is_none());
        // Stops short of the box
        assert!(ray_swept_aabb(Vec2::new(10.0, -50.0), Vec2::new(10.0, -10.0), &aabb).is_none());
    }

    #[test]
    fn test_ray_swept_aabb_zero_length() {
        let aabb = Rect::new(0.0, 0.0, 20.0, 20.0);
        assert!(ray_swept_aabb(Vec2::new(10.0, 10.0), Vec2::new(10.0, 10.0), &aabb).is_none());
    }

    #[test]
    fn test_ray_swept_aabb_diagonal_tie_uses_dominant_axis() {
        let aabb = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Enters both slabs at t = 0.5, moves mostly along x
        let hit = ray_swept_aabb(Vec2::new(-10.0, -5.0), Vec2::new(10.0, 5.0), &aabb).unwrap();
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));

        // Enters both slabs at t = 0.5, moves mostly along y
        let hit = ray_swept_aabb(Vec2::new(-5.0, -10.0), Vec2::new(5.0, 10.0), &aabb).unwrap();
        assert_eq!(hit.normal, Vec2::new(0.0, -1.0));

        // x enters at 0.5, y at 0.625: y wins outright
        let hit = ray_swept_aabb(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 6.0), &aabb).unwrap();
        assert_eq!(hit.normal, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_segment_circle_toi_head_on() {
        let t = segment_circle_toi(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), Vec2::new(60.0, 0.0), 10.0)
            .unwrap();
        assert!((t - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_segment_circle_toi_miss_and_away() {
        assert!(segment_circle_toi(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(50.0, 30.0), 10.0).is_none());
        // Moving away
        assert!(segment_circle_toi(Vec2::new(20.0, 0.0), Vec2::new(100.0, 0.0), Vec2::ZERO, 10.0).is_none());
    }

    #[test]
    fn test_segment_circle_toi_degenerate() {
        // Zero length, outside
        assert!(segment_circle_toi(Vec2::new(20.0, 0.0), Vec2::new(20.0, 0.0), Vec2::ZERO, 10.0).is_none());
        // Zero length, inside
        assert_eq!(segment_circle_toi(Vec2::new(5.0, 0.0), Vec2::new(5.0, 0.0), Vec2::ZERO, 10.0), Some(0.0));
    }

    #[test]
    fn test_segment_circle_toi_tangent() {
        // Passes exactly tangent to the circle
        let t = segment_circle_toi(Vec2::new(-50.0, 10.0), Vec2::new(50.0, 10.0), Vec2::ZERO, 10.0);
        let t = t.expect("tangent path should register");
        assert!((t - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_corner_region() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.corner_region(Vec2::new(-1.0, -1.0)), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(r.corner_region(Vec2::new(12.0, 11.0)), Some(Vec2::new(10.0, 10.0)));
        assert_eq!(r.corner_region(Vec2::new(5.0, -3.0)), None);
    }

    #[test]
    fn test_safe_normal_fallbacks() {
        let n = safe_normal(Vec2::ZERO, Vec2::new(0.0, 0.0), Vec2::new(0.0, -5.0), Vec2::X);
        assert_eq!(n, Vec2::new(0.0, -1.0));
        let n = safe_normal(Vec2::ZERO, Vec2::ZERO, Vec2::ZERO, Vec2::new(3.0, 0.0));
        assert_eq!(n, Vec2::new(-1.0, 0.0));
        assert_eq!(safe_normal(Vec2::ZERO, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO), Vec2::NEG_Y);
    }

    #[test]
    fn test_closest_point_on_segment() {
        let p = closest_point_on_segment(Vec2::new(5.0, 5.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(p, Vec2::new(5.0, 0.0));
        let p = closest_point_on_segment(Vec2::new(-5.0, 5.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(p, Vec2::ZERO);
    }

    proptest! {
        #[test]
        fn prop_reflect_preserves_speed(vx in -1000.0f32..1000.0, vy in -1000.0f32..1000.0, angle in 0.0f32..std::f32::consts::TAU) {
            let v = Vec2::new(vx, vy);
            let n = Vec2::new(angle.cos(), angle.sin());
            let r = reflect(v, n);
            prop_assert!((r.length() - v.length()).abs() <= 1e-3 * v.length().max(1.0));
        }

        #[test]
        fn prop_segment_circle_toi_lands_on_circle(
            sx in -200.0f32..-50.0, sy in -40.0f32..40.0,
            ex in 50.0f32..200.0, ey in -40.0f32..40.0,
            r in 5.0f32..30.0,
        ) {
            let p0 = Vec2::new(sx, sy);
            let p1 = Vec2::new(ex, ey);
            if let Some(t) = segment_circle_toi(p0, p1, Vec2::ZERO, r) {
                prop_assert!((0.0..=1.0).contains(&t));
                let p = p0 + (p1 - p0) * t;
                prop_assert!((p.length() - r).abs() < 0.1);
            }
        }

        #[test]
        fn prop_ray_swept_aabb_normal_is_axis_aligned(
            sx in -100.0f32..100.0, sy in -100.0f32..100.0,
            ex in -100.0f32..100.0, ey in -100.0f32..100.0,
        ) {
            let aabb = Rect::new(-20.0, -10.0, 40.0, 20.0);
            if let Some(hit) = ray_swept_aabb(Vec2::new(sx, sy), Vec2::new(ex, ey), &aabb) {
                prop_assert!(hit.t_enter <= hit.t_exit);
                prop_assert!((hit.normal.length() - 1.0).abs() < 1e-6);
                prop_assert!(hit.normal.x == 0.0 || hit.normal.y == 0.0);
            }
        }
    }
}
