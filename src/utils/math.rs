//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Direction used whenever a normal cannot be derived from geometry.
pub const FALLBACK_NORMAL: Vec3 = Vec3::Y;

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// Normalizes `v`, substituting [`FALLBACK_NORMAL`] for zero or non-finite input.
pub fn normalize_or_fallback(v: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(FALLBACK_NORMAL)
}

/// Builds an inertia tensor for a solid capsule aligned along Y.
pub fn inertia_capsule(radius: f32, height: f32, mass: f32) -> Mat3 {
    let cylinder_mass = mass * 0.6;
    let sphere_mass = (mass - cylinder_mass) / 2.0;

    let cylinder_inertia = Mat3::from_diagonal(Vec3::new(
        (1.0 / 12.0) * cylinder_mass * (3.0 * radius * radius + height * height),
        0.5 * cylinder_mass * radius * radius,
        (1.0 / 12.0) * cylinder_mass * (3.0 * radius * radius + height * height),
    ));

    let sphere_inertia = Mat3::from_diagonal(Vec3::splat(0.4 * sphere_mass * radius * radius));

    cylinder_inertia + sphere_inertia
}

/// Closest points between segments `p1..q1` and `p2..q2`.
///
/// Returns the pair of points, one on each segment. Degenerate (zero-length)
/// segments are treated as points.
pub fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    const EPSILON: f32 = 1e-8;

    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    let (s, t) = if a <= EPSILON && e <= EPSILON {
        (0.0, 0.0)
    } else if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// Closest point to `point` on segment `a..b`.
pub fn closest_point_on_segment(point: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= 1e-8 {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_vector_normalizes_to_fallback() {
        assert_eq!(normalize_or_fallback(Vec3::ZERO), FALLBACK_NORMAL);
        assert_eq!(normalize_or_fallback(Vec3::splat(f32::NAN)), FALLBACK_NORMAL);
        assert_eq!(normalize_or_fallback(Vec3::new(0.0, 0.0, 3.0)), Vec3::Z);
    }

    #[test]
    fn crossing_segments_meet_at_intersection() {
        let (a, b) = closest_points_segments(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert_relative_eq!(a.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(b.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(a.distance(b), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn segment_projection_clamps_to_endpoints() {
        let p = closest_point_on_segment(Vec3::new(5.0, 1.0, 0.0), Vec3::ZERO, Vec3::X);
        assert_eq!(p, Vec3::X);
    }
}
