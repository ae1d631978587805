//! Pure contact generators for each supported shape pair.
//!
//! Every generator receives the two shapes already placed in world space and
//! returns geometry whose normal points from the first shape to the second,
//! with a positive penetration depth and a point on the first shape's surface.

use glam::{Mat3, Vec3};

use crate::{
    core::{collider::ColliderShape, types::Transform},
    utils::math::{closest_point_on_segment, closest_points_segments, normalize_or_fallback},
};

/// A shape together with its world transform.
#[derive(Debug, Clone, Copy)]
pub struct ShapeView<'a> {
    pub shape: &'a ColliderShape,
    pub transform: Transform,
}

impl<'a> ShapeView<'a> {
    pub fn new(shape: &'a ColliderShape, transform: Transform) -> Self {
        Self { shape, transform }
    }

    fn sphere(&self) -> Option<f32> {
        match self.shape {
            ColliderShape::Sphere { radius } => Some(*radius),
            _ => None,
        }
    }

    fn cuboid(&self) -> Option<Vec3> {
        match self.shape {
            ColliderShape::Box { half_extents } => Some(*half_extents),
            _ => None,
        }
    }

    /// Segment endpoints and radius of a capsule.
    fn capsule(&self) -> Option<(Vec3, Vec3, f32)> {
        match self.shape {
            ColliderShape::Capsule { radius, height } => {
                let half = self.transform.rotation * Vec3::new(0.0, height * 0.5, 0.0);
                let center = self.transform.position;
                Some((center - half, center + half, *radius))
            }
            _ => None,
        }
    }
}

/// Contact point, normal and depth for one overlapping shape pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactGeometry {
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f32,
}

impl ContactGeometry {
    /// Same contact seen from the other shape: reversed normal, point moved
    /// onto the other surface.
    pub fn flipped(self) -> Self {
        Self {
            point: self.point - self.normal * self.depth,
            normal: -self.normal,
            depth: self.depth,
        }
    }
}

/// Core sphere test shared by every round shape.
fn spheres(center_a: Vec3, radius_a: f32, center_b: Vec3, radius_b: f32) -> Option<ContactGeometry> {
    let delta = center_b - center_a;
    let dist_sq = delta.length_squared();
    let reach = radius_a + radius_b;
    if dist_sq >= reach * reach {
        return None;
    }

    let normal = normalize_or_fallback(delta);
    Some(ContactGeometry {
        point: center_a + normal * radius_a,
        normal,
        depth: reach - dist_sq.sqrt(),
    })
}

pub fn sphere_sphere(a: &ShapeView<'_>, b: &ShapeView<'_>) -> Option<ContactGeometry> {
    spheres(
        a.transform.position,
        a.sphere()?,
        b.transform.position,
        b.sphere()?,
    )
}

/// Oriented box against oriented box by the separating-axis theorem.
///
/// Tests the three face axes of each box and the nine edge-edge cross
/// products; the axis with the smallest overlap wins, earlier axes winning
/// ties.
pub fn box_box(a: &ShapeView<'_>, b: &ShapeView<'_>) -> Option<ContactGeometry> {
    const PARALLEL_EPSILON: f32 = 1e-6;

    let half_a = a.cuboid()?;
    let half_b = b.cuboid()?;
    let basis_a = a.transform.basis();
    let basis_b = b.transform.basis();
    let axes_a = [basis_a.x_axis, basis_a.y_axis, basis_a.z_axis];
    let axes_b = [basis_b.x_axis, basis_b.y_axis, basis_b.z_axis];
    let relative = b.transform.position - a.transform.position;

    let mut axes = [Vec3::ZERO; 15];
    axes[..3].copy_from_slice(&axes_a);
    axes[3..6].copy_from_slice(&axes_b);
    let mut axis_count = 6;
    for axis_a in &axes_a {
        for axis_b in &axes_b {
            let axis = axis_a.cross(*axis_b);
            if axis.length_squared() > PARALLEL_EPSILON {
                axes[axis_count] = axis.normalize();
                axis_count += 1;
            }
        }
    }

    let project = |axes: &[Vec3; 3], half: Vec3, axis: Vec3| {
        axes[0].dot(axis).abs() * half.x
            + axes[1].dot(axis).abs() * half.y
            + axes[2].dot(axis).abs() * half.z
    };

    let mut best_overlap = f32::MAX;
    let mut best_axis = axes_a[0];
    for &axis in &axes[..axis_count] {
        let distance = relative.dot(axis);
        let overlap = project(&axes_a, half_a, axis) + project(&axes_b, half_b, axis) - distance.abs();
        if overlap <= 0.0 {
            return None;
        }
        if overlap < best_overlap {
            best_overlap = overlap;
            best_axis = if distance < 0.0 { -axis } else { axis };
        }
    }

    // Deepest corner of B along the normal, lifted back onto A's surface.
    let local = basis_b.transpose() * -best_axis;
    let corner = Vec3::select(local.cmpge(Vec3::ZERO), half_b, -half_b);
    let deepest = b.transform.position + basis_b * corner;

    Some(ContactGeometry {
        point: deepest + best_axis * best_overlap,
        normal: best_axis,
        depth: best_overlap,
    })
}

/// Oriented box against sphere using the closest point on the box.
pub fn box_sphere(a: &ShapeView<'_>, b: &ShapeView<'_>) -> Option<ContactGeometry> {
    let half = a.cuboid()?;
    let radius = b.sphere()?;
    let basis: Mat3 = a.transform.basis();
    let local = a.transform.inverse_transform_point(b.transform.position);
    let clamped = local.clamp(-half, half);

    if clamped != local {
        let closest = a.transform.transform_point(clamped);
        let delta = b.transform.position - closest;
        let dist_sq = delta.length_squared();
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        return Some(ContactGeometry {
            point: closest,
            normal: normalize_or_fallback(delta),
            depth: radius - dist,
        });
    }

    // Centre inside the box: push out through the nearest face.
    let gaps = half - local.abs();
    let mut axis = 0;
    for i in 1..3 {
        if gaps[i] < gaps[axis] {
            axis = i;
        }
    }
    let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
    let mut face_normal = Vec3::ZERO;
    face_normal[axis] = sign;
    let mut surface = local;
    surface[axis] = sign * half[axis];

    Some(ContactGeometry {
        point: a.transform.transform_point(surface),
        normal: basis * face_normal,
        depth: gaps[axis] + radius,
    })
}

pub fn sphere_box(a: &ShapeView<'_>, b: &ShapeView<'_>) -> Option<ContactGeometry> {
    box_sphere(b, a).map(ContactGeometry::flipped)
}

pub fn capsule_sphere(a: &ShapeView<'_>, b: &ShapeView<'_>) -> Option<ContactGeometry> {
    let (start, end, radius_a) = a.capsule()?;
    let radius_b = b.sphere()?;
    let center = b.transform.position;
    spheres(closest_point_on_segment(center, start, end), radius_a, center, radius_b)
}

pub fn sphere_capsule(a: &ShapeView<'_>, b: &ShapeView<'_>) -> Option<ContactGeometry> {
    capsule_sphere(b, a).map(ContactGeometry::flipped)
}

pub fn capsule_capsule(a: &ShapeView<'_>, b: &ShapeView<'_>) -> Option<ContactGeometry> {
    let (start_a, end_a, radius_a) = a.capsule()?;
    let (start_b, end_b, radius_b) = b.capsule()?;
    let (on_a, on_b) = closest_points_segments(start_a, end_a, start_b, end_b);
    spheres(on_a, radius_a, on_b, radius_b)
}
