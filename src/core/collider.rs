use std::fmt;

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::{
    aabb::Aabb,
    types::{InertiaTensorExt, Transform},
};
use crate::utils::{allocator::EntityId, math::inertia_capsule};

/// Enumeration of supported collider geometries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: Vec3,
    },
    /// Capsule along the local Y axis; `height` is the distance between the
    /// two hemisphere centres.
    Capsule {
        radius: f32,
        height: f32,
    },
    /// Vertex cloud in the collider's local frame. Only its bounds take part
    /// in collision detection.
    Mesh {
        vertices: Vec<Vec3>,
    },
}

/// Shape discriminant used to key the narrow-phase dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere,
    Box,
    Capsule,
    Mesh,
}

impl ShapeKind {
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        self as usize
    }
}

impl ColliderShape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ColliderShape::Sphere { .. } => ShapeKind::Sphere,
            ColliderShape::Box { .. } => ShapeKind::Box,
            ColliderShape::Capsule { .. } => ShapeKind::Capsule,
            ColliderShape::Mesh { .. } => ShapeKind::Mesh,
        }
    }

    /// World-space bounds of the shape placed at `transform`.
    pub fn compute_aabb(&self, transform: &Transform) -> Aabb {
        match self {
            ColliderShape::Sphere { radius } => {
                Aabb::new(transform.position, Vec3::splat(*radius))
            }
            ColliderShape::Box { half_extents } => {
                let extents = transform.basis().abs() * *half_extents;
                Aabb::new(transform.position, extents)
            }
            ColliderShape::Capsule { radius, height } => {
                let axis = transform.rotation * Vec3::new(0.0, height * 0.5, 0.0);
                Aabb::new(transform.position, axis.abs() + Vec3::splat(*radius))
            }
            ColliderShape::Mesh { vertices } => {
                Aabb::from_points(vertices.iter().map(|v| transform.transform_point(*v)))
                    .unwrap_or(Aabb::new(transform.position, Vec3::ZERO))
            }
        }
    }

    /// Inertia tensor of the solid shape about its own centre.
    pub fn inertia(&self, mass: f32) -> Mat3 {
        match self {
            ColliderShape::Sphere { radius } => Mat3::for_solid_sphere(*radius, mass),
            ColliderShape::Box { half_extents } => Mat3::for_solid_box(*half_extents, mass),
            ColliderShape::Capsule { radius, height } => inertia_capsule(*radius, *height, mass),
            ColliderShape::Mesh { vertices } => {
                let bounds = Aabb::from_points(vertices.iter().copied()).unwrap_or_default();
                Mat3::for_solid_box(bounds.half_extents, mass)
            }
        }
    }
}

/// Handler invoked with the other participant's body id.
pub type CollisionCallback = Box<dyn FnMut(EntityId) + Send + Sync>;

/// Optional enter/stay/exit handlers attached to a collider.
///
/// Handlers run inline on the simulation thread during the narrow phase.
#[derive(Default)]
pub struct CollisionCallbacks {
    pub on_enter: Option<CollisionCallback>,
    pub on_stay: Option<CollisionCallback>,
    pub on_exit: Option<CollisionCallback>,
}

impl CollisionCallbacks {
    pub fn is_empty(&self) -> bool {
        self.on_enter.is_none() && self.on_stay.is_none() && self.on_exit.is_none()
    }

    pub(crate) fn fire_enter(&mut self, other: EntityId) {
        if let Some(handler) = self.on_enter.as_mut() {
            handler(other);
        }
    }

    pub(crate) fn fire_stay(&mut self, other: EntityId) {
        if let Some(handler) = self.on_stay.as_mut() {
            handler(other);
        }
    }

    pub(crate) fn fire_exit(&mut self, other: EntityId) {
        if let Some(handler) = self.on_exit.as_mut() {
            handler(other);
        }
    }
}

impl fmt::Debug for CollisionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionCallbacks")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_stay", &self.on_stay.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .finish()
    }
}

/// Collision shape owned by exactly one rigid body.
#[derive(Debug, Serialize, Deserialize)]
pub struct Collider {
    body: EntityId,
    pub shape: ColliderShape,
    /// Placement of the shape relative to its body.
    pub offset: Transform,
    pub is_trigger: bool,
    aabb: Aabb,
    #[serde(skip)]
    pub callbacks: CollisionCallbacks,
}

impl Default for Collider {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Collider {
    pub fn sphere(radius: f32) -> Self {
        Self::builder().sphere(radius).build()
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::builder().box_shape(half_extents).build()
    }

    pub fn capsule(radius: f32, height: f32) -> Self {
        Self::builder().capsule(radius, height).build()
    }

    pub fn mesh(vertices: Vec<Vec3>) -> Self {
        Self::builder().mesh(vertices).build()
    }

    pub fn builder() -> ColliderBuilder {
        ColliderBuilder::new()
    }

    /// Body owning this collider; null until the collider is registered.
    pub fn body(&self) -> EntityId {
        self.body
    }

    pub(crate) fn bind(&mut self, body: EntityId) {
        self.body = body;
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn world_transform(&self, body_transform: &Transform) -> Transform {
        body_transform.combine(&self.offset)
    }

    /// Cached world bounds from the last [`Collider::update_aabb`].
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    pub fn update_aabb(&mut self, body_transform: &Transform) {
        self.aabb = self.shape.compute_aabb(&self.world_transform(body_transform));
    }
}

pub struct ColliderBuilder {
    shape: ColliderShape,
    offset: Transform,
    is_trigger: bool,
    callbacks: CollisionCallbacks,
}

impl Default for ColliderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ColliderBuilder {
    pub fn new() -> Self {
        Self {
            shape: ColliderShape::Sphere { radius: 0.5 },
            offset: Transform::default(),
            is_trigger: false,
            callbacks: CollisionCallbacks::default(),
        }
    }

    pub fn sphere(mut self, radius: f32) -> Self {
        self.shape = ColliderShape::Sphere { radius };
        self
    }

    pub fn box_shape(mut self, half_extents: Vec3) -> Self {
        self.shape = ColliderShape::Box { half_extents };
        self
    }

    pub fn capsule(mut self, radius: f32, height: f32) -> Self {
        self.shape = ColliderShape::Capsule { radius, height };
        self
    }

    pub fn mesh(mut self, vertices: Vec<Vec3>) -> Self {
        self.shape = ColliderShape::Mesh { vertices };
        self
    }

    pub fn offset(mut self, offset: Transform) -> Self {
        self.offset = offset;
        self
    }

    pub fn center(mut self, center: Vec3) -> Self {
        self.offset.position = center;
        self
    }

    pub fn is_trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    pub fn on_enter(mut self, handler: impl FnMut(EntityId) + Send + Sync + 'static) -> Self {
        self.callbacks.on_enter = Some(Box::new(handler));
        self
    }

    pub fn on_stay(mut self, handler: impl FnMut(EntityId) + Send + Sync + 'static) -> Self {
        self.callbacks.on_stay = Some(Box::new(handler));
        self
    }

    pub fn on_exit(mut self, handler: impl FnMut(EntityId) + Send + Sync + 'static) -> Self {
        self.callbacks.on_exit = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> Collider {
        let aabb = self.shape.compute_aabb(&self.offset);
        Collider {
            body: EntityId::NULL,
            shape: self.shape,
            offset: self.offset,
            is_trigger: self.is_trigger,
            aabb,
            callbacks: self.callbacks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    #[test]
    fn rotated_box_aabb_grows() {
        let shape = ColliderShape::Box {
            half_extents: Vec3::ONE,
        };
        let transform = Transform::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_z(45.0_f32.to_radians()),
        );
        let aabb = shape.compute_aabb(&transform);
        assert_relative_eq!(aabb.half_extents.x, 2.0_f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(aabb.half_extents.y, 2.0_f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(aabb.half_extents.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn capsule_aabb_covers_both_caps() {
        let shape = ColliderShape::Capsule {
            radius: 0.5,
            height: 2.0,
        };
        let aabb = shape.compute_aabb(&Transform::from_position(Vec3::new(0.0, 3.0, 0.0)));
        assert_relative_eq!(aabb.half_extents.y, 1.5, epsilon = 1e-6);
        assert_relative_eq!(aabb.half_extents.x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn collider_aabb_follows_body_and_offset() {
        let mut collider = Collider::builder()
            .sphere(1.0)
            .center(Vec3::new(0.0, 1.0, 0.0))
            .build();
        collider.update_aabb(&Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(collider.aabb().center, Vec3::new(5.0, 1.0, 0.0));
        assert_eq!(collider.aabb().half_extents, Vec3::ONE);
    }

    #[test]
    fn callbacks_report_presence_in_debug_output() {
        let collider = Collider::builder().on_exit(|_| {}).build();
        let rendered = format!("{:?}", collider.callbacks);
        assert!(rendered.contains("on_exit: true"));
        assert!(rendered.contains("on_enter: false"));
    }
}
