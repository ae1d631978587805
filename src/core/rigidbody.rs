use crate::{config::DEFAULT_SLEEP_THRESHOLD, utils::allocator::EntityId};

use super::{
    collider::Collider,
    types::{Material, Transform, Velocity},
};
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Group/mask bit filter. Two bodies interact only when each one's group is
/// accepted by the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub group: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            group: 1,
            mask: u32::MAX,
        }
    }
}

impl CollisionFilter {
    pub fn new(group: u32, mask: u32) -> Self {
        Self { group, mask }
    }

    /// Symmetric test: both directions must pass.
    pub fn allows(&self, other: &CollisionFilter) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

/// Core rigid body description storing dynamics state and properties.
///
/// The body owns its collider, if any. Mass is kept private so the inverse
/// mass can never drift out of sync with it.
#[derive(Debug, Serialize, Deserialize)]
pub struct RigidBody {
    id: EntityId,
    pub transform: Transform,
    pub velocity: Velocity,
    pub force: Vec3,
    pub torque: Vec3,
    mass: f32,
    inverse_mass: f32,
    inverse_inertia: Mat3,
    pub material: Material,
    pub filter: CollisionFilter,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub is_static: bool,
    pub is_kinematic: bool,
    pub is_trigger: bool,
    pub is_sleeping: bool,
    pub sleep_time: f32,
    /// Squared linear and angular speed below which the sleep timer runs.
    pub sleep_threshold: f32,
    collider: Option<Collider>,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            id: EntityId::NULL,
            transform: Transform::default(),
            velocity: Velocity::default(),
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            mass: 1.0,
            inverse_mass: 1.0,
            inverse_inertia: Mat3::IDENTITY,
            material: Material::default(),
            filter: CollisionFilter::default(),
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            is_static: false,
            is_kinematic: false,
            is_trigger: false,
            is_sleeping: false,
            sleep_time: 0.0,
            sleep_threshold: DEFAULT_SLEEP_THRESHOLD,
            collider: None,
        }
    }
}

impl RigidBody {
    pub fn builder() -> RigidBodyBuilder {
        RigidBodyBuilder::new()
    }

    /// Arena id assigned at registration; null until the body joins a world.
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.recompute_inverses();
    }

    /// Inverse mass as seen by the solver: zero for static and kinematic bodies.
    pub fn inverse_mass(&self) -> f32 {
        if self.is_static || self.is_kinematic {
            0.0
        } else {
            self.inverse_mass
        }
    }

    pub fn inverse_inertia(&self) -> Mat3 {
        if self.is_static || self.is_kinematic {
            Mat3::ZERO
        } else {
            self.inverse_inertia
        }
    }

    /// Whether contacts can change this body's velocity.
    pub fn is_dynamic(&self) -> bool {
        !self.is_static && !self.is_kinematic
    }

    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    pub fn collider_mut(&mut self) -> Option<&mut Collider> {
        self.collider.as_mut()
    }

    /// Attaches `collider`, replacing and returning any previous one.
    pub fn set_collider(&mut self, mut collider: Collider) -> Option<Collider> {
        collider.bind(self.id);
        collider.update_aabb(&self.transform);
        let previous = self.collider.replace(collider);
        self.recompute_inverses();
        previous
    }

    pub fn take_collider(&mut self) -> Option<Collider> {
        let taken = self.collider.take();
        self.recompute_inverses();
        taken
    }

    /// Shared borrow of the transform alongside mutable access to the collider.
    pub(crate) fn collider_parts_mut(&mut self) -> (&Transform, Option<&mut Collider>) {
        (&self.transform, self.collider.as_mut())
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
        if let Some(collider) = self.collider.as_mut() {
            collider.bind(id);
        }
    }

    pub fn update_aabb(&mut self) {
        let (transform, collider) = self.collider_parts_mut();
        if let Some(collider) = collider {
            collider.update_aabb(transform);
        }
    }

    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_static {
            return;
        }
        self.force += force;
        self.wake();
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.is_static {
            return;
        }
        self.torque += torque;
        self.wake();
    }

    /// Instantaneous change of linear velocity through the centre of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.velocity.linear += impulse * self.inverse_mass;
        self.wake();
    }

    pub fn wake(&mut self) {
        self.is_sleeping = false;
        self.sleep_time = 0.0;
    }

    pub fn sleep(&mut self) {
        self.is_sleeping = true;
        self.velocity = Velocity::default();
    }

    fn recompute_inverses(&mut self) {
        self.inverse_mass = if self.mass.is_finite() && self.mass > f32::EPSILON {
            1.0 / self.mass
        } else {
            0.0
        };

        let inertia = match self.collider.as_ref() {
            Some(collider) => collider.shape.inertia(self.mass),
            None => Mat3::IDENTITY * self.mass,
        };
        let inverse_inertia = inertia.inverse();
        self.inverse_inertia = if inertia.determinant().abs() < f32::EPSILON
            || !inverse_inertia.is_finite()
        {
            Mat3::IDENTITY
        } else {
            inverse_inertia
        };
    }
}

pub struct RigidBodyBuilder {
    body: RigidBody,
    collider: Option<Collider>,
}

impl Default for RigidBodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidBodyBuilder {
    pub fn new() -> Self {
        Self {
            body: RigidBody::default(),
            collider: None,
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.body.transform.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.body.transform.rotation = rotation;
        self
    }

    pub fn linear_velocity(mut self, linear: Vec3) -> Self {
        self.body.velocity.linear = linear;
        self
    }

    pub fn angular_velocity(mut self, angular: Vec3) -> Self {
        self.body.velocity.angular = angular;
        self
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.body.mass = mass;
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.body.material = material;
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.body.material.friction = friction;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.body.material.restitution = restitution;
        self
    }

    pub fn filter(mut self, group: u32, mask: u32) -> Self {
        self.body.filter = CollisionFilter::new(group, mask);
        self
    }

    pub fn gravity_scale(mut self, scale: f32) -> Self {
        self.body.gravity_scale = scale;
        self
    }

    pub fn damping(mut self, linear: f32, angular: f32) -> Self {
        self.body.linear_damping = linear;
        self.body.angular_damping = angular;
        self
    }

    pub fn sleep_threshold(mut self, threshold: f32) -> Self {
        self.body.sleep_threshold = threshold;
        self
    }

    pub fn static_body(mut self) -> Self {
        self.body.is_static = true;
        self
    }

    pub fn kinematic(mut self) -> Self {
        self.body.is_kinematic = true;
        self
    }

    pub fn trigger(mut self) -> Self {
        self.body.is_trigger = true;
        self
    }

    pub fn collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn build(self) -> RigidBody {
        let mut body = self.body;
        body.recompute_inverses();
        if let Some(collider) = self.collider {
            body.set_collider(collider);
        }
        body
    }
}
