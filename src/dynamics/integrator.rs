use glam::Vec3;

use crate::{
    config::SleepConfig,
    core::rigidbody::RigidBody,
    utils::{allocator::Arena, math::angular_velocity_to_quat},
};

/// Semi-implicit Euler integrator with sleep bookkeeping.
#[derive(Debug, Clone)]
pub struct Integrator {
    pub gravity: Vec3,
    pub sleep: SleepConfig,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -9.81, 0.0), SleepConfig::default())
    }
}

impl Integrator {
    pub fn new(gravity: Vec3, sleep: SleepConfig) -> Self {
        Self { gravity, sleep }
    }

    /// Forces, gravity and damping into velocity. Kinematic bodies keep the
    /// velocity the host gave them.
    pub fn integrate_velocity(&self, body: &mut RigidBody, dt: f32) {
        if !body.is_dynamic() {
            return;
        }

        let force = body.force + self.gravity * body.mass() * body.gravity_scale;
        body.velocity.linear += force * body.inverse_mass() * dt;
        body.velocity.angular += body.inverse_inertia() * body.torque * dt;

        body.velocity.linear *= (1.0 - body.linear_damping * dt).max(0.0);
        body.velocity.angular *= (1.0 - body.angular_damping * dt).max(0.0);
    }

    pub fn integrate_position(&self, body: &mut RigidBody, dt: f32) {
        if body.is_static {
            return;
        }

        body.transform.position += body.velocity.linear * dt;

        let delta = angular_velocity_to_quat(body.velocity.angular, dt);
        body.transform.rotation = (delta * body.transform.rotation).normalize();
    }

    /// Advances the sleep timer; returns true when the body fell asleep.
    pub fn update_sleep(&self, body: &mut RigidBody, dt: f32) -> bool {
        if !body.is_dynamic() {
            return false;
        }

        let threshold = body.sleep_threshold;
        let resting = body.velocity.linear.length_squared() < threshold
            && body.velocity.angular.length_squared() < threshold;
        if !resting {
            body.sleep_time = 0.0;
            return false;
        }

        body.sleep_time += dt;
        if body.sleep_time > self.sleep.time_to_sleep {
            body.sleep();
            return true;
        }
        false
    }

    /// Integrates one body and clears its accumulated force and torque.
    ///
    /// The sleep rule sees the velocity after forces are applied and before
    /// the position moves; a body that falls asleep here keeps its position.
    pub fn integrate_body(&self, body: &mut RigidBody, dt: f32) {
        if !body.is_static && !body.is_sleeping {
            self.integrate_velocity(body, dt);
            if !self.update_sleep(body, dt) {
                self.integrate_position(body, dt);
            }
        }
        body.force = Vec3::ZERO;
        body.torque = Vec3::ZERO;
    }

    /// Integrates every body and refreshes its collider bounds. Returns how
    /// many bodies are asleep afterwards.
    pub fn step(&self, bodies: &mut Arena<RigidBody>, dt: f32) -> usize {
        let mut sleeping = 0;
        for body in bodies.values_mut() {
            self.integrate_body(body, dt);
            body.update_aabb();
            if body.is_sleeping {
                sleeping += 1;
            }
        }
        sleeping
    }
}
