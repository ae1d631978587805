use glam::Vec3;
use log::trace;

use crate::{
    collision::contact::Contact,
    config::SolverConfig,
    core::{rigidbody::RigidBody, types::Material},
    utils::allocator::{Arena, EntityId},
};

/// Totals from the last call to [`ContactSolver::solve`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SolverStepMetrics {
    pub contacts_solved: usize,
    pub iterations: u32,
    pub normal_impulse_sum: f32,
    pub tangent_impulse_sum: f32,
}

/// Per-contact values fixed for the whole solve.
struct ContactConstraint<'c> {
    contact: &'c mut Contact,
    inv_mass_a: f32,
    inv_mass_b: f32,
    /// Normal relative velocity the solve drives toward.
    target: f32,
    friction: f32,
}

/// Sequential-impulse contact solver with Baumgarte stabilisation.
///
/// Velocity only: penetration is removed over subsequent ticks through the
/// bias term. Static, kinematic and sleeping bodies act as infinite mass.
#[derive(Debug, Clone, Default)]
pub struct ContactSolver {
    pub config: SolverConfig,
    metrics: SolverStepMetrics,
}

impl ContactSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            metrics: SolverStepMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &SolverStepMetrics {
        &self.metrics
    }

    fn effective_inverse_mass(body: &RigidBody) -> f32 {
        if body.is_sleeping {
            0.0
        } else {
            body.inverse_mass()
        }
    }

    fn prepare<'c>(
        &self,
        bodies: &Arena<RigidBody>,
        contact: &'c mut Contact,
        dt: f32,
    ) -> Option<ContactConstraint<'c>> {
        contact.normal_impulse = 0.0;
        contact.tangent_impulse = 0.0;
        if contact.is_trigger {
            return None;
        }

        let body_a = bodies.get(contact.body_a)?;
        let body_b = bodies.get(contact.body_b)?;
        let inv_mass_a = Self::effective_inverse_mass(body_a);
        let inv_mass_b = Self::effective_inverse_mass(body_b);
        if inv_mass_a + inv_mass_b <= 0.0 {
            return None;
        }

        let pair = Material::combine(&body_a.material, &body_b.material);
        let approach = (body_b.velocity.linear - body_a.velocity.linear)
            .dot(contact.normal)
            .min(0.0);
        let bias = self.config.baumgarte * (contact.depth - self.config.slop).max(0.0) / dt;

        Some(ContactConstraint {
            contact,
            inv_mass_a,
            inv_mass_b,
            target: -approach * pair.restitution + bias,
            friction: pair.friction,
        })
    }

    /// Runs the configured number of iterations over `contacts`, updating
    /// body velocities and each contact's accumulated impulses.
    pub fn solve<'c>(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        contacts: impl IntoIterator<Item = &'c mut Contact>,
        dt: f32,
    ) {
        self.metrics = SolverStepMetrics::default();
        if dt <= 0.0 {
            return;
        }

        let mut constraints: Vec<ContactConstraint<'c>> = contacts
            .into_iter()
            .filter_map(|contact| self.prepare(bodies, contact, dt))
            .collect();

        for _ in 0..self.config.iterations {
            for constraint in &mut constraints {
                self.resolve_contact(bodies, constraint);
            }
        }

        self.metrics.iterations = self.config.iterations;
        self.metrics.contacts_solved = constraints.len();
        for constraint in &constraints {
            self.metrics.normal_impulse_sum += constraint.contact.normal_impulse;
            self.metrics.tangent_impulse_sum += constraint.contact.tangent_impulse;
        }
        trace!(
            "solver: {} contacts x {} iterations, normal impulse {:.4}",
            self.metrics.contacts_solved,
            self.metrics.iterations,
            self.metrics.normal_impulse_sum
        );
    }

    fn resolve_contact(&self, bodies: &mut Arena<RigidBody>, constraint: &mut ContactConstraint<'_>) {
        let (id_a, id_b) = (constraint.contact.body_a, constraint.contact.body_b);
        let Some((body_a, body_b)) = bodies.get2_mut(id_a, id_b) else {
            return;
        };
        let inv_a = constraint.inv_mass_a;
        let inv_b = constraint.inv_mass_b;
        let inv_sum = inv_a + inv_b;
        let normal = constraint.contact.normal;

        // Normal impulse, accumulated and clamped so contacts only push.
        let vn = (body_b.velocity.linear - body_a.velocity.linear).dot(normal);
        let lambda = (constraint.target - vn) / inv_sum;
        let accumulated = (constraint.contact.normal_impulse + lambda).max(0.0);
        let delta = accumulated - constraint.contact.normal_impulse;
        constraint.contact.normal_impulse = accumulated;
        apply_pair(body_a, body_b, normal * delta, inv_a, inv_b);

        // Coulomb friction bounded by the accumulated normal impulse.
        let relative = body_b.velocity.linear - body_a.velocity.linear;
        let tangent = relative - normal * relative.dot(normal);
        let speed = tangent.length();
        if speed <= self.config.tangent_threshold {
            return;
        }
        let budget = constraint.friction * constraint.contact.normal_impulse
            - constraint.contact.tangent_impulse;
        let magnitude = (speed / inv_sum).min(budget.max(0.0));
        if magnitude <= 0.0 {
            return;
        }
        constraint.contact.tangent_impulse += magnitude;
        apply_pair(body_a, body_b, -(tangent / speed) * magnitude, inv_a, inv_b);
    }
}

/// Applies `impulse` to B and its opposite to A, scaled by inverse mass.
fn apply_pair(body_a: &mut RigidBody, body_b: &mut RigidBody, impulse: Vec3, inv_a: f32, inv_b: f32) {
    if inv_a > 0.0 {
        body_a.velocity.linear -= impulse * inv_a;
    }
    if inv_b > 0.0 {
        body_b.velocity.linear += impulse * inv_b;
    }
}

/// Relative normal velocity of a contact, B relative to A.
pub fn normal_velocity(bodies: &Arena<RigidBody>, contact: &Contact) -> Option<f32> {
    let velocity = |id: EntityId| bodies.get(id).map(|body| body.velocity.linear);
    Some((velocity(contact.body_b)? - velocity(contact.body_a)?).dot(contact.normal))
}
