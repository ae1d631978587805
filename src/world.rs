use std::time::Instant;

use log::{debug, warn};

use crate::{
    collision::{
        broadphase::BroadPhase,
        contact::{Contact, ContactEvent, ContactKey},
        narrowphase::NarrowPhase,
    },
    config::SimulationConfig,
    core::{collider::Collider, rigidbody::RigidBody},
    dynamics::{integrator::Integrator, solver::ContactSolver},
    error::ConfigError,
    utils::{
        allocator::{Arena, EntityId},
        logging::{warn_if_frame_budget_exceeded, ScopedTimer},
        profiling::PhysicsProfiler,
    },
};

/// Central simulation container running integrate, broad phase, narrow phase
/// and solve once per fixed tick.
pub struct PhysicsWorld {
    bodies: Arena<RigidBody>,
    config: SimulationConfig,
    integrator: Integrator,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    solver: ContactSolver,
    profiler: PhysicsProfiler,
    events: Vec<ContactEvent>,
    time_accumulated: f32,
    parallel_enabled: bool,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// World with the default configuration.
    pub fn new() -> Self {
        Self::build(SimulationConfig::default())
    }

    pub fn with_config(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimulationConfig) -> Self {
        Self {
            bodies: Arena::new(),
            integrator: Integrator::new(config.gravity, config.sleep),
            broad_phase: BroadPhase::new(config.broad_phase),
            narrow_phase: NarrowPhase::new(),
            solver: ContactSolver::new(config.solver),
            profiler: PhysicsProfiler::default(),
            events: Vec::new(),
            time_accumulated: 0.0,
            parallel_enabled: cfg!(feature = "parallel"),
            config,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Validates and applies `config`. Live bodies and contacts are kept.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.integrator = Integrator::new(config.gravity, config.sleep);
        self.broad_phase.set_config(config.broad_phase);
        self.solver.config = config.solver;
        self.config = config;
        debug!("simulation config updated: {:?}", self.config);
        Ok(())
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel_enabled = enabled;
        self.broad_phase.set_parallel_enabled(enabled);
        self.narrow_phase.set_parallel_enabled(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel_enabled
    }

    fn check_mass(id: EntityId, body: &RigidBody) -> Result<(), ConfigError> {
        let mass = body.mass();
        if !body.is_static && !(mass.is_finite() && mass > 0.0) {
            return Err(ConfigError::InvalidMass { body: id, mass });
        }
        Ok(())
    }

    /// Registers `body`, assigning its id and binding its collider.
    pub fn add_body(&mut self, mut body: RigidBody) -> Result<EntityId, ConfigError> {
        Self::check_mass(body.id(), &body)?;
        body.update_aabb();
        let id = self.bodies.insert_with(|id| {
            body.set_id(id);
            body
        });
        debug!("added body {id} ({} live)", self.bodies.len());
        Ok(id)
    }

    /// Removes a body and silently drops its contacts. Unknown ids are a no-op.
    pub fn remove_body(&mut self, id: EntityId) -> bool {
        if self.bodies.remove(id).is_none() {
            return false;
        }
        let dropped = self.narrow_phase.forget_body(id);
        debug!("removed body {id}, dropped {dropped} contacts");
        true
    }

    /// Changes a body's mass, rejecting non-positive mass on non-static bodies.
    pub fn set_body_mass(&mut self, id: EntityId, mass: f32) -> Result<(), ConfigError> {
        let body = self.bodies.get_mut(id).ok_or(ConfigError::UnknownBody(id))?;
        if !body.is_static && !(mass.is_finite() && mass > 0.0) {
            return Err(ConfigError::InvalidMass { body: id, mass });
        }
        body.set_mass(mass);
        Ok(())
    }

    /// Attaches `collider` to a body, returning the collider it replaced.
    pub fn attach_collider(
        &mut self,
        id: EntityId,
        collider: Collider,
    ) -> Result<Option<Collider>, ConfigError> {
        let body = self.bodies.get_mut(id).ok_or(ConfigError::UnknownBody(id))?;
        Ok(body.set_collider(collider))
    }

    /// Detaches a body's collider and silently drops its contacts.
    pub fn detach_collider(&mut self, id: EntityId) -> Option<Collider> {
        let collider = self.bodies.get_mut(id)?.take_collider()?;
        self.narrow_phase.forget_body(id);
        Some(collider)
    }

    pub fn body(&self, id: EntityId) -> Option<&RigidBody> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (EntityId, &RigidBody)> + '_ {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Live contacts after the last tick, in key order.
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> + '_ {
        self.narrow_phase.contacts()
    }

    pub fn contact(&self, a: EntityId, b: EntityId) -> Option<&Contact> {
        self.narrow_phase.contact(ContactKey::new(a, b))
    }

    /// Enter, stay and exit events from every tick of the last `step` or `tick`.
    pub fn events(&self) -> &[ContactEvent] {
        &self.events
    }

    /// Candidate pairs emitted by the broad phase in the last tick.
    pub fn broad_phase_pairs(&self) -> &[ContactKey] {
        self.broad_phase.pairs()
    }

    pub fn narrow_phase(&self) -> &NarrowPhase {
        &self.narrow_phase
    }

    pub fn solver(&self) -> &ContactSolver {
        &self.solver
    }

    pub fn profiler(&self) -> &PhysicsProfiler {
        &self.profiler
    }

    /// Simulated time not yet consumed by a fixed tick.
    pub fn time_accumulated(&self) -> f32 {
        self.time_accumulated
    }

    /// Advances the simulation using a fixed timestep accumulator, running
    /// at most `max_sub_steps` ticks. Returns the number of ticks run.
    pub fn step(&mut self, dt: f32) -> u32 {
        let start = Instant::now();
        self.profiler.reset();
        self.events.clear();
        if !(dt.is_finite() && dt > 0.0) {
            return 0;
        }

        let fixed = self.config.fixed_time_step;
        self.time_accumulated += dt;

        let mut ticks = 0;
        while self.time_accumulated >= fixed && ticks < self.config.max_sub_steps {
            self.time_accumulated -= fixed;
            self.run_tick(fixed);
            ticks += 1;
        }

        if self.time_accumulated >= fixed {
            let dropped = self.time_accumulated - self.time_accumulated % fixed;
            warn!(
                "physics fell behind: dropping {:.2} ms after {} sub-steps",
                dropped * 1000.0,
                ticks
            );
            self.time_accumulated %= fixed;
        }

        self.profiler.total_frame_time = start.elapsed();
        if let Some(budget) = self.config.frame_budget_ms {
            warn_if_frame_budget_exceeded(self.profiler.total_frame_time, budget);
        }
        self.profiler.report();
        ticks
    }

    /// Runs exactly one pipeline pass with time step `dt`.
    pub fn tick(&mut self, dt: f32) {
        let start = Instant::now();
        self.profiler.reset();
        self.events.clear();
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.run_tick(dt);
        self.profiler.total_frame_time = start.elapsed();
    }

    fn run_tick(&mut self, dt: f32) {
        {
            let _timer = ScopedTimer::recording("integrate", &mut self.profiler.integrator_time);
            self.profiler.sleeping_count = self.integrator.step(&mut self.bodies, dt);
        }

        let pairs = {
            let _timer = ScopedTimer::recording("broad_phase", &mut self.profiler.broad_phase_time);
            self.broad_phase.find_pairs(&self.bodies)
        };
        self.profiler.candidate_pair_count += pairs.len();

        {
            let _timer = ScopedTimer::recording("narrow_phase", &mut self.profiler.narrow_phase_time);
            self.narrow_phase.update(&mut self.bodies, pairs);
        }
        self.events.extend_from_slice(self.narrow_phase.events());

        {
            let _timer = ScopedTimer::recording("solver", &mut self.profiler.solver_time);
            self.solver
                .solve(&mut self.bodies, self.narrow_phase.contacts_mut(), dt);
        }

        self.profiler.ticks += 1;
        self.profiler.body_count = self.bodies.len();
        self.profiler.contact_count = self.narrow_phase.contact_count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BroadPhaseConfig;
    use glam::Vec3;

    fn zero_gravity() -> SimulationConfig {
        SimulationConfig {
            gravity: Vec3::ZERO,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn add_body_rejects_massless_dynamic_bodies() {
        let mut world = PhysicsWorld::new();
        let err = world.add_body(RigidBody::builder().mass(0.0).build());
        assert!(matches!(err, Err(ConfigError::InvalidMass { mass, .. }) if mass == 0.0));

        let ground = world.add_body(RigidBody::builder().mass(0.0).static_body().build());
        assert!(ground.is_ok());
    }

    #[test]
    fn add_body_binds_collider_back_reference() {
        let mut world = PhysicsWorld::new();
        let id = world
            .add_body(RigidBody::builder().collider(Collider::sphere(1.0)).build())
            .expect("valid body");
        let body = world.body(id).expect("live");
        assert_eq!(body.id(), id);
        assert_eq!(body.collider().map(Collider::body), Some(id));
    }

    #[test]
    fn attach_collider_binds_and_replaces() {
        let mut world = PhysicsWorld::new();
        let id = world.add_body(RigidBody::default()).expect("valid body");

        let previous = world.attach_collider(id, Collider::sphere(1.0)).expect("live body");
        assert!(previous.is_none());
        let previous = world.attach_collider(id, Collider::cuboid(Vec3::ONE)).expect("live body");
        assert_eq!(previous.map(|c| c.kind()), Some(crate::core::collider::ShapeKind::Sphere));

        if let Some(body) = world.body_mut(id) {
            body.set_collider(Collider::capsule(0.5, 1.0));
        }
        let body = world.body(id).expect("live");
        assert_eq!(body.id(), id);
        assert_eq!(body.collider().map(Collider::body), Some(id));

        assert!(world.remove_body(id));
        assert_eq!(
            world.attach_collider(id, Collider::sphere(1.0)).err(),
            Some(ConfigError::UnknownBody(id))
        );
    }

    #[test]
    fn remove_body_is_idempotent() {
        let mut world = PhysicsWorld::new();
        let id = world.add_body(RigidBody::default()).expect("valid body");
        assert!(world.remove_body(id));
        assert!(!world.remove_body(id));
        assert!(world.body(id).is_none());
    }

    #[test]
    fn step_respects_max_sub_steps() {
        let mut world = PhysicsWorld::with_config(zero_gravity()).expect("valid config");
        assert_eq!(world.step(1.0 / 120.0), 0);
        assert_eq!(world.step(1.0 / 120.0), 1);
        assert_eq!(world.step(1.0), 3);
        assert!(world.time_accumulated() < world.config().fixed_time_step);
        assert_eq!(world.step(f32::NAN), 0);
    }

    #[test]
    fn set_config_validates_before_applying() {
        let mut world = PhysicsWorld::new();
        let mut bad = SimulationConfig::default();
        bad.fixed_time_step = -1.0;
        assert!(world.set_config(bad).is_err());
        assert_eq!(world.config(), &SimulationConfig::default());
    }

    #[test]
    fn detach_collider_drops_contacts() {
        let mut world = PhysicsWorld::with_config(zero_gravity()).expect("valid config");
        let a = world
            .add_body(RigidBody::builder().collider(Collider::sphere(1.0)).build())
            .expect("valid body");
        let b = world
            .add_body(
                RigidBody::builder()
                    .position(Vec3::new(1.5, 0.0, 0.0))
                    .collider(Collider::sphere(1.0))
                    .build(),
            )
            .expect("valid body");
        world.tick(1.0 / 60.0);
        assert!(world.contact(a, b).is_some());

        assert!(world.detach_collider(b).is_some());
        assert!(world.contact(a, b).is_none());
        assert!(world.detach_collider(b).is_none());
    }

    #[test]
    fn resting_ball_on_static_ground() {
        let mut config = SimulationConfig::default();
        config.broad_phase = BroadPhaseConfig {
            include_static_bodies: true,
            ..BroadPhaseConfig::default()
        };
        let mut world = PhysicsWorld::with_config(config).expect("valid config");
        world
            .add_body(
                RigidBody::builder()
                    .static_body()
                    .collider(Collider::cuboid(Vec3::new(10.0, 0.5, 10.0)))
                    .build(),
            )
            .expect("valid body");
        let ball = world
            .add_body(
                RigidBody::builder()
                    .position(Vec3::new(0.0, 1.0, 0.0))
                    .restitution(0.0)
                    .collider(Collider::sphere(0.5))
                    .build(),
            )
            .expect("valid body");

        for _ in 0..240 {
            world.tick(1.0 / 60.0);
        }
        let y = world.body(ball).map(|b| b.transform.position.y).unwrap_or_default();
        assert!(y > 0.8 && y < 1.05, "ball settled at {y}");
    }
}
