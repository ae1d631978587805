use rigid_tick::*;

const DT: f32 = 1.0 / 60.0;

/// Small deterministic generator so the scenes are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 40) as f32) / ((1u64 << 24) as f32)
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

fn scattered_world(index: SpatialIndexKind, seed: u64) -> PhysicsWorld {
    let config = SimulationConfig {
        gravity: Vec3::ZERO,
        broad_phase: BroadPhaseConfig {
            index,
            include_static_bodies: false,
        },
        ..SimulationConfig::default()
    };
    let mut world = PhysicsWorld::with_config(config).expect("valid config");
    let mut rng = Lcg(seed);

    for i in 0..80 {
        let position = Vec3::new(
            rng.range(-12.0, 12.0),
            rng.range(-3.0, 3.0),
            rng.range(-12.0, 12.0),
        );
        let collider = if i % 3 == 0 {
            Collider::cuboid(Vec3::new(
                rng.range(0.2, 1.5),
                rng.range(0.2, 1.5),
                rng.range(0.2, 1.5),
            ))
        } else {
            Collider::sphere(rng.range(0.3, 1.8))
        };
        let group = 1 << (i % 3);
        let mask = if i % 5 == 0 { 0b011 } else { u32::MAX };
        world
            .add_body(
                RigidBody::builder()
                    .position(position)
                    .rotation(Quat::from_rotation_y(rng.range(0.0, 3.0)))
                    .filter(group, mask)
                    .collider(collider)
                    .build(),
            )
            .expect("valid body");
    }
    world
}

fn brute_force_pairs(world: &PhysicsWorld) -> Vec<ContactKey> {
    let bodies: Vec<(EntityId, &RigidBody)> = world.bodies().collect();
    let mut pairs = Vec::new();
    for (i, (id_a, a)) in bodies.iter().enumerate() {
        for (id_b, b) in &bodies[i + 1..] {
            let (Some(ca), Some(cb)) = (a.collider(), b.collider()) else {
                continue;
            };
            if a.filter.allows(&b.filter) && ca.aabb().overlaps(cb.aabb()) {
                pairs.push(ContactKey::new(*id_a, *id_b));
            }
        }
    }
    pairs.sort();
    pairs
}

#[test]
fn spatial_hash_reports_exactly_the_overlapping_pairs() {
    let mut world = scattered_world(SpatialIndexKind::default(), 7);
    world.tick(DT);
    let expected = brute_force_pairs(&world);
    assert!(!expected.is_empty(), "scene should contain overlaps");
    assert_eq!(world.broad_phase_pairs(), expected.as_slice());
}

#[test]
fn quad_tree_reports_exactly_the_overlapping_pairs() {
    let index = SpatialIndexKind::QuadTree {
        world_size: 64.0,
        max_depth: 5,
        max_objects: 4,
    };
    let mut world = scattered_world(index, 7);
    world.tick(DT);
    assert_eq!(world.broad_phase_pairs(), brute_force_pairs(&world).as_slice());
}

#[test]
fn small_cells_still_find_every_pair() {
    let mut world = scattered_world(SpatialIndexKind::SpatialHash { cell_size: 0.5 }, 99);
    world.tick(DT);
    assert_eq!(world.broad_phase_pairs(), brute_force_pairs(&world).as_slice());
}

#[test]
fn filter_must_pass_in_both_directions() {
    let mut world = PhysicsWorld::with_config(SimulationConfig {
        gravity: Vec3::ZERO,
        ..SimulationConfig::default()
    })
    .expect("valid config");

    let sphere = |x: f32, group: u32, mask: u32| {
        RigidBody::builder()
            .position(Vec3::new(x, 0.0, 0.0))
            .filter(group, mask)
            .collider(Collider::sphere(1.0))
            .build()
    };
    // a accepts b, but b rejects a.
    let a = world.add_body(sphere(0.0, 0b01, 0b10)).expect("valid body");
    let b = world.add_body(sphere(0.5, 0b10, 0b10)).expect("valid body");
    world.tick(DT);
    assert!(world.broad_phase_pairs().is_empty());

    if let Some(body) = world.body_mut(b) {
        body.filter.mask = 0b01;
    }
    world.tick(DT);
    assert_eq!(world.broad_phase_pairs(), &[ContactKey::new(a, b)]);
}

#[test]
fn static_static_pairs_are_never_candidates() {
    let mut world = PhysicsWorld::with_config(SimulationConfig {
        broad_phase: BroadPhaseConfig {
            include_static_bodies: true,
            ..BroadPhaseConfig::default()
        },
        ..SimulationConfig::default()
    })
    .expect("valid config");
    for x in [0.0, 0.5] {
        world
            .add_body(
                RigidBody::builder()
                    .static_body()
                    .position(Vec3::new(x, 0.0, 0.0))
                    .collider(Collider::cuboid(Vec3::ONE))
                    .build(),
            )
            .expect("valid body");
    }
    world.tick(DT);
    assert!(world.broad_phase_pairs().is_empty());
}

#[test]
fn shapeless_bodies_are_skipped() {
    let mut world = PhysicsWorld::new();
    world.add_body(RigidBody::default()).expect("valid body");
    world.add_body(RigidBody::default()).expect("valid body");
    world.tick(DT);
    assert!(world.broad_phase_pairs().is_empty());
    assert_eq!(world.contacts().count(), 0);
}

#[test]
fn boxes_touching_on_a_split_line_are_paired_by_both_indices() {
    let touching_pairs = |index: SpatialIndexKind| {
        let mut world = PhysicsWorld::with_config(SimulationConfig {
            gravity: Vec3::ZERO,
            broad_phase: BroadPhaseConfig {
                index,
                include_static_bodies: false,
            },
            ..SimulationConfig::default()
        })
        .expect("valid config");
        for x in [-1.0, 1.0] {
            world
                .add_body(
                    RigidBody::builder()
                        .position(Vec3::new(x, 0.0, -5.0))
                        .collider(Collider::cuboid(Vec3::ONE))
                        .build(),
                )
                .expect("valid body");
        }
        world.tick(DT);
        world.broad_phase_pairs().to_vec()
    };

    let tree = touching_pairs(SpatialIndexKind::QuadTree {
        world_size: 64.0,
        max_depth: 5,
        max_objects: 1,
    });
    let hash = touching_pairs(SpatialIndexKind::default());
    assert_eq!(tree.len(), 1);
    assert_eq!(tree, hash);
}
