use rigid_tick::*;

fn main() {
    let config = SimulationConfig {
        broad_phase: BroadPhaseConfig {
            include_static_bodies: true,
            ..BroadPhaseConfig::default()
        },
        ..SimulationConfig::default()
    };
    let Ok(mut world) = PhysicsWorld::with_config(config) else {
        eprintln!("invalid simulation config");
        return;
    };
    world.set_parallel_enabled(true);

    let ground = RigidBody::builder()
        .static_body()
        .position(Vec3::new(0.0, -0.5, 0.0))
        .collider(Collider::cuboid(Vec3::new(10.0, 0.5, 10.0)))
        .build();
    if let Err(err) = world.add_body(ground) {
        eprintln!("failed to add ground: {err}");
        return;
    }

    let mut spheres = Vec::new();
    for i in 0..10 {
        let body = RigidBody::builder()
            .position(Vec3::new((i % 3) as f32 * 0.3, 1.0 + i as f32 * 1.2, 0.0))
            .restitution(0.2)
            .collider(Collider::sphere(0.5))
            .build();
        match world.add_body(body) {
            Ok(id) => spheres.push(id),
            Err(err) => eprintln!("skipping sphere {i}: {err}"),
        }
    }

    for frame in 0..240 {
        world.step(1.0 / 60.0);
        if frame % 60 == 59 {
            let asleep = spheres
                .iter()
                .filter_map(|id| world.body(*id))
                .filter(|b| b.is_sleeping)
                .count();
            println!(
                "t = {:.0}s: {} contacts, {} of {} spheres asleep",
                (frame + 1) as f32 / 60.0,
                world.contacts().count(),
                asleep,
                spheres.len()
            );
            println!("{}", world.profiler());
        }
    }

    for id in &spheres {
        if let Some(body) = world.body(*id) {
            println!("sphere {id}: {:?}", body.transform.position);
        }
    }
}
