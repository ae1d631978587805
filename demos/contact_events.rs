use std::sync::{Arc, Mutex};

use rigid_tick::*;

fn main() {
    let config = SimulationConfig {
        gravity: Vec3::ZERO,
        ..SimulationConfig::default()
    };
    let Ok(mut world) = PhysicsWorld::with_config(config) else {
        eprintln!("invalid simulation config");
        return;
    };

    let log = Arc::new(Mutex::new(Vec::new()));
    let (enter, exit) = (Arc::clone(&log), Arc::clone(&log));
    let sensor = Collider::builder()
        .box_shape(Vec3::splat(1.0))
        .is_trigger(true)
        .on_enter(move |other| {
            if let Ok(mut log) = enter.lock() {
                log.push(format!("{other} entered the sensor"));
            }
        })
        .on_exit(move |other| {
            if let Ok(mut log) = exit.lock() {
                log.push(format!("{other} left the sensor"));
            }
        })
        .build();
    let sensor_body = RigidBody::builder().kinematic().collider(sensor).build();
    if let Err(err) = world.add_body(sensor_body) {
        eprintln!("failed to add sensor: {err}");
        return;
    }

    let visitor = RigidBody::builder()
        .position(Vec3::new(-4.0, 0.0, 0.0))
        .linear_velocity(Vec3::new(3.0, 0.0, 0.0))
        .collider(Collider::sphere(0.25))
        .build();
    if let Err(err) = world.add_body(visitor) {
        eprintln!("failed to add visitor: {err}");
        return;
    }

    for frame in 0..180 {
        world.step(1.0 / 60.0);
        for event in world.events() {
            if event.kind != ContactEventKind::Stay {
                println!("frame {frame}: {:?} {}", event.kind, event.key);
            }
        }
    }

    if let Ok(log) = log.lock() {
        for line in log.iter() {
            println!("{line}");
        }
    };
}
