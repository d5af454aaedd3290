//! Threat system - release threats into the lane, move them, and report arrivals

use glucoguard_logic::spawner::ThreatKind;
use hecs::{Entity, World};

use crate::components::{LanePosition, Threat, Velocity};

/// Spawn a threat at the start of the lane.
pub fn spawn_threat(world: &mut World, kind: ThreatKind, now: f64, speed: f32) -> Entity {
    world.spawn((
        Threat {
            kind,
            spawned_at: now,
        },
        LanePosition::default(),
        Velocity { speed },
    ))
}

/// Move every threat along the lane. Threats reaching `lane_length` are
/// despawned and returned in release order.
pub fn threat_movement_system(world: &mut World, delta_seconds: f32, lane_length: f32) -> Vec<ThreatKind> {
    let mut arrived: Vec<(f64, u32, Entity, ThreatKind)> = Vec::new();

    for (entity, (threat, pos, vel)) in
        world.query_mut::<(&Threat, &mut LanePosition, &Velocity)>()
    {
        pos.x += vel.speed * delta_seconds;
        if pos.x >= lane_length {
            arrived.push((threat.spawned_at, entity.id(), entity, threat.kind));
        }
    }

    arrived.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    for (_, _, entity, _) in &arrived {
        let _ = world.despawn(*entity);
    }
    arrived.into_iter().map(|(_, _, _, kind)| kind).collect()
}

/// Threats currently in the lane, with progress in [0, 1).
pub fn threats_in_lane(world: &World, lane_length: f32) -> Vec<(ThreatKind, f32)> {
    let mut threats: Vec<(f64, ThreatKind, f32)> = world
        .query::<(&Threat, &LanePosition)>()
        .iter()
        .map(|(_, (threat, pos))| (threat.spawned_at, threat.kind, pos.x / lane_length))
        .collect();
    threats.sort_by(|a, b| a.0.total_cmp(&b.0));
    threats.into_iter().map(|(_, kind, p)| (kind, p)).collect()
}
