//! Initial placement of the leader and the flock.

use std::f32::consts::TAU;

use flock_config::SimulationConfig;
use flock_core::{AgentKind, AgentStore, StoreError, Vec2};
use rand::Rng;

/// Seeds a fresh store: the leader at the viewport center, then
/// `agent_count` normal agents scattered around it.
///
/// The leader always receives id 0 and normal agents ids `1..=agent_count`.
pub fn spawn_flock<R: Rng>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<AgentStore, StoreError> {
    let mut store = AgentStore::with_capacity(config.agent_count + 1);
    let (cx, cy) = config.viewport.center();
    let center = Vec2::new(cx, cy);

    store.spawn(AgentKind::Leader, center, random_velocity(rng, config.leader_initial_speed))?;

    for _ in 0..config.agent_count {
        let angle = rng.gen::<f32>() * TAU;
        let distance = rng.gen::<f32>() * config.spawn_radius;
        let position = center + Vec2::new(angle.cos(), angle.sin()) * distance;
        let velocity = random_velocity(rng, config.particle_initial_speed);
        store.spawn(AgentKind::Normal, position, velocity)?;
    }

    Ok(store)
}

/// Velocity with each component uniform in `[-max, max]`.
fn random_velocity<R: Rng>(rng: &mut R, max: f32) -> Vec2 {
    Vec2::new(rng.gen_range(-max..=max), rng.gen_range(-max..=max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_config::Viewport;
    use flock_core::AgentId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn leader_first_at_center() {
        let mut config = SimulationConfig::default();
        config.agent_count = 50;
        config.viewport = Viewport::new(640.0, 480.0);
        let store = spawn_flock(&config, &mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(store.len(), 51);
        let leader = store.leader().unwrap();
        assert_eq!(leader.id, AgentId(0));
        assert_eq!(leader.position, Vec2::new(320.0, 240.0));
        assert!(leader.velocity.x.abs() <= 2.0 && leader.velocity.y.abs() <= 2.0);
    }

    #[test]
    fn normals_within_spawn_radius() {
        let config = SimulationConfig::default();
        let store = spawn_flock(&config, &mut StdRng::seed_from_u64(11)).unwrap();
        let center = store.leader().unwrap().position;

        for (offset, agent) in store.iter().skip(1).enumerate() {
            assert_eq!(agent.kind, AgentKind::Normal);
            assert_eq!(agent.id, AgentId(offset as u32 + 1));
            assert!(agent.position.distance(center) <= config.spawn_radius + 1e-3);
            assert!(agent.velocity.x.abs() <= 1.0 && agent.velocity.y.abs() <= 1.0);
        }
    }

    #[test]
    fn same_seed_same_flock() {
        let config = SimulationConfig { agent_count: 20, ..SimulationConfig::default() };
        let a = spawn_flock(&config, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = spawn_flock(&config, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }
}
