//! Leader-follower flocking: spatial indexing, steering, boundaries and the
//! tick lifecycle that ties them together.

pub mod boundary;
pub mod forces;
pub mod leader;
pub mod simulation;
pub mod snapshot;
pub mod spatial;
pub mod spawn;
pub mod variant;

pub use boundary::BoundaryPolicy;
pub use forces::{ForceModel, Neighbor, Steering};
pub use leader::LeaderController;
pub use simulation::{Lifecycle, Simulation, SimulationError, TickReport};
pub use snapshot::{AgentSnapshot, Snapshot, SnapshotObserver};
pub use spatial::{IndexEntry, Rect, SpatialIndex};
pub use spawn::spawn_flock;
pub use variant::{Variant, VariantFactory, VariantSelector, FLOCKING};

#[cfg(test)]
mod tests {
    use super::*;
    use flock_config::{SimulationConfig, UpdateStrategy, Viewport};
    use proptest::prelude::*;

    fn strategy() -> impl Strategy<Value = UpdateStrategy> {
        prop_oneof![Just(UpdateStrategy::InPlace), Just(UpdateStrategy::DoubleBuffer)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn speeds_stay_bounded(
            seed in any::<u64>(),
            agents in 1usize..60,
            cohesion_factor in 0.0f32..2.0,
            separation_factor in 0.0f32..5.0,
            particle_max_speed in 0.5f32..10.0,
            leader_max_speed in 0.5f32..5.0,
            width in 100.0f32..800.0,
            update_strategy in strategy(),
        ) {
            let config = SimulationConfig {
                agent_count: agents,
                cohesion_factor,
                separation_factor,
                particle_max_speed,
                leader_max_speed,
                spawn_radius: width / 4.0,
                viewport: Viewport::new(width, width * 0.75),
                update_strategy,
                seed: Some(seed),
                ..SimulationConfig::default()
            };
            let mut simulation = Simulation::start(config).unwrap();

            for _ in 0..30 {
                simulation.tick().unwrap();
                let store = simulation.store().unwrap();
                prop_assert_eq!(store.len(), agents + 1);
                for agent in store.iter() {
                    prop_assert!(agent.is_finite());
                    let limit =
                        if agent.is_leader() { leader_max_speed } else { particle_max_speed };
                    prop_assert!(agent.speed() <= limit * (1.0 + 1e-4));
                }
            }
        }
    }
}
