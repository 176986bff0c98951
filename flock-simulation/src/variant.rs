//! Host-side selector for mutually exclusive simulation variants.
//!
//! Exactly one variant is active and receives ticks. Switching stops the
//! previous one; since stopping is terminal, selecting a variant again
//! builds a fresh instance from its registered factory.

use log::info;

use crate::simulation::{Lifecycle, Simulation, SimulationError, TickReport};

/// Name the flocking simulation registers under.
pub const FLOCKING: &str = "flocking";

/// A simulation the host can drive.
pub trait Variant: Send {
    fn name(&self) -> &str;
    fn tick(&mut self) -> Result<TickReport, SimulationError>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

impl Variant for Simulation {
    fn name(&self) -> &str {
        FLOCKING
    }

    fn tick(&mut self) -> Result<TickReport, SimulationError> {
        Simulation::tick(self)
    }

    fn stop(&mut self) {
        Simulation::stop(self)
    }

    fn is_running(&self) -> bool {
        Simulation::is_running(self)
    }
}

pub type VariantFactory = Box<dyn Fn() -> Result<Box<dyn Variant>, SimulationError> + Send>;

#[derive(Default)]
pub struct VariantSelector {
    factories: Vec<(String, VariantFactory)>,
    active: Option<Box<dyn Variant>>,
}

impl VariantSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Variant>, SimulationError> + Send + 'static,
    {
        let name = name.into();
        self.factories.retain(|(existing, _)| *existing != name);
        self.factories.push((name, Box::new(factory)));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(name, _)| name.as_str())
    }

    /// Stops the active variant and starts a fresh instance of `name`.
    ///
    /// If building the new variant fails, nothing is active afterwards.
    pub fn select(&mut self, name: &str) -> Result<(), SimulationError> {
        let factory = self
            .factories
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, factory)| factory)
            .ok_or_else(|| SimulationError::UnknownVariant(name.to_string()))?;

        if let Some(mut previous) = self.active.take() {
            info!("Switching from '{}' to '{}'", previous.name(), name);
            previous.stop();
        } else {
            info!("Activating '{}'", name);
        }

        self.active = Some(factory()?);
        Ok(())
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref().map(|variant| variant.name())
    }

    /// Ticks the active variant only.
    pub fn tick(&mut self) -> Result<TickReport, SimulationError> {
        match self.active.as_mut() {
            Some(variant) => variant.tick(),
            None => Err(SimulationError::NotRunning(Lifecycle::Uninitialized)),
        }
    }

    /// Stops the active variant. Always succeeds.
    pub fn stop(&mut self) {
        if let Some(variant) = self.active.as_mut() {
            variant.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|variant| variant.is_running())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_config::SimulationConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Stand-in for an unrelated simulation that only counts its ticks.
    struct Counter {
        ticks: Arc<AtomicUsize>,
        running: bool,
    }

    impl Variant for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn tick(&mut self) -> Result<TickReport, SimulationError> {
            if !self.running {
                return Err(SimulationError::NotRunning(Lifecycle::Stopped));
            }
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst) as u64 + 1;
            Ok(TickReport { tick, ..TickReport::default() })
        }

        fn stop(&mut self) {
            self.running = false;
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    fn selector(counter_ticks: Arc<AtomicUsize>) -> VariantSelector {
        let mut selector = VariantSelector::new();
        selector.register(FLOCKING, || {
            let config =
                SimulationConfig { agent_count: 20, seed: Some(1), ..SimulationConfig::default() };
            Ok(Box::new(Simulation::start(config)?) as Box<dyn Variant>)
        });
        selector.register("counter", move || {
            let counter = Counter { ticks: counter_ticks.clone(), running: true };
            Ok(Box::new(counter) as Box<dyn Variant>)
        });
        selector
    }

    #[test]
    fn nothing_active_until_selected() {
        let mut selector = selector(Arc::new(AtomicUsize::new(0)));
        assert_eq!(selector.active_name(), None);
        assert!(!selector.is_running());
        assert!(matches!(selector.tick(), Err(SimulationError::NotRunning(_))));
        assert_eq!(selector.names().collect::<Vec<_>>(), vec![FLOCKING, "counter"]);
    }

    #[test]
    fn only_the_active_variant_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut selector = selector(ticks.clone());

        selector.select(FLOCKING).unwrap();
        assert_eq!(selector.tick().unwrap().tick, 1);
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        selector.select("counter").unwrap();
        assert_eq!(selector.active_name(), Some("counter"));
        selector.tick().unwrap();
        selector.tick().unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        // Switching back starts a fresh flock
        selector.select(FLOCKING).unwrap();
        assert_eq!(selector.tick().unwrap().tick, 1);
    }

    #[test]
    fn unknown_variant_keeps_current() {
        let mut selector = selector(Arc::new(AtomicUsize::new(0)));
        selector.select(FLOCKING).unwrap();
        assert!(matches!(selector.select("black-hole"), Err(SimulationError::UnknownVariant(_))));
        assert_eq!(selector.active_name(), Some(FLOCKING));
        assert!(selector.is_running());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut selector = selector(Arc::new(AtomicUsize::new(0)));
        selector.stop();
        selector.select(FLOCKING).unwrap();
        selector.stop();
        selector.stop();
        assert!(!selector.is_running());
        assert!(selector.tick().is_err());
    }
}
