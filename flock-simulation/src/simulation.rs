//! The simulation object: owns the flock and its lifecycle and runs one tick
//! at a time when the host asks it to.

use std::sync::Arc;

use flock_config::{ConfigError, ConfigLoader, SimulationConfig, UpdateStrategy, Viewport};
use flock_core::{clamp_length, Agent, AgentStore, Clock, StoreError, SystemClock, Vec2};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::boundary::BoundaryPolicy;
use crate::forces::{ForceModel, Neighbor};
use crate::leader::LeaderController;
use crate::snapshot::{Snapshot, SnapshotObserver};
use crate::spatial::{Rect, SpatialIndex};
use crate::spawn::spawn_flock;

/// `Uninitialized -> Running -> Stopped`. Stopping is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Running,
    Stopped,
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("simulation is {0:?}, expected Running")]
    NotRunning(Lifecycle),

    #[error("simulation has already been started")]
    AlreadyStarted,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid agent population: {0}")]
    Store(#[from] StoreError),

    #[error("unknown simulation variant '{0}'")]
    UnknownVariant(String),
}

/// Summary of one tick, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub redirected: bool,
    /// Agents whose velocity was nudged by the soft boundary.
    pub nudged: usize,
    /// Non-finite intermediates replaced by a fallback.
    pub guarded: usize,
    pub mean_neighbors: f32,
}

/// Everything that only exists once the simulation has been initialized.
struct Flock {
    config: SimulationConfig,
    store: AgentStore,
    forces: ForceModel,
    boundary: BoundaryPolicy,
    leader: LeaderController,
    viewport: Viewport,
    rng: StdRng,
    // Reused between agents to avoid a per-agent allocation
    neighbors: Vec<Neighbor>,
}

pub struct Simulation {
    lifecycle: Lifecycle,
    clock: Arc<dyn Clock>,
    flock: Option<Flock>,
    observers: Vec<Box<dyn SnapshotObserver>>,
    tick: u64,
    latest: Option<Arc<Snapshot>>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Creates an uninitialized simulation driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            clock,
            flock: None,
            observers: Vec::new(),
            tick: 0,
            latest: None,
        }
    }

    /// Creates and initializes a simulation in one step.
    pub fn start(config: SimulationConfig) -> Result<Self, SimulationError> {
        let mut simulation = Self::new();
        simulation.init(config)?;
        Ok(simulation)
    }

    /// Seeds the leader and the flock and moves to `Running`.
    pub fn init(&mut self, config: SimulationConfig) -> Result<(), SimulationError> {
        self.ensure_uninitialized()?;
        ConfigLoader::validate_simulation(&config)?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let store = spawn_flock(&config, &mut rng)?;
        self.install(config, store, rng)
    }

    /// Like [`Simulation::init`] but with a caller-provided population.
    /// `config.agent_count` is ignored; the store must contain a leader.
    pub fn init_with_store(
        &mut self,
        config: SimulationConfig,
        store: AgentStore,
    ) -> Result<(), SimulationError> {
        self.ensure_uninitialized()?;
        ConfigLoader::validate_simulation(&config)?;
        if store.leader().is_none() {
            return Err(StoreError::MissingLeader.into());
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.install(config, store, rng)
    }

    fn ensure_uninitialized(&self) -> Result<(), SimulationError> {
        if self.lifecycle != Lifecycle::Uninitialized {
            return Err(SimulationError::AlreadyStarted);
        }
        Ok(())
    }

    fn install(
        &mut self,
        config: SimulationConfig,
        store: AgentStore,
        rng: StdRng,
    ) -> Result<(), SimulationError> {
        info!(
            "Initializing flock with {} agents ({:?} updates, viewport {}x{})",
            store.len(),
            config.update_strategy,
            config.viewport.width,
            config.viewport.height
        );

        self.flock = Some(Flock {
            forces: ForceModel::from_config(&config),
            boundary: BoundaryPolicy::from_config(&config),
            leader: LeaderController::new(&config),
            viewport: config.viewport,
            neighbors: Vec::with_capacity(64),
            config,
            store,
            rng,
        });
        self.lifecycle = Lifecycle::Running;
        Ok(())
    }

    /// Runs one full step and publishes the resulting snapshot.
    pub fn tick(&mut self) -> Result<TickReport, SimulationError> {
        if self.lifecycle != Lifecycle::Running {
            return Err(SimulationError::NotRunning(self.lifecycle));
        }
        let flock = self.flock.as_mut().ok_or(SimulationError::NotRunning(self.lifecycle))?;

        let now_ms = self.clock.now_ms();
        let mut report = flock.step(now_ms);
        self.tick += 1;
        report.tick = self.tick;

        if report.guarded > 0 {
            warn!("Tick {}: replaced {} non-finite values", self.tick, report.guarded);
        }

        let snapshot = Arc::new(Snapshot::capture(&flock.store, self.tick, now_ms));
        for observer in self.observers.iter_mut() {
            observer.on_snapshot(&snapshot);
        }
        self.latest = Some(snapshot);

        Ok(report)
    }

    /// Stops the simulation and drops every observer. Idempotent.
    pub fn stop(&mut self) {
        if self.lifecycle == Lifecycle::Stopped {
            return;
        }
        info!("Stopping flock simulation after {} ticks", self.tick);
        self.lifecycle = Lifecycle::Stopped;
        self.observers.clear();
    }

    /// Registers an observer that receives every snapshot from now on.
    pub fn subscribe<O: SnapshotObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn store(&self) -> Option<&AgentStore> {
        self.flock.as_ref().map(|flock| &flock.store)
    }

    pub fn config(&self) -> Option<&SimulationConfig> {
        self.flock.as_ref().map(|flock| &flock.config)
    }

    pub fn leader_redirects(&self) -> u64 {
        self.flock.as_ref().map_or(0, |flock| flock.leader.redirects())
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.flock.as_ref().map(|flock| flock.viewport)
    }

    /// Updates the viewport used by boundary checks from the next tick on.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if let Some(flock) = self.flock.as_mut() {
            debug!("Viewport resized to {}x{}", viewport.width, viewport.height);
            flock.viewport = viewport;
        }
    }

    /// The snapshot published by the most recent tick.
    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.latest.clone()
    }
}

impl Flock {
    fn step(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();
        // The leader steers everyone else and is not anyone's neighbor
        let index = SpatialIndex::from_store(&self.store, |agent| !agent.is_leader());
        let Some(leader_idx) = self.store.leader_index() else {
            return report;
        };
        let leader_position = self.store.as_slice()[leader_idx].position;

        let neighbor_total = match self.config.update_strategy {
            UpdateStrategy::InPlace => {
                self.steer_in_place(&index, leader_idx, leader_position, &mut report)
            }
            UpdateStrategy::DoubleBuffer => {
                self.steer_double_buffered(&index, leader_idx, leader_position, &mut report)
            }
        };
        let normals = self.store.len().saturating_sub(1);
        if normals > 0 {
            report.mean_neighbors = neighbor_total as f32 / normals as f32;
        }

        if let Some(leader) = self.store.leader_mut() {
            report.redirected =
                self.leader.update(leader, &self.boundary, self.viewport, now_ms, &mut self.rng);
        }

        report
    }

    /// Updates agents one at a time; later agents see earlier agents'
    /// new positions and velocities.
    fn steer_in_place(
        &mut self,
        index: &SpatialIndex,
        leader_idx: usize,
        leader: Vec2,
        report: &mut TickReport,
    ) -> usize {
        let half_extent = self.forces.query_half_extent();
        let max_speed = self.config.particle_max_speed;
        let mut neighbor_total = 0;

        for idx in 0..self.store.len() {
            if idx == leader_idx {
                continue;
            }
            let position = self.store.as_slice()[idx].position;
            let rect = Rect::around(position, half_extent);
            gather_neighbors(index, self.store.as_slice(), idx, rect, &mut self.neighbors);

            let steering = self.forces.steer(position, &self.neighbors, leader);
            neighbor_total += steering.neighbors;
            report.guarded += usize::from(steering.guarded);

            let agent = &mut self.store.as_mut_slice()[idx];
            let outcome =
                integrate(agent, steering.delta, max_speed, &self.boundary, self.viewport);
            report.nudged += usize::from(outcome.nudged);
            report.guarded += usize::from(outcome.guarded);
        }

        neighbor_total
    }

    /// Computes every agent's change from the state at the start of the tick,
    /// then commits all of them.
    fn steer_double_buffered(
        &mut self,
        index: &SpatialIndex,
        leader_idx: usize,
        leader: Vec2,
        report: &mut TickReport,
    ) -> usize {
        let half_extent = self.forces.query_half_extent();
        let max_speed = self.config.particle_max_speed;
        let frame: Vec<Agent> = self.store.as_slice().to_vec();
        let mut deltas = Vec::with_capacity(frame.len());
        let mut neighbor_total = 0;

        for (idx, agent) in frame.iter().enumerate() {
            if idx == leader_idx {
                continue;
            }
            let rect = Rect::around(agent.position, half_extent);
            gather_neighbors(index, &frame, idx, rect, &mut self.neighbors);

            let steering = self.forces.steer(agent.position, &self.neighbors, leader);
            neighbor_total += steering.neighbors;
            report.guarded += usize::from(steering.guarded);
            deltas.push((idx, steering.delta));
        }

        let agents = self.store.as_mut_slice();
        for (idx, delta) in deltas {
            let outcome =
                integrate(&mut agents[idx], delta, max_speed, &self.boundary, self.viewport);
            report.nudged += usize::from(outcome.nudged);
            report.guarded += usize::from(outcome.guarded);
        }

        neighbor_total
    }
}

/// Collects the state of every indexed agent in `rect` except `self_idx`,
/// reading positions and velocities from `agents`.
fn gather_neighbors(
    index: &SpatialIndex,
    agents: &[Agent],
    self_idx: usize,
    rect: Rect,
    out: &mut Vec<Neighbor>,
) {
    out.clear();
    index.for_each_in(&rect, |entry| {
        if entry.index != self_idx {
            let other = &agents[entry.index];
            out.push(Neighbor { position: other.position, velocity: other.velocity });
        }
    });
}

#[derive(Debug, Clone, Copy, Default)]
struct Integration {
    nudged: bool,
    guarded: bool,
}

/// Applies a velocity change to a normal agent, moves it, then applies the
/// soft boundary. Speed is clamped before moving and again after the nudge.
fn integrate(
    agent: &mut Agent,
    delta: Vec2,
    max_speed: f32,
    boundary: &BoundaryPolicy,
    viewport: Viewport,
) -> Integration {
    let mut outcome = Integration::default();
    let previous = agent.position;

    let velocity = agent.velocity + delta;
    outcome.guarded = !velocity.is_finite();
    agent.velocity = clamp_length(velocity, max_speed);
    agent.position += agent.velocity;
    if !agent.position.is_finite() {
        agent.position = previous;
        agent.velocity = Vec2::ZERO;
        outcome.guarded = true;
    }

    outcome.nudged = boundary.apply(agent.position, &mut agent.velocity, viewport);
    agent.velocity = clamp_length(agent.velocity, max_speed);
    outcome
}
