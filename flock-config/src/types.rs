use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub runner: RunnerConfig,
    pub transport: TransportConfig,
}

/// Viewport the flock lives in. Spawning is centered on it and the soft
/// boundary is measured from its edges.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

/// How a tick applies per-agent updates.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    /// Agents are updated one after another in store order and later agents
    /// observe the already-updated state of earlier ones.
    #[default]
    InPlace,
    /// Every agent reads the positions and velocities captured at the start
    /// of the tick; all updates are committed together.
    DoubleBuffer,
}

/// Named tuning presets.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Tight flock that follows the leader closely.
    #[default]
    Calm,
    /// Wide perception, strong separation and weak leader pull.
    Chaos,
}

/// Simulation parameters. Immutable for the lifetime of a run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub cohesion_radius: f32,
    pub separation_radius: f32,
    pub alignment_factor: f32,
    pub cohesion_factor: f32,
    pub separation_factor: f32,
    pub particle_max_speed: f32,
    pub leader_max_speed: f32,
    pub edge_buffer: f32,
    pub damping_factor: f32,
    pub leader_adjustment_delay_ms: u64,
    /// Number of `Normal` agents. The leader comes on top of this.
    pub agent_count: usize,
    pub viewport: Viewport,
    /// Normal agents spawn within this distance of the leader.
    pub spawn_radius: f32,
    /// Initial velocity components of normal agents are drawn from `[-v, v]`.
    pub particle_initial_speed: f32,
    /// Initial velocity components of the leader are drawn from `[-v, v]`.
    pub leader_initial_speed: f32,
    pub tick_interval_ms: u64,
    pub update_strategy: UpdateStrategy,
    /// Fixed RNG seed for reproducible runs. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Builds the configuration for a named preset.
    pub fn preset(preset: Preset) -> Self {
        let mut config = Self::default();
        config.apply_preset(preset);
        config
    }

    /// Overwrites the force tuning fields with the values of `preset`,
    /// leaving population, viewport and timing untouched.
    pub fn apply_preset(&mut self, preset: Preset) {
        match preset {
            Preset::Calm => {
                self.cohesion_radius = 50.0;
                self.separation_radius = 3.0;
                self.alignment_factor = 10.0;
                self.cohesion_factor = 0.25;
                self.separation_factor = 0.0005;
                self.particle_max_speed = 5.0;
                self.leader_max_speed = 2.0;
            }
            Preset::Chaos => {
                self.cohesion_radius = 100.0;
                self.separation_radius = 20.0;
                self.alignment_factor = 0.5;
                self.cohesion_factor = 0.005;
                self.separation_factor = 0.001;
                self.particle_max_speed = 5.0;
                self.leader_max_speed = 3.0;
            }
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cohesion_radius: 50.0,
            separation_radius: 3.0,
            alignment_factor: 10.0,
            cohesion_factor: 0.25,
            separation_factor: 0.0005,
            particle_max_speed: 5.0,
            leader_max_speed: 2.0,
            edge_buffer: 200.0,
            damping_factor: 0.05,
            leader_adjustment_delay_ms: 4000,
            agent_count: 1500,
            viewport: Viewport::default(),
            spawn_radius: 500.0,
            particle_initial_speed: 1.0,
            leader_initial_speed: 2.0,
            tick_interval_ms: 16,
            update_strategy: UpdateStrategy::default(),
            seed: None,
        }
    }
}

/// Settings for the host loop that drives ticks.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Stop after this many ticks. `None` runs until interrupted.
    pub max_ticks: Option<u64>,
    /// Emit a debug summary every N ticks (0 disables).
    pub log_frequency: u32,
    /// Snapshots buffered between the simulation and the output thread.
    pub channel_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_ticks: None,
            log_frequency: 100,
            channel_capacity: 4,
        }
    }
}

/// Transport-specific configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    pub serializer: SerializerType,
    pub sender: SenderConfig,
    /// Publish every Nth snapshot only (1 publishes all).
    pub output_frequency: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            serializer: SerializerType::Json,
            sender: SenderConfig::Null,
            output_frequency: 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    #[default]
    Json,
    Binary,
}

/// Configuration specific to the File sender
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileSenderConfig {
    pub output_path: String,
}

/// Enum defining the sender type and its specific configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "sender_type", content = "options")] // Nest options
pub enum SenderConfig {
    Stdio,
    File(FileSenderConfig),
    Null,
}
