//! Neighbor-driven steering for normal agents.
//!
//! Each agent blends three neighbor terms with a bias toward the leader:
//! 1. Cohesion - pull toward the relative positions of nearby agents
//! 2. Separation - short-range push away from very close agents
//! 3. Alignment - match the average heading of neighbors
//!
//! The three terms share a single gain (`separation_factor`).

use flock_config::SimulationConfig;
use flock_core::Vec2;

/// Distances at or below this are treated as coincident and contribute no
/// separation.
pub const MIN_SEPARATION_DISTANCE: f32 = 1e-6;

/// State of one neighbor as seen by the agent being steered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Result of steering one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    /// Velocity change to apply this tick.
    pub delta: Vec2,
    pub neighbors: usize,
    /// Set when a non-finite intermediate was replaced by zero.
    pub guarded: bool,
}

/// Force tuning, taken from the simulation configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceModel {
    pub cohesion_radius: f32,
    pub separation_radius: f32,
    pub alignment_factor: f32,
    pub cohesion_factor: f32,
    pub separation_factor: f32,
}

impl ForceModel {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            cohesion_radius: config.cohesion_radius,
            separation_radius: config.separation_radius,
            alignment_factor: config.alignment_factor,
            cohesion_factor: config.cohesion_factor,
            separation_factor: config.separation_factor,
        }
    }

    /// Half-width of the square queried around each agent.
    #[inline]
    pub fn query_half_extent(&self) -> f32 {
        self.cohesion_radius
    }

    /// Computes the velocity change for an agent at `position`.
    ///
    /// `neighbors` must not contain the agent itself. Every neighbor counts
    /// toward alignment; cohesion and separation are limited by their radii.
    pub fn steer(&self, position: Vec2, neighbors: &[Neighbor], leader: Vec2) -> Steering {
        let mut alignment = Vec2::ZERO;
        let mut cohesion = Vec2::ZERO;
        let mut separation = Vec2::ZERO;
        let mut guarded = false;

        for neighbor in neighbors {
            let offset = neighbor.position - position;
            let distance = offset.length();

            if distance < self.cohesion_radius {
                cohesion += offset;
            }
            if distance < self.separation_radius && distance > MIN_SEPARATION_DISTANCE {
                // Unit vector away from the neighbor, weighted by 1/distance
                separation -= offset / (distance * distance);
            }
            alignment += neighbor.velocity;
        }

        if !neighbors.is_empty() {
            alignment /= neighbors.len() as f32;
        }

        let to_leader = leader - position;
        alignment += to_leader * self.alignment_factor;
        cohesion += to_leader * self.cohesion_factor;

        let alignment_len = alignment.length();
        if alignment_len > 0.0 && alignment_len.is_finite() {
            alignment /= alignment_len;
        }

        let terms = [&mut alignment, &mut cohesion, &mut separation];
        for term in terms {
            if !term.is_finite() {
                *term = Vec2::ZERO;
                guarded = true;
            }
        }

        let mut delta = (alignment + cohesion + separation) * self.separation_factor;
        if !delta.is_finite() {
            delta = Vec2::ZERO;
            guarded = true;
        }

        Steering { delta, neighbors: neighbors.len(), guarded }
    }
}
