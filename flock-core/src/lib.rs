//! Core data model for the flock simulation: agents, the agent store and time.

pub mod agent;
pub mod clock;
pub mod store;

pub use agent::{Agent, AgentId, AgentKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use glam::Vec2;
pub use store::{AgentStore, IdAllocator, StoreError};

/// Returns `v` scaled down to `max_len` if it is longer, preserving direction.
///
/// Non-finite input collapses to zero so callers never propagate NaN.
#[inline]
pub fn clamp_length(v: Vec2, max_len: f32) -> Vec2 {
    if !v.is_finite() {
        return Vec2::ZERO;
    }
    let len_sq = v.length_squared();
    if len_sq > max_len * max_len {
        // Only calculate sqrt when needed
        let len = len_sq.sqrt();
        v * (max_len / len)
    } else {
        v
    }
}
