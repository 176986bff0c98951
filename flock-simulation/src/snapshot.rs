//! Per-tick output handed to the rendering side.

use std::sync::Arc;

use flock_core::{AgentKind, AgentStore};
use serde::{Deserialize, Serialize};

/// What a renderer needs to draw one agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub kind: AgentKind,
}

/// Immutable view of the whole flock after a tick, in store order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub timestamp_ms: u64,
    pub agents: Vec<AgentSnapshot>,
}

impl Snapshot {
    pub fn capture(store: &AgentStore, tick: u64, timestamp_ms: u64) -> Self {
        let agents = store
            .iter()
            .map(|agent| AgentSnapshot {
                id: agent.id.get(),
                x: agent.position.x,
                y: agent.position.y,
                kind: agent.kind,
            })
            .collect();
        Self { tick, timestamp_ms, agents }
    }

    pub fn leader(&self) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|agent| agent.kind == AgentKind::Leader)
    }
}

/// Receives every published snapshot. Implementations must not block for
/// long: they run inside the tick.
pub trait SnapshotObserver: Send {
    fn on_snapshot(&mut self, snapshot: &Arc<Snapshot>);
}

impl<F> SnapshotObserver for F
where
    F: FnMut(&Arc<Snapshot>) + Send,
{
    fn on_snapshot(&mut self, snapshot: &Arc<Snapshot>) {
        self(snapshot)
    }
}
