use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable identifier of an agent. Never reused within a simulation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Normal,
    Leader,
}

/// A simulated point mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(id: AgentId, kind: AgentKind, position: Vec2, velocity: Vec2) -> Self {
        Self { id, position, velocity, kind }
    }

    #[inline]
    pub fn is_leader(&self) -> bool {
        self.kind == AgentKind::Leader
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// True when both position and velocity hold only finite values.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}
