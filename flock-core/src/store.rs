use std::collections::HashSet;

use glam::Vec2;
use thiserror::Error;

use crate::agent::{Agent, AgentId, AgentKind};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("store already holds a leader ({0})")]
    DuplicateLeader(AgentId),

    #[error("agent id {0} is already in use")]
    DuplicateId(AgentId),

    #[error("store has no leader")]
    MissingLeader,

    #[error("no agent ids left to allocate")]
    IdSpaceExhausted,
}

/// Hands out agent ids. Ids are monotonically increasing and never recycled.
#[derive(Debug, Default)]
pub struct IdAllocator {
    // Wider than `AgentId` so that handing out `u32::MAX` cannot overflow
    next_id: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Result<AgentId, StoreError> {
        let id = u32::try_from(self.next_id).map_err(|_| StoreError::IdSpaceExhausted)?;
        self.next_id += 1;
        Ok(AgentId(id))
    }

    /// Ensures future ids are strictly greater than `id`.
    fn reserve_past(&mut self, id: AgentId) {
        self.next_id = self.next_id.max(u64::from(id.0) + 1);
    }
}

/// The live, mutable collection of agents.
///
/// Agents are kept in a flat `Vec` in insertion order, which is the fixed
/// order the simulation processes them in. At most one agent is the leader.
#[derive(Debug, Default)]
pub struct AgentStore {
    agents: Vec<Agent>,
    leader: Option<usize>,
    ids: IdAllocator,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            agents: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Builds a store from pre-made agents, checking id uniqueness and the
    /// single-leader rule.
    pub fn from_agents(agents: Vec<Agent>) -> Result<Self, StoreError> {
        let mut store = Self::with_capacity(agents.len());
        let mut seen = HashSet::with_capacity(agents.len());
        for agent in agents {
            if !seen.insert(agent.id) {
                return Err(StoreError::DuplicateId(agent.id));
            }
            store.insert(agent)?;
        }
        Ok(store)
    }

    /// Spawns a new agent with a freshly allocated id.
    pub fn spawn(
        &mut self,
        kind: AgentKind,
        position: Vec2,
        velocity: Vec2,
    ) -> Result<AgentId, StoreError> {
        if kind == AgentKind::Leader {
            if let Some(existing) = self.leader() {
                return Err(StoreError::DuplicateLeader(existing.id));
            }
        }
        let id = self.ids.allocate()?;
        self.push(Agent::new(id, kind, position, velocity));
        Ok(id)
    }

    fn insert(&mut self, agent: Agent) -> Result<(), StoreError> {
        if agent.is_leader() {
            if let Some(existing) = self.leader() {
                return Err(StoreError::DuplicateLeader(existing.id));
            }
        }
        self.ids.reserve_past(agent.id);
        self.push(agent);
        Ok(())
    }

    fn push(&mut self, agent: Agent) {
        if agent.is_leader() {
            self.leader = Some(self.agents.len());
        }
        self.agents.push(agent);
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Linear lookup by id. Index-based access is preferred on hot paths.
    pub fn find(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn leader_index(&self) -> Option<usize> {
        self.leader
    }

    pub fn leader(&self) -> Option<&Agent> {
        self.leader.map(|idx| &self.agents[idx])
    }

    pub fn leader_mut(&mut self) -> Option<&mut Agent> {
        match self.leader {
            Some(idx) => Some(&mut self.agents[idx]),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// Indices of all `Normal` agents, in processing order.
    pub fn normal_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.agents
            .iter()
            .enumerate()
            .filter(|(_, agent)| !agent.is_leader())
            .map(|(idx, _)| idx)
    }

    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    pub fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }
}
