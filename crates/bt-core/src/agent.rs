/// Stable handle for the agent that owns a tree instance.
///
/// Deterministic simulation requires a stable ordering across agents, so
/// the handle is an opaque numeric id rather than an entity pointer. The
/// scheduler never dereferences it; leaves hand it back to their own world
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentHandle(pub u64);

impl AgentHandle {
    pub fn stable_id(self) -> u64 {
        self.0
    }
}

impl From<u64> for AgentHandle {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
