use crate::{rng, AgentHandle, SplitMix64, Variables};

/// Stable index of a node inside its template's arena.
///
/// Assigned once at template build time and shared by every instance of
/// the template; runtime state for node `N` lives at slot `N` of the
/// instance's arena. Never a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Frame-level clock shared by every instance updated this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
    pub seed: u64,
}

/// Per-node view handed to nodes during one update pass.
///
/// Leaves reach the agent handle, time deltas, and the variable binding
/// only through this context; there is no global mutable lookup.
pub struct UpdateContext<'a> {
    pub clock: TickContext,
    pub agent: AgentHandle,
    pub instance_id: u64,
    /// Seconds this instance has been alive, accumulated from `dt_seconds`.
    pub elapsed_seconds: f64,
    pub variables: &'a mut Variables,
}

impl UpdateContext<'_> {
    /// Deterministic per-node random stream for the current frame.
    pub fn rng_for_node(&self, node: NodeId) -> SplitMix64 {
        let seed = rng::derive_seed(
            self.clock.seed,
            self.agent.stable_id() ^ self.clock.tick,
            node.0 as u64,
        );
        SplitMix64::new(seed)
    }
}
