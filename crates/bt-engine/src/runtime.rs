//! Per-instance runtime state: one [`Slot`] per template node, stored in
//! a flat arena indexed by `NodeId`. No per-node heap allocation apart
//! from leaf state blobs.

use bt_core::LeafState;

/// Mutable execution state for one node of one instance.
///
/// Valid only between the node's initialize and terminate; the engine
/// resets it to the kind's default on every (re-)initialize.
pub enum RuntimeData {
    Empty,
    /// Sequence / Selector: index of the child currently being ticked.
    Cursor { index: usize },
    /// Priority: winning case, and the variable generation it was chosen
    /// under. `last_generation == None` forces evaluation.
    Priority {
        active: Option<usize>,
        last_generation: Option<u64>,
    },
    /// Parallel: still-running bitmask plus finished tallies.
    Parallel {
        running: u64,
        successes: u32,
        failures: u32,
    },
    /// Loop / LoopUntilSuccess: finished iterations (successes for Loop,
    /// failed attempts for LoopUntilSuccess) and whether the child was
    /// Running when the previous tick ended.
    Loop {
        completed: u32,
        child_was_running: bool,
    },
    /// Gate: predicate result, fixed at initialize for the whole
    /// activation.
    Gate { open: bool },
    /// StateMachine: active state and the transition recorded during
    /// event dispatch, applied at the start of the next tick.
    Machine {
        current: usize,
        pending: Option<usize>,
    },
    Leaf(LeafState),
}

pub struct Slot {
    /// Set between initialize and terminate; `data` is meaningless while
    /// this is false.
    pub active: bool,
    pub data: RuntimeData,
}

impl Slot {
    pub fn idle() -> Self {
        Self {
            active: false,
            data: RuntimeData::Empty,
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.data = RuntimeData::Empty;
    }
}
