//! The template-owned node graph.
//!
//! Nodes are immutable after load and shared by every instance of a
//! template, so they hold static configuration only; all mutable execution
//! state lives in the per-instance arena (`runtime` module). Children are
//! referenced by [`NodeId`], never by pointer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bt_core::{Leaf, NodeId, Predicate};

/// Parallel never tracks more children than its still-running bitmask
/// can hold; enforced at load time.
pub const MAX_PARALLEL_CHILDREN: usize = 64;

/// Aggregation policy for one side of a Parallel node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quorum {
    Any,
    All,
}

/// One guarded alternative of a Priority node. A case without a condition
/// is an unconditional default.
pub struct PriorityCase {
    pub condition: Option<Box<dyn Predicate>>,
    /// Source text, kept for diagnostics and fingerprinting.
    pub condition_text: Option<String>,
    pub child: NodeId,
}

/// Event-triggered edge of a state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub event: String,
    /// Index into the machine's state list, resolved at load time.
    pub target: usize,
}

pub struct StateDef {
    pub name: String,
    pub root: NodeId,
    pub transitions: Vec<Transition>,
}

pub enum GateKind {
    /// Compiled predicate, evaluated once at initialize.
    Condition {
        expression: String,
        predicate: Box<dyn Predicate>,
    },
    /// Opens with the given probability, drawn from the node's
    /// deterministic stream.
    Random { probability: f32 },
    /// Opens once the instance has been alive at least this long.
    Time { after_seconds: f32 },
}

/// Closed variant set of the scheduler, plus the open `Leaf` extension
/// point populated through the node registry.
pub enum NodeKind {
    Sequence {
        children: Vec<NodeId>,
    },
    Selector {
        children: Vec<NodeId>,
    },
    Priority {
        cases: Vec<PriorityCase>,
    },
    Parallel {
        children: Vec<NodeId>,
        success: Quorum,
        failure: Quorum,
    },
    /// Repeats a succeeding child; `count == 0` repeats forever.
    Loop {
        child: NodeId,
        count: u32,
    },
    /// Retries a failing child; `max_attempts == 0` retries forever.
    LoopUntilSuccess {
        child: NodeId,
        max_attempts: u32,
    },
    Gate {
        child: NodeId,
        gate: GateKind,
    },
    SuppressFailure {
        child: NodeId,
    },
    /// Transparent named scope; forwards everything.
    Tag {
        child: NodeId,
        label: String,
    },
    StateMachine {
        states: Vec<StateDef>,
    },
    Leaf {
        kind: String,
        attrs: BTreeMap<String, serde_yaml::Value>,
        leaf: Box<dyn Leaf>,
    },
}

pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl NodeKind {
    pub fn kind_name(&self) -> &str {
        match self {
            NodeKind::Sequence { .. } => "sequence",
            NodeKind::Selector { .. } => "selector",
            NodeKind::Priority { .. } => "priority",
            NodeKind::Parallel { .. } => "parallel",
            NodeKind::Loop { .. } => "loop",
            NodeKind::LoopUntilSuccess { .. } => "loop_until_success",
            NodeKind::Gate { .. } => "gate",
            NodeKind::SuppressFailure { .. } => "suppress_failure",
            NodeKind::Tag { .. } => "tag",
            NodeKind::StateMachine { .. } => "state_machine",
            NodeKind::Leaf { kind, .. } => kind,
        }
    }

    /// Stable one-line structural description: kind, static configuration,
    /// child ids. Two templates with identical fingerprints are
    /// structurally identical.
    pub fn summary(&self) -> String {
        fn ids(children: &[NodeId]) -> String {
            let parts: Vec<String> = children.iter().map(|c| c.0.to_string()).collect();
            format!("[{}]", parts.join(","))
        }

        match self {
            NodeKind::Sequence { children } => format!("sequence children={}", ids(children)),
            NodeKind::Selector { children } => format!("selector children={}", ids(children)),
            NodeKind::Priority { cases } => {
                let parts: Vec<String> = cases
                    .iter()
                    .map(|c| {
                        format!(
                            "{}=>{}",
                            c.condition_text.as_deref().unwrap_or("_"),
                            c.child.0
                        )
                    })
                    .collect();
                format!("priority cases=[{}]", parts.join(","))
            }
            NodeKind::Parallel {
                children,
                success,
                failure,
            } => format!(
                "parallel success={:?} failure={:?} children={}",
                success,
                failure,
                ids(children)
            ),
            NodeKind::Loop { child, count } => format!("loop count={} child={}", count, child.0),
            NodeKind::LoopUntilSuccess {
                child,
                max_attempts,
            } => format!(
                "loop_until_success max_attempts={} child={}",
                max_attempts, child.0
            ),
            NodeKind::Gate { child, gate } => {
                let mode = match gate {
                    GateKind::Condition { expression, .. } => {
                        format!("condition={expression:?}")
                    }
                    GateKind::Random { probability } => format!("probability={probability}"),
                    GateKind::Time { after_seconds } => format!("after_seconds={after_seconds}"),
                };
                format!("gate {mode} child={}", child.0)
            }
            NodeKind::SuppressFailure { child } => {
                format!("suppress_failure child={}", child.0)
            }
            NodeKind::Tag { child, label } => format!("tag label={:?} child={}", label, child.0),
            NodeKind::StateMachine { states } => {
                let parts: Vec<String> = states
                    .iter()
                    .map(|s| {
                        let edges: Vec<String> = s
                            .transitions
                            .iter()
                            .map(|t| format!("{}->{}", t.event, t.target))
                            .collect();
                        format!("{}:{}[{}]", s.name, s.root.0, edges.join(","))
                    })
                    .collect();
                format!("state_machine states=[{}]", parts.join(" "))
            }
            NodeKind::Leaf { kind, attrs, .. } => {
                let parts: Vec<String> = attrs
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, yaml_scalar(v)))
                    .collect();
                format!("leaf kind={} attrs={{{}}}", kind, parts.join(","))
            }
        }
    }
}

fn yaml_scalar(value: &serde_yaml::Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| "<unprintable>".to_string())
}
