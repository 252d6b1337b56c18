//! Engine-agnostic vocabulary for the hierarchical behavior scheduler.
//!
//! This crate defines the contract shared by the scheduling engine, the
//! process-wide manager, and domain leaf tasks: the tri-state [`Status`],
//! the per-frame [`TickContext`] / per-node [`UpdateContext`], the mutable
//! [`Variables`] binding, named [`Event`]s, and the [`Leaf`] extension
//! point. It deliberately knows nothing about how trees are authored or
//! scheduled.

#![forbid(unsafe_code)]

pub mod agent;
pub mod event;
pub mod leaf;
pub mod predicate;
pub mod rng;
pub mod status;
pub mod tick;
pub mod variables;

pub use agent::AgentHandle;
pub use event::Event;
pub use leaf::{Leaf, LeafState};
pub use predicate::{FlagCompiler, Predicate, PredicateCompiler, PredicateError};
pub use rng::SplitMix64;
pub use status::Status;
pub use tick::{NodeId, TickContext, UpdateContext};
pub use variables::{Value, VariableDecl, Variables};
