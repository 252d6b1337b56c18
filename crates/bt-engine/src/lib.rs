//! Behavior tree scheduling engine built on `bt-core`.
//!
//! Templates are parsed once from a declarative config, validated, and
//! shared read-only by every instance running them; each instance ticks
//! one frame at a time and reports a tri-state [`bt_core::Status`].

#![forbid(unsafe_code)]

pub mod builtin;
pub mod config;
pub mod error;
pub mod instance;
pub mod node;
pub mod registry;
pub mod runtime;
pub mod template;

pub use config::{NodeConfig, TreeConfig};
pub use error::LoadError;
pub use instance::Instance;
pub use node::{GateKind, Node, NodeKind, Quorum, MAX_PARALLEL_CHILDREN};
pub use registry::{LoadContext, NodeRegistry};
pub use runtime::{RuntimeData, Slot};
pub use template::Template;
