//! Leaf-type registry and the context threaded through template loading.
//!
//! Domain subsystems register their leaf types by name at startup; the
//! loader consults the registry for any node kind the closed set does not
//! claim. Registries are plain values, passed into load calls rather than
//! living in process globals.

use std::collections::BTreeMap;

use bt_core::{Leaf, Predicate, PredicateCompiler, VariableDecl};

use crate::config::NodeConfig;
use crate::error::LoadError;

/// Builds one leaf from its authored config.
pub type LeafLoader = Box<dyn Fn(&NodeConfig, &mut LoadContext<'_>) -> Result<Box<dyn Leaf>, LoadError>>;

/// Name → constructor table for leaf node types.
#[derive(Default)]
pub struct NodeRegistry {
    loaders: BTreeMap<String, LeafLoader>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the utility leaves (`wait`,
    /// `condition`, `succeed`, `fail`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_builtins(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, loader: F)
    where
        F: Fn(&NodeConfig, &mut LoadContext<'_>) -> Result<Box<dyn Leaf>, LoadError> + 'static,
    {
        self.loaders.insert(kind.into(), Box::new(loader));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.loaders.contains_key(kind)
    }

    pub(crate) fn get(&self, kind: &str) -> Option<&LeafLoader> {
        self.loaders.get(kind)
    }
}

/// Load-time context: the registry, the expression compiler, the tree's
/// declarations, and the node path used for error reporting.
pub struct LoadContext<'a> {
    pub registry: &'a NodeRegistry,
    pub compiler: &'a dyn PredicateCompiler,
    declared_events: &'a [String],
    declared_variables: &'a [VariableDecl],
    segments: Vec<String>,
}

impl<'a> LoadContext<'a> {
    pub fn new(
        registry: &'a NodeRegistry,
        compiler: &'a dyn PredicateCompiler,
        tree_name: &str,
        declared_events: &'a [String],
        declared_variables: &'a [VariableDecl],
    ) -> Self {
        Self {
            registry,
            compiler,
            declared_events,
            declared_variables,
            segments: vec![tree_name.to_string()],
        }
    }

    /// Slash-joined path from the tree name to the node being loaded.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    pub(crate) fn enter(&mut self, segment: String) {
        self.segments.push(segment);
    }

    pub(crate) fn leave(&mut self) {
        self.segments.pop();
    }

    pub fn compile_condition(&self, expression: &str) -> Result<Box<dyn Predicate>, LoadError> {
        self.compiler
            .compile(expression, self.declared_variables)
            .map_err(|source| LoadError::BadCondition {
                path: self.path(),
                expression: expression.to_string(),
                source,
            })
    }

    /// Load-time check that an event name was declared by the tree.
    pub fn require_event(&self, event: &str) -> Result<(), LoadError> {
        if self.declared_events.iter().any(|e| e == event) {
            Ok(())
        } else {
            Err(LoadError::UnknownEvent {
                path: self.path(),
                event: event.to_string(),
            })
        }
    }

    /// Load-time check that a variable name was declared by the tree.
    /// Leaf loaders use this for attributes that name a variable.
    pub fn require_variable(&self, variable: &str) -> Result<(), LoadError> {
        if self.declared_variables.iter().any(|d| d.name == variable) {
            Ok(())
        } else {
            Err(LoadError::UnknownVariable {
                path: self.path(),
                variable: variable.to_string(),
            })
        }
    }
}
