use bt_core::PredicateError;
use thiserror::Error;

/// Template load failures.
///
/// All of these are detected while building a template from its config;
/// a failing tree is reported with the node path from the root and is
/// never partially installed or ticked.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse tree config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{path}: unknown node type `{kind}`")]
    UnknownNodeType { path: String, kind: String },

    #[error("{path}: missing required attribute `{attribute}`")]
    MissingAttribute {
        path: String,
        attribute: &'static str,
    },

    #[error("{path}: attribute `{attribute}` is invalid: {reason}")]
    InvalidAttribute {
        path: String,
        attribute: &'static str,
        reason: String,
    },

    #[error("{path}: node requires at least one child")]
    MissingChildren { path: String },

    #[error("{path}: {count} children exceeds the supported maximum of {max}")]
    TooManyChildren {
        path: String,
        count: usize,
        max: usize,
    },

    #[error("{path}: expected exactly one child, found {count}")]
    SingleChildExpected { path: String, count: usize },

    #[error("{path}: unknown event `{event}`")]
    UnknownEvent { path: String, event: String },

    #[error("{path}: transition targets undeclared state `{state}`")]
    UnknownState { path: String, state: String },

    #[error("{path}: duplicate state name `{state}`")]
    DuplicateState { path: String, state: String },

    #[error("{path}: unknown variable `{variable}`")]
    UnknownVariable { path: String, variable: String },

    #[error("{path}: condition `{expression}` failed to compile: {source}")]
    BadCondition {
        path: String,
        expression: String,
        #[source]
        source: PredicateError,
    },
}
