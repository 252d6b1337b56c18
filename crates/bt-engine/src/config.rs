//! The authored configuration tree: tag = node type, attributes = static
//! per-node configuration, ordered children = sub-nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bt_core::VariableDecl;

use crate::error::LoadError;

/// One authored node.
///
/// `kind` selects the node type (built-in or registry leaf); anything the
/// schema does not name lands in `attrs` and is interpreted by that node
/// type's loader. Typed accessors report missing/invalid attributes with
/// the node path so authored content can be fixed from the error alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(rename = "type")]
    pub kind: String,

    /// Optional author-facing label; required for `state` and `tag` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeConfig>,

    #[serde(flatten)]
    pub attrs: BTreeMap<String, serde_yaml::Value>,
}

impl NodeConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            children: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.attrs.get(name)
    }

    pub fn str_attr(&self, name: &'static str, path: &str) -> Result<&str, LoadError> {
        match self.opt_str_attr(name, path)? {
            Some(value) => Ok(value),
            None => Err(LoadError::MissingAttribute {
                path: path.to_string(),
                attribute: name,
            }),
        }
    }

    pub fn opt_str_attr(&self, name: &'static str, path: &str) -> Result<Option<&str>, LoadError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(value) => value.as_str().map(Some).ok_or_else(|| {
                LoadError::InvalidAttribute {
                    path: path.to_string(),
                    attribute: name,
                    reason: "expected a string".to_string(),
                }
            }),
        }
    }

    pub fn opt_f32_attr(&self, name: &'static str, path: &str) -> Result<Option<f32>, LoadError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(value) => value.as_f64().map(|f| Some(f as f32)).ok_or_else(|| {
                LoadError::InvalidAttribute {
                    path: path.to_string(),
                    attribute: name,
                    reason: "expected a number".to_string(),
                }
            }),
        }
    }

    pub fn opt_u32_attr(&self, name: &'static str, path: &str) -> Result<Option<u32>, LoadError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .filter(|v| *v <= u32::MAX as u64)
                .map(|v| Some(v as u32))
                .ok_or_else(|| LoadError::InvalidAttribute {
                    path: path.to_string(),
                    attribute: name,
                    reason: "expected a non-negative integer".to_string(),
                }),
        }
    }

    pub fn opt_bool_attr(&self, name: &'static str, path: &str) -> Result<Option<bool>, LoadError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(value) => value.as_bool().map(Some).ok_or_else(|| {
                LoadError::InvalidAttribute {
                    path: path.to_string(),
                    attribute: name,
                    reason: "expected a boolean".to_string(),
                }
            }),
        }
    }

    /// Path segment contributed by this node: the kind, plus the label
    /// when one is set, e.g. `state(combat)`.
    pub fn path_segment(&self) -> String {
        match &self.name {
            Some(name) => format!("{}({})", self.kind, name),
            None => self.kind.clone(),
        }
    }
}

/// One authored tree: declarations plus the root node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub name: String,

    /// Events this tree may receive; state-machine transitions must
    /// reference one of these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDecl>,

    pub root: NodeConfig,
}

impl TreeConfig {
    pub fn from_yaml(source: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn to_yaml(&self) -> Result<String, LoadError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
