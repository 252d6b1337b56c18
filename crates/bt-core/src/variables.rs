use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A typed variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// One variable declared by an authored tree.
///
/// Declarations exist so condition expressions can be checked at load time;
/// a missing `default` leaves the variable unset until a collaborator
/// writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Mutable variable collection bound into one tree instance.
///
/// Every write bumps a generation counter. Nodes that want to react to
/// variable changes (Priority) compare generations instead of re-reading
/// every value each tick.
#[derive(Debug, Default)]
pub struct Variables {
    values: BTreeMap<String, Value>,
    generation: u64,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_decls(decls: &[VariableDecl]) -> Self {
        let mut values = BTreeMap::new();
        for decl in decls {
            if let Some(default) = &decl.default {
                values.insert(decl.name.clone(), default.clone());
            }
        }
        Self {
            values,
            generation: 0,
        }
    }

    /// Monotonic change counter; bumped by every `set`/`remove`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
        self.generation += 1;
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let removed = self.values.remove(name);
        if removed.is_some() {
            self.generation += 1;
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
