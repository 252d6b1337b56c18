use thiserror::Error;

use crate::{Value, VariableDecl, Variables};

/// Compiled boolean condition over an instance's variable collection.
///
/// Gate and Priority nodes only ever call `evaluate`; the engine never
/// interprets expression text itself.
pub trait Predicate {
    fn evaluate(&self, variables: &Variables) -> bool;
}

/// Compiles textual expressions at template load time.
///
/// Implemented by the embedding's expression evaluator. Compile failures
/// surface as template load errors, so a tree with a broken condition
/// never starts.
pub trait PredicateCompiler {
    fn compile(
        &self,
        expression: &str,
        declared: &[VariableDecl],
    ) -> Result<Box<dyn Predicate>, PredicateError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PredicateError(pub String);

/// Minimal built-in compiler understanding `flag` and `!flag` over
/// declared boolean variables. Real integrations supply their own
/// [`PredicateCompiler`]; this one exists so trees are runnable without
/// an expression evaluator wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlagCompiler;

impl PredicateCompiler for FlagCompiler {
    fn compile(
        &self,
        expression: &str,
        declared: &[VariableDecl],
    ) -> Result<Box<dyn Predicate>, PredicateError> {
        let trimmed = expression.trim();
        let (negate, name) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(PredicateError(format!(
                "expected a variable name, got `{trimmed}`"
            )));
        }
        if !declared.iter().any(|d| d.name == name) {
            return Err(PredicateError(format!("unknown variable `{name}`")));
        }

        Ok(Box::new(FlagPredicate {
            name: name.to_string(),
            negate,
        }))
    }
}

struct FlagPredicate {
    name: String,
    negate: bool,
}

impl Predicate for FlagPredicate {
    fn evaluate(&self, variables: &Variables) -> bool {
        let set = variables
            .get(&self.name)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        set != self.negate
    }
}
