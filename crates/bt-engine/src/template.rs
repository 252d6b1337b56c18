//! Template building: parse a [`TreeConfig`] into the immutable node
//! arena, validating every structural invariant on the way. A template
//! that loads is safe to tick; anything questionable fails the whole load.

use std::rc::Rc;

use tracing::debug;

use bt_core::{NodeId, PredicateCompiler, VariableDecl, Variables};

use crate::config::{NodeConfig, TreeConfig};
use crate::error::LoadError;
use crate::node::{
    GateKind, Node, NodeKind, PriorityCase, Quorum, StateDef, Transition, MAX_PARALLEL_CHILDREN,
};
use crate::registry::{LoadContext, NodeRegistry};

/// The shared, immutable, parsed representation of one authored tree.
///
/// Built once, cached by name, and referenced by every instance running
/// it; instances index its arena by [`NodeId`] and never mutate it.
pub struct Template {
    name: String,
    nodes: Vec<Node>,
    root: NodeId,
    events: Vec<String>,
    variables: Vec<VariableDecl>,
    config: TreeConfig,
}

impl Template {
    /// Parse and validate `config`. Any error aborts the whole load;
    /// no partially-built template is ever returned.
    pub fn load(
        config: TreeConfig,
        registry: &NodeRegistry,
        compiler: &dyn PredicateCompiler,
    ) -> Result<Rc<Template>, LoadError> {
        let mut builder = Builder {
            nodes: Vec::new(),
            ctx: LoadContext::new(
                registry,
                compiler,
                &config.name,
                &config.events,
                &config.variables,
            ),
        };
        let root = builder.build_node(&config.root)?;
        let nodes = builder.nodes;
        debug!(tree = %config.name, nodes = nodes.len(), "template built");

        Ok(Rc::new(Template {
            name: config.name.clone(),
            nodes,
            root,
            events: config.events.clone(),
            variables: config.variables.clone(),
            config,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn variables(&self) -> &[VariableDecl] {
        &self.variables
    }

    /// The config this template was built from; re-serializing and
    /// reloading it produces a structurally identical template.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Fresh variable collection seeded with the declared defaults.
    pub fn new_variables(&self) -> Variables {
        Variables::from_decls(&self.variables)
    }

    /// One line per node: id, kind, static configuration, child ids.
    pub fn fingerprint(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|n| format!("{} {}", n.id.0, n.kind.summary()))
            .collect()
    }
}

struct Builder<'a> {
    nodes: Vec<Node>,
    ctx: LoadContext<'a>,
}

impl Builder<'_> {
    /// Children are built before their parent, so ids are assigned in
    /// post-order; the root always has the highest id.
    fn build_node(&mut self, config: &NodeConfig) -> Result<NodeId, LoadError> {
        self.ctx.enter(config.path_segment());
        let kind = self.build_kind(config)?;
        self.ctx.leave();

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { id, kind });
        Ok(id)
    }

    fn build_kind(&mut self, config: &NodeConfig) -> Result<NodeKind, LoadError> {
        let path = self.ctx.path();
        match config.kind.as_str() {
            "sequence" => Ok(NodeKind::Sequence {
                children: self.build_children(config, &path)?,
            }),
            "selector" => Ok(NodeKind::Selector {
                children: self.build_children(config, &path)?,
            }),
            "priority" => self.build_priority(config, &path),
            "parallel" => self.build_parallel(config, &path),
            "loop" => {
                let count = config.opt_u32_attr("count", &path)?.unwrap_or(0);
                Ok(NodeKind::Loop {
                    child: self.build_only_child(config, &path)?,
                    count,
                })
            }
            "loop_until_success" => {
                let max_attempts = config.opt_u32_attr("max_attempts", &path)?.unwrap_or(0);
                Ok(NodeKind::LoopUntilSuccess {
                    child: self.build_only_child(config, &path)?,
                    max_attempts,
                })
            }
            "gate" => self.build_gate(config, &path),
            "suppress_failure" => Ok(NodeKind::SuppressFailure {
                child: self.build_only_child(config, &path)?,
            }),
            "tag" => {
                let label = config
                    .name
                    .clone()
                    .ok_or(LoadError::MissingAttribute {
                        path: path.clone(),
                        attribute: "name",
                    })?;
                Ok(NodeKind::Tag {
                    child: self.build_only_child(config, &path)?,
                    label,
                })
            }
            "state_machine" => self.build_state_machine(config, &path),
            kind => self.build_leaf(config, &path, kind),
        }
    }

    fn build_children(
        &mut self,
        config: &NodeConfig,
        path: &str,
    ) -> Result<Vec<NodeId>, LoadError> {
        if config.children.is_empty() {
            return Err(LoadError::MissingChildren {
                path: path.to_string(),
            });
        }
        config
            .children
            .iter()
            .map(|child| self.build_node(child))
            .collect()
    }

    fn build_only_child(&mut self, config: &NodeConfig, path: &str) -> Result<NodeId, LoadError> {
        match config.children.as_slice() {
            [child] => self.build_node(child),
            children => Err(LoadError::SingleChildExpected {
                path: path.to_string(),
                count: children.len(),
            }),
        }
    }

    fn build_priority(&mut self, config: &NodeConfig, path: &str) -> Result<NodeKind, LoadError> {
        if config.children.is_empty() {
            return Err(LoadError::MissingChildren {
                path: path.to_string(),
            });
        }

        let mut cases = Vec::with_capacity(config.children.len());
        for case in &config.children {
            self.ctx.enter(case.path_segment());
            let case_path = self.ctx.path();
            if case.kind != "case" {
                self.ctx.leave();
                return Err(LoadError::InvalidAttribute {
                    path: case_path,
                    attribute: "type",
                    reason: format!("priority children must be `case` nodes, got `{}`", case.kind),
                });
            }

            let result = (|| {
                let condition_text = case.opt_str_attr("when", &case_path)?.map(str::to_string);
                let condition = match &condition_text {
                    Some(expr) => Some(self.ctx.compile_condition(expr)?),
                    None => None,
                };
                let child = match case.children.as_slice() {
                    [child] => self.build_node(child)?,
                    children => {
                        return Err(LoadError::SingleChildExpected {
                            path: case_path.clone(),
                            count: children.len(),
                        })
                    }
                };
                Ok(PriorityCase {
                    condition,
                    condition_text,
                    child,
                })
            })();
            self.ctx.leave();
            cases.push(result?);
        }

        Ok(NodeKind::Priority { cases })
    }

    fn build_parallel(&mut self, config: &NodeConfig, path: &str) -> Result<NodeKind, LoadError> {
        if config.children.len() > MAX_PARALLEL_CHILDREN {
            return Err(LoadError::TooManyChildren {
                path: path.to_string(),
                count: config.children.len(),
                max: MAX_PARALLEL_CHILDREN,
            });
        }
        let success = parse_quorum(config, "success", path)?.unwrap_or(Quorum::All);
        let failure = parse_quorum(config, "failure", path)?.unwrap_or(Quorum::Any);
        Ok(NodeKind::Parallel {
            children: self.build_children(config, path)?,
            success,
            failure,
        })
    }

    fn build_gate(&mut self, config: &NodeConfig, path: &str) -> Result<NodeKind, LoadError> {
        let condition = config.opt_str_attr("condition", path)?.map(str::to_string);
        let probability = config.opt_f32_attr("probability", path)?;
        let after_seconds = config.opt_f32_attr("after_seconds", path)?;

        let modes = [
            condition.is_some(),
            probability.is_some(),
            after_seconds.is_some(),
        ]
        .iter()
        .filter(|m| **m)
        .count();
        if modes != 1 {
            return Err(LoadError::InvalidAttribute {
                path: path.to_string(),
                attribute: "condition",
                reason: "gate takes exactly one of `condition`, `probability`, `after_seconds`"
                    .to_string(),
            });
        }

        let gate = if let Some(expression) = condition {
            let predicate = self.ctx.compile_condition(&expression)?;
            GateKind::Condition {
                expression,
                predicate,
            }
        } else if let Some(probability) = probability {
            if !(0.0..=1.0).contains(&probability) {
                return Err(LoadError::InvalidAttribute {
                    path: path.to_string(),
                    attribute: "probability",
                    reason: format!("{probability} is outside [0, 1]"),
                });
            }
            GateKind::Random { probability }
        } else {
            let after_seconds = after_seconds.unwrap_or(0.0);
            if after_seconds < 0.0 {
                return Err(LoadError::InvalidAttribute {
                    path: path.to_string(),
                    attribute: "after_seconds",
                    reason: "must be non-negative".to_string(),
                });
            }
            GateKind::Time { after_seconds }
        };

        Ok(NodeKind::Gate {
            child: self.build_only_child(config, path)?,
            gate,
        })
    }

    fn build_state_machine(
        &mut self,
        config: &NodeConfig,
        path: &str,
    ) -> Result<NodeKind, LoadError> {
        if config.children.is_empty() {
            return Err(LoadError::MissingChildren {
                path: path.to_string(),
            });
        }

        // Pass 1: state names, so transitions can resolve forward targets.
        let mut names: Vec<String> = Vec::with_capacity(config.children.len());
        for state in &config.children {
            self.ctx.enter(state.path_segment());
            let state_path = self.ctx.path();
            let result = (|| {
                if state.kind != "state" {
                    return Err(LoadError::InvalidAttribute {
                        path: state_path.clone(),
                        attribute: "type",
                        reason: format!(
                            "state_machine children must be `state` nodes, got `{}`",
                            state.kind
                        ),
                    });
                }
                let name = state.name.clone().ok_or(LoadError::MissingAttribute {
                    path: state_path.clone(),
                    attribute: "name",
                })?;
                if names.contains(&name) {
                    return Err(LoadError::DuplicateState {
                        path: state_path.clone(),
                        state: name,
                    });
                }
                Ok(name)
            })();
            self.ctx.leave();
            names.push(result?);
        }

        // Pass 2: state roots and transition edges.
        let mut states = Vec::with_capacity(config.children.len());
        for (state, name) in config.children.iter().zip(&names) {
            self.ctx.enter(state.path_segment());
            let state_path = self.ctx.path();
            let result = (|| {
                let transitions = self.parse_transitions(state, &state_path, &names)?;
                let root = match state.children.as_slice() {
                    [child] => self.build_node(child)?,
                    children => {
                        return Err(LoadError::SingleChildExpected {
                            path: state_path.clone(),
                            count: children.len(),
                        })
                    }
                };
                Ok(StateDef {
                    name: name.clone(),
                    root,
                    transitions,
                })
            })();
            self.ctx.leave();
            states.push(result?);
        }

        Ok(NodeKind::StateMachine { states })
    }

    fn parse_transitions(
        &self,
        state: &NodeConfig,
        path: &str,
        names: &[String],
    ) -> Result<Vec<Transition>, LoadError> {
        let Some(value) = state.attr("transitions") else {
            return Ok(Vec::new());
        };
        let entries = value
            .as_sequence()
            .ok_or_else(|| LoadError::InvalidAttribute {
                path: path.to_string(),
                attribute: "transitions",
                reason: "expected a list of {on, to} entries".to_string(),
            })?;

        let mut transitions = Vec::with_capacity(entries.len());
        for entry in entries {
            let (on, to) = match (
                entry.get("on").and_then(|v| v.as_str()),
                entry.get("to").and_then(|v| v.as_str()),
            ) {
                (Some(on), Some(to)) => (on, to),
                _ => {
                    return Err(LoadError::InvalidAttribute {
                        path: path.to_string(),
                        attribute: "transitions",
                        reason: "each entry needs string `on` and `to` fields".to_string(),
                    })
                }
            };
            self.ctx.require_event(on)?;
            let target =
                names
                    .iter()
                    .position(|n| n == to)
                    .ok_or_else(|| LoadError::UnknownState {
                        path: path.to_string(),
                        state: to.to_string(),
                    })?;
            transitions.push(Transition {
                event: on.to_string(),
                target,
            });
        }
        Ok(transitions)
    }

    fn build_leaf(
        &mut self,
        config: &NodeConfig,
        path: &str,
        kind: &str,
    ) -> Result<NodeKind, LoadError> {
        let registry = self.ctx.registry;
        let Some(loader) = registry.get(kind) else {
            return Err(LoadError::UnknownNodeType {
                path: path.to_string(),
                kind: kind.to_string(),
            });
        };
        let leaf = loader(config, &mut self.ctx)?;
        Ok(NodeKind::Leaf {
            kind: kind.to_string(),
            attrs: config.attrs.clone(),
            leaf,
        })
    }
}

fn parse_quorum(
    config: &NodeConfig,
    attribute: &'static str,
    path: &str,
) -> Result<Option<Quorum>, LoadError> {
    match config.opt_str_attr(attribute, path)? {
        None => Ok(None),
        Some("any") => Ok(Some(Quorum::Any)),
        Some("all") => Ok(Some(Quorum::All)),
        Some(other) => Err(LoadError::InvalidAttribute {
            path: path.to_string(),
            attribute,
            reason: format!("expected `any` or `all`, got `{other}`"),
        }),
    }
}
