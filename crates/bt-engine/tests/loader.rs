mod common;

use bt_core::FlagCompiler;
use bt_engine::{LoadError, NodeConfig, NodeRegistry, Template, TreeConfig, MAX_PARALLEL_CHILDREN};
use common::*;

fn load_err(yaml: &str) -> LoadError {
    let registry = NodeRegistry::with_builtins();
    let config = TreeConfig::from_yaml(yaml).expect("config parses");
    match Template::load(config, &registry, &FlagCompiler) {
        Ok(_) => panic!("load unexpectedly succeeded"),
        Err(error) => error,
    }
}

#[test]
fn unknown_node_type_is_rejected_with_its_path() {
    let error = load_err(
        "
name: t
root:
  type: sequence
  children:
    - {type: succeed}
    - {type: frobnicate}
",
    );
    match &error {
        LoadError::UnknownNodeType { path, kind } => {
            assert_eq!(kind, "frobnicate");
            assert_eq!(path, "t/sequence/frobnicate");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_attribute_is_reported() {
    let error = load_err(
        "
name: t
root:
  type: condition
",
    );
    assert!(matches!(
        error,
        LoadError::MissingAttribute {
            attribute: "expression",
            ..
        }
    ));
}

#[test]
fn composite_without_children_is_rejected() {
    let error = load_err(
        "
name: t
root:
  type: selector
",
    );
    assert!(matches!(error, LoadError::MissingChildren { .. }));
}

#[test]
fn decorator_with_two_children_is_rejected() {
    let error = load_err(
        "
name: t
root:
  type: loop
  children:
    - {type: succeed}
    - {type: succeed}
",
    );
    assert!(matches!(
        error,
        LoadError::SingleChildExpected { count: 2, .. }
    ));
}

#[test]
fn parallel_fanout_is_capped() {
    let mut parallel = NodeConfig::new("parallel");
    for _ in 0..(MAX_PARALLEL_CHILDREN + 1) {
        parallel.children.push(NodeConfig::new("succeed"));
    }
    let config = TreeConfig {
        name: "t".to_string(),
        events: Vec::new(),
        variables: Vec::new(),
        root: parallel,
    };

    let registry = NodeRegistry::with_builtins();
    let error = Template::load(config, &registry, &FlagCompiler)
        .err()
        .expect("oversized parallel must fail");
    assert!(matches!(
        error,
        LoadError::TooManyChildren { count, max, .. }
            if count == MAX_PARALLEL_CHILDREN + 1 && max == MAX_PARALLEL_CHILDREN
    ));
}

#[test]
fn duplicate_state_names_are_rejected() {
    let error = load_err(
        "
name: t
root:
  type: state_machine
  children:
    - {type: state, name: idle, children: [{type: succeed}]}
    - {type: state, name: idle, children: [{type: succeed}]}
",
    );
    assert!(matches!(
        error,
        LoadError::DuplicateState { state, .. } if state == "idle"
    ));
}

#[test]
fn transition_on_undeclared_event_is_rejected() {
    let error = load_err(
        "
name: t
root:
  type: state_machine
  children:
    - type: state
      name: idle
      transitions: [{on: go, to: idle}]
      children: [{type: succeed}]
",
    );
    assert!(matches!(
        error,
        LoadError::UnknownEvent { event, .. } if event == "go"
    ));
}

#[test]
fn transition_to_undeclared_state_is_rejected() {
    let error = load_err(
        "
name: t
events: [go]
root:
  type: state_machine
  children:
    - type: state
      name: idle
      transitions: [{on: go, to: nowhere}]
      children: [{type: succeed}]
",
    );
    assert!(matches!(
        error,
        LoadError::UnknownState { state, .. } if state == "nowhere"
    ));
}

#[test]
fn bad_gate_condition_names_the_expression() {
    let error = load_err(
        "
name: t
root:
  type: gate
  condition: undeclared_flag
  children: [{type: succeed}]
",
    );
    match &error {
        LoadError::BadCondition {
            path, expression, ..
        } => {
            assert_eq!(expression, "undeclared_flag");
            assert!(path.starts_with("t/"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn gate_requires_exactly_one_mode() {
    let error = load_err(
        "
name: t
variables: [{name: ready, default: true}]
root:
  type: gate
  condition: ready
  probability: 0.5
  children: [{type: succeed}]
",
    );
    assert!(matches!(error, LoadError::InvalidAttribute { .. }));
}

#[test]
fn gate_probability_must_be_a_unit_fraction() {
    let error = load_err(
        "
name: t
root:
  type: gate
  probability: 1.5
  children: [{type: succeed}]
",
    );
    assert!(matches!(
        error,
        LoadError::InvalidAttribute {
            attribute: "probability",
            ..
        }
    ));
}

#[test]
fn priority_children_must_be_cases() {
    let error = load_err(
        "
name: t
root:
  type: priority
  children:
    - {type: succeed}
",
    );
    assert!(matches!(
        error,
        LoadError::InvalidAttribute { attribute: "type", .. }
    ));
}

#[test]
fn error_messages_carry_the_full_node_path() {
    let error = load_err(
        "
name: patrol_tree
root:
  type: sequence
  children:
    - type: tag
      name: combat
      children:
        - {type: mystery}
",
    );
    assert_eq!(
        error.to_string(),
        "patrol_tree/sequence/tag(combat)/mystery: unknown node type `mystery`"
    );
}

#[test]
fn post_order_ids_put_the_root_last() {
    let registry = NodeRegistry::with_builtins();
    let template = load(
        "
name: t
root:
  type: sequence
  children:
    - {type: succeed}
    - {type: fail}
",
        &registry,
    );
    assert_eq!(template.len(), 3);
    assert_eq!(template.root().index(), 2);
}
