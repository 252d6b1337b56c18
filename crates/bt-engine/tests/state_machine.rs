mod common;

use bt_core::{Event, Status};
use common::*;

const PATROL_ATTACK: &str = "
name: t
events: [go, back]
root:
  type: state_machine
  children:
    - type: state
      name: patrol
      transitions:
        - {on: go, to: attack}
      children: [{type: probe, name: a, script: running}]
    - type: state
      name: attack
      transitions:
        - {on: back, to: patrol}
      children: [{type: probe, name: b, script: running}]
";

#[test]
fn transition_is_applied_at_the_start_of_the_next_tick() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(PATROL_ATTACK, &registry);

    assert_eq!(inst.tick(&clock(0)), Status::Running);
    inst.handle_event(&clock(0), &Event::new("go"));
    // Nothing switches during dispatch itself.
    assert_eq!(count(&log, "a:term"), 0);

    assert_eq!(inst.tick(&clock(1)), Status::Running);
    let tail: Vec<String> = entries(&log)
        .iter()
        .filter(|e| e.ends_with(":term") || e.ends_with(":init"))
        .cloned()
        .collect();
    assert_eq!(tail, vec!["a:init", "a:term", "b:init"]);
}

#[test]
fn event_is_forwarded_down_the_active_state() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(PATROL_ATTACK, &registry);

    inst.tick(&clock(0));
    inst.handle_event(&clock(0), &Event::new("go"));
    assert_eq!(count(&log, "a:event:go"), 1);
    assert_eq!(count(&log, "b:event:go"), 0);
}

#[test]
fn event_without_a_matching_transition_is_ignored() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(PATROL_ATTACK, &registry);

    inst.tick(&clock(0));
    // `back` only exists on the attack state.
    inst.handle_event(&clock(0), &Event::new("back"));
    inst.tick(&clock(1));
    assert_eq!(count(&log, "a:term"), 0);
    assert_eq!(count(&log, "b:init"), 0);
}

#[test]
fn self_transition_restarts_the_state() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
events: [reset]
root:
  type: state_machine
  children:
    - type: state
      name: only
      transitions:
        - {on: reset, to: only}
      children: [{type: probe, name: a, script: running}]
",
        &registry,
    );

    inst.tick(&clock(0));
    inst.handle_event(&clock(0), &Event::new("reset"));
    inst.tick(&clock(1));
    assert_eq!(count(&log, "a:term"), 1);
    assert_eq!(count(&log, "a:init"), 2);
}

#[test]
fn chained_events_within_one_frame_resolve_against_the_pending_state() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(PATROL_ATTACK, &registry);

    inst.tick(&clock(0));
    // `go` queues attack; `back` must match against attack's transitions
    // even though patrol is still the live state.
    inst.handle_event(&clock(0), &Event::new("go"));
    inst.handle_event(&clock(0), &Event::new("back"));
    inst.tick(&clock(1));

    // Net effect is a self-transition back to patrol.
    assert_eq!(count(&log, "a:term"), 1);
    assert_eq!(count(&log, "a:init"), 2);
    assert_eq!(count(&log, "b:init"), 0);
}

#[test]
fn machine_mirrors_its_active_state_status() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: state_machine
  children:
    - type: state
      name: once
      children: [{type: probe, name: a, script: 'running,success'}]
",
        &registry,
    );

    assert_eq!(inst.tick(&clock(0)), Status::Running);
    assert_eq!(inst.tick(&clock(1)), Status::Success);
}
