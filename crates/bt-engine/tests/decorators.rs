mod common;

use bt_core::Status;
use common::*;

#[test]
fn loop_over_instant_child_advances_one_iteration_per_frame() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: loop
  count: 3
  children: [{type: probe, name: c}]
",
        &registry,
    );

    // An instantly-succeeding child is restarted next frame, not within
    // the same one, so count=3 takes exactly three ticks.
    assert_eq!(inst.tick(&clock(0)), Status::Running);
    assert_eq!(inst.tick(&clock(1)), Status::Running);
    assert_eq!(inst.tick(&clock(2)), Status::Success);
    assert_eq!(count(&log, "c:init"), 3);
    assert_eq!(count(&log, "c:success"), 3);
}

#[test]
fn loop_restarts_previously_running_child_within_the_same_frame() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: loop
  count: 2
  children: [{type: probe, name: c, script: 'running,success'}]
",
        &registry,
    );

    assert_eq!(inst.tick(&clock(0)), Status::Running);
    log.borrow_mut().clear();

    // The child finishes a multi-frame run this tick, so its next
    // iteration starts immediately.
    assert_eq!(inst.tick(&clock(1)), Status::Running);
    assert_eq!(
        entries(&log),
        vec!["c:success", "c:term", "c:init", "c:running"]
    );

    assert_eq!(inst.tick(&clock(2)), Status::Success);
}

#[test]
fn loop_propagates_child_failure_immediately() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: loop
  count: 5
  children: [{type: probe, name: c, script: failure}]
",
        &registry,
    );

    assert_eq!(inst.tick(&clock(0)), Status::Failure);
    assert_eq!(count(&log, "c:init"), 1);
}

#[test]
fn loop_count_zero_repeats_forever() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: loop
  children: [{type: probe, name: c}]
",
        &registry,
    );

    for tick in 0..10 {
        assert_eq!(inst.tick(&clock(tick)), Status::Running);
    }
    assert_eq!(count(&log, "c:success"), 10);
}

#[test]
fn retry_gives_up_after_max_attempts() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: loop_until_success
  max_attempts: 3
  children: [{type: probe, name: c, script: 'failure'}]
",
        &registry,
    );

    assert_eq!(inst.tick(&clock(0)), Status::Running);
    assert_eq!(inst.tick(&clock(1)), Status::Running);
    assert_eq!(inst.tick(&clock(2)), Status::Failure);
    assert_eq!(count(&log, "c:failure"), 3);
}

#[test]
fn retry_restarts_previously_running_child_within_the_same_frame() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: loop_until_success
  children: [{type: probe, name: c, script: 'running,failure'}]
",
        &registry,
    );

    assert_eq!(inst.tick(&clock(0)), Status::Running);
    log.borrow_mut().clear();

    // A failure that ends a multi-frame run triggers the next attempt
    // immediately, same as Loop does for Success.
    assert_eq!(inst.tick(&clock(1)), Status::Running);
    assert_eq!(
        entries(&log),
        vec!["c:failure", "c:term", "c:init", "c:running"]
    );
}

#[test]
fn retry_stops_retrying_once_the_child_succeeds() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: loop_until_success
  children: [{type: probe, name: c, script: 'success'}]
",
        &registry,
    );

    assert_eq!(inst.tick(&clock(0)), Status::Success);
    assert_eq!(count(&log, "c:init"), 1);
}

#[test]
fn closed_condition_gate_never_initializes_the_child() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
variables:
  - {name: ready, default: false}
root:
  type: gate
  condition: ready
  children: [{type: probe, name: c, script: running}]
",
        &registry,
    );

    for tick in 0..3 {
        assert_eq!(inst.tick(&clock(tick)), Status::Failure);
    }
    assert!(entries(&log).is_empty());
}

#[test]
fn open_condition_gate_forwards_to_the_child() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
variables:
  - {name: ready, default: true}
root:
  type: gate
  condition: ready
  children: [{type: probe, name: c, script: running}]
",
        &registry,
    );

    assert_eq!(inst.tick(&clock(0)), Status::Running);
    assert_eq!(count(&log, "c:init"), 1);
}

#[test]
fn random_gate_is_deterministic_at_the_extremes() {
    let log = new_log();
    let registry = registry_with_probe(&log);

    let mut always = instance(
        "
name: t
root:
  type: gate
  probability: 1.0
  children: [{type: probe, name: c}]
",
        &registry,
    );
    assert_eq!(always.tick(&clock(0)), Status::Success);

    let mut never = instance(
        "
name: t
root:
  type: gate
  probability: 0.0
  children: [{type: probe, name: d}]
",
        &registry,
    );
    assert_eq!(never.tick(&clock(0)), Status::Failure);
    assert_eq!(count(&log, "d:init"), 0);
}

#[test]
fn time_gate_opens_once_the_instance_is_old_enough() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: gate
  after_seconds: 0.25
  children: [{type: probe, name: c}]
",
        &registry,
    );

    // dt is 0.1s per tick; the gate opens on the third activation.
    assert_eq!(inst.tick(&clock(0)), Status::Failure);
    assert_eq!(inst.tick(&clock(1)), Status::Failure);
    assert_eq!(inst.tick(&clock(2)), Status::Success);
    assert_eq!(count(&log, "c:init"), 1);
}

#[test]
fn suppress_failure_converts_failure_and_passes_running_through() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut failing = instance(
        "
name: t
root:
  type: suppress_failure
  children: [{type: probe, name: c, script: failure}]
",
        &registry,
    );
    assert_eq!(failing.tick(&clock(0)), Status::Success);

    let mut running = instance(
        "
name: t
root:
  type: suppress_failure
  children: [{type: probe, name: d, script: running}]
",
        &registry,
    );
    assert_eq!(running.tick(&clock(0)), Status::Running);
}

#[test]
fn tag_is_transparent() {
    let log = new_log();
    let registry = registry_with_probe(&log);
    let mut inst = instance(
        "
name: t
root:
  type: tag
  name: combat
  children: [{type: probe, name: c, script: 'running,success'}]
",
        &registry,
    );

    assert_eq!(inst.tick(&clock(0)), Status::Running);
    assert_eq!(inst.tick(&clock(1)), Status::Success);
    assert_eq!(
        entries(&log),
        vec!["c:init", "c:running", "c:success", "c:term"]
    );
}
