//! One agent's live execution of a template.
//!
//! The instance owns the per-node runtime arena and the variable binding;
//! the template stays shared and read-only. All scheduling semantics live
//! in the [`Walker`]: a single `tick_node` path enforces the lifecycle
//! contract (initialize before update, terminate on any non-Running
//! result), `terminate_node` is the one idempotent cleanup point, and
//! `deliver_event` walks only the currently active nodes.

use std::rc::Rc;

use bt_core::{AgentHandle, Event, NodeId, Status, TickContext, UpdateContext};

use crate::node::{GateKind, NodeKind, Quorum};
use crate::runtime::{RuntimeData, Slot};
use crate::template::Template;

pub struct Instance {
    template: Rc<Template>,
    slots: Vec<Slot>,
    variables: bt_core::Variables,
    agent: AgentHandle,
    id: u64,
    elapsed_seconds: f64,
    last_status: Status,
    active_path: Vec<NodeId>,
}

impl Instance {
    pub fn new(template: Rc<Template>, agent: AgentHandle, instance_id: u64) -> Self {
        let slots = (0..template.len()).map(|_| Slot::idle()).collect();
        let variables = template.new_variables();
        Self {
            template,
            slots,
            variables,
            agent,
            id: instance_id,
            elapsed_seconds: 0.0,
            last_status: Status::Invalid,
            active_path: Vec::new(),
        }
    }

    pub fn template(&self) -> &Rc<Template> {
        &self.template
    }

    pub fn agent(&self) -> AgentHandle {
        self.agent
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn last_status(&self) -> Status {
        self.last_status
    }

    /// Root-to-leaf chain of currently active nodes, refreshed after each
    /// tick. A Parallel contributes its first still-running child.
    pub fn active_path(&self) -> &[NodeId] {
        &self.active_path
    }

    /// Whether `id` is between initialize and terminate right now.
    pub fn node_active(&self, id: NodeId) -> bool {
        self.slots[id.index()].active
    }

    pub fn variables(&self) -> &bt_core::Variables {
        &self.variables
    }

    /// Collaborators mutate the binding only between ticks, never during
    /// an update pass.
    pub fn variables_mut(&mut self) -> &mut bt_core::Variables {
        &mut self.variables
    }

    /// Advance one frame. A root that finishes restarts from scratch on
    /// the next tick.
    pub fn tick(&mut self, clock: &TickContext) -> Status {
        self.elapsed_seconds += clock.dt_seconds as f64;
        let template = Rc::clone(&self.template);
        let mut ctx = UpdateContext {
            clock: *clock,
            agent: self.agent,
            instance_id: self.id,
            elapsed_seconds: self.elapsed_seconds,
            variables: &mut self.variables,
        };
        let mut walker = Walker {
            template: &template,
            slots: &mut self.slots,
            ctx: &mut ctx,
        };
        let status = walker.tick_node(template.root());
        self.last_status = status;
        self.rebuild_active_path();
        status
    }

    /// Synchronous, same-tick dispatch down the active path. A state
    /// machine on the path records its transition as pending; the switch
    /// itself happens at the start of the next tick.
    pub fn handle_event(&mut self, clock: &TickContext, event: &Event) {
        let template = Rc::clone(&self.template);
        let mut ctx = UpdateContext {
            clock: *clock,
            agent: self.agent,
            instance_id: self.id,
            elapsed_seconds: self.elapsed_seconds,
            variables: &mut self.variables,
        };
        let mut walker = Walker {
            template: &template,
            slots: &mut self.slots,
            ctx: &mut ctx,
        };
        walker.deliver_event(template.root(), event);
    }

    /// Terminate everything still active. Idempotent; also the
    /// cancellation point for any outstanding leaf requests.
    pub fn stop(&mut self, clock: &TickContext) {
        let template = Rc::clone(&self.template);
        let mut ctx = UpdateContext {
            clock: *clock,
            agent: self.agent,
            instance_id: self.id,
            elapsed_seconds: self.elapsed_seconds,
            variables: &mut self.variables,
        };
        let mut walker = Walker {
            template: &template,
            slots: &mut self.slots,
            ctx: &mut ctx,
        };
        walker.terminate_node(template.root());
        self.last_status = Status::Invalid;
        self.active_path.clear();
    }

    fn rebuild_active_path(&mut self) {
        self.active_path.clear();
        let mut current = Some(self.template.root());
        while let Some(id) = current {
            if !self.slots[id.index()].active {
                break;
            }
            self.active_path.push(id);
            current = self.active_child(id);
        }
    }

    fn active_child(&self, id: NodeId) -> Option<NodeId> {
        let slot = &self.slots[id.index()];
        match &self.template.node(id).kind {
            NodeKind::Sequence { children } | NodeKind::Selector { children } => {
                match &slot.data {
                    RuntimeData::Cursor { index } => children.get(*index).copied(),
                    _ => None,
                }
            }
            NodeKind::Priority { cases } => match &slot.data {
                RuntimeData::Priority {
                    active: Some(case), ..
                } => cases.get(*case).map(|c| c.child),
                _ => None,
            },
            NodeKind::Parallel { children, .. } => match &slot.data {
                RuntimeData::Parallel { running, .. } => children
                    .iter()
                    .enumerate()
                    .find(|(i, _)| running & (1u64 << i) != 0)
                    .map(|(_, child)| *child),
                _ => None,
            },
            NodeKind::Loop { child, .. }
            | NodeKind::LoopUntilSuccess { child, .. }
            | NodeKind::SuppressFailure { child }
            | NodeKind::Tag { child, .. } => Some(*child),
            NodeKind::Gate { child, .. } => match &slot.data {
                RuntimeData::Gate { open: true } => Some(*child),
                _ => None,
            },
            NodeKind::StateMachine { states } => match &slot.data {
                RuntimeData::Machine { current, .. } => states.get(*current).map(|s| s.root),
                _ => None,
            },
            NodeKind::Leaf { .. } => None,
        }
    }
}

/// One traversal of an instance: borrows the template read-only and the
/// runtime arena exclusively for the duration of a tick, terminate, or
/// event dispatch.
struct Walker<'w, 'v> {
    template: &'w Template,
    slots: &'w mut Vec<Slot>,
    ctx: &'w mut UpdateContext<'v>,
}

impl Walker<'_, '_> {
    /// The single per-frame entry point for any node: initialize on first
    /// contact, update, and terminate in the same call whenever the
    /// result is not Running.
    fn tick_node(&mut self, id: NodeId) -> Status {
        if !self.slots[id.index()].active {
            self.initialize(id);
        }
        let status = match self.update(id) {
            Status::Invalid => {
                debug_assert!(false, "node {} returned Invalid from update", id.0);
                Status::Failure
            }
            status => status,
        };
        if status != Status::Running {
            self.terminate_node(id);
        }
        status
    }

    fn initialize(&mut self, id: NodeId) {
        let template = self.template;
        let data = match &template.node(id).kind {
            NodeKind::Sequence { .. } | NodeKind::Selector { .. } => {
                RuntimeData::Cursor { index: 0 }
            }
            NodeKind::Priority { .. } => RuntimeData::Priority {
                active: None,
                last_generation: None,
            },
            NodeKind::Parallel { children, .. } => RuntimeData::Parallel {
                running: full_mask(children.len()),
                successes: 0,
                failures: 0,
            },
            NodeKind::Loop { .. } | NodeKind::LoopUntilSuccess { .. } => RuntimeData::Loop {
                completed: 0,
                child_was_running: false,
            },
            NodeKind::Gate { gate, .. } => RuntimeData::Gate {
                open: self.evaluate_gate(id, gate),
            },
            NodeKind::SuppressFailure { .. } | NodeKind::Tag { .. } => RuntimeData::Empty,
            NodeKind::StateMachine { .. } => RuntimeData::Machine {
                current: 0,
                pending: None,
            },
            NodeKind::Leaf { leaf, .. } => RuntimeData::Leaf(leaf.on_initialize(self.ctx)),
        };
        let slot = &mut self.slots[id.index()];
        slot.active = true;
        slot.data = data;
    }

    fn evaluate_gate(&mut self, id: NodeId, gate: &GateKind) -> bool {
        match gate {
            GateKind::Condition { predicate, .. } => predicate.evaluate(self.ctx.variables),
            GateKind::Random { probability } => self.ctx.rng_for_node(id).chance(*probability),
            GateKind::Time { after_seconds } => {
                self.ctx.elapsed_seconds >= *after_seconds as f64
            }
        }
    }

    fn update(&mut self, id: NodeId) -> Status {
        let template = self.template;
        match &template.node(id).kind {
            NodeKind::Sequence { children } => self.update_sequence(id, children),
            NodeKind::Selector { children } => self.update_selector(id, children),
            NodeKind::Priority { cases } => self.update_priority(id, cases),
            NodeKind::Parallel {
                children,
                success,
                failure,
            } => self.update_parallel(id, children, *success, *failure),
            NodeKind::Loop { child, count } => self.update_loop(id, *child, *count),
            NodeKind::LoopUntilSuccess {
                child,
                max_attempts,
            } => self.update_retry(id, *child, *max_attempts),
            NodeKind::Gate { child, .. } => {
                let open = matches!(
                    &self.slots[id.index()].data,
                    RuntimeData::Gate { open: true }
                );
                if open {
                    self.tick_node(*child)
                } else {
                    Status::Failure
                }
            }
            NodeKind::SuppressFailure { child } => match self.tick_node(*child) {
                Status::Failure => Status::Success,
                status => status,
            },
            NodeKind::Tag { child, .. } => self.tick_node(*child),
            NodeKind::StateMachine { states } => {
                let (mut current, pending) = match &self.slots[id.index()].data {
                    RuntimeData::Machine { current, pending } => (*current, *pending),
                    _ => {
                        debug_assert!(false, "state machine slot holds wrong runtime data");
                        return Status::Failure;
                    }
                };
                if let Some(next) = pending {
                    if next < states.len() {
                        // Old state out, even on a self-transition.
                        self.terminate_node(states[current].root);
                        current = next;
                    } else {
                        debug_assert!(false, "pending transition to out-of-range state {next}");
                    }
                    if let RuntimeData::Machine { current: c, pending: p } =
                        &mut self.slots[id.index()].data
                    {
                        *c = current;
                        *p = None;
                    }
                }
                // The machine mirrors its active state's status.
                self.tick_node(states[current].root)
            }
            NodeKind::Leaf { leaf, .. } => {
                let slot = &mut self.slots[id.index()];
                let RuntimeData::Leaf(state) = &mut slot.data else {
                    debug_assert!(false, "leaf slot holds wrong runtime data");
                    return Status::Failure;
                };
                leaf.on_update(self.ctx, state)
            }
        }
    }

    fn cursor(&self, id: NodeId) -> Option<usize> {
        match &self.slots[id.index()].data {
            RuntimeData::Cursor { index } => Some(*index),
            _ => {
                debug_assert!(false, "composite slot holds wrong runtime data");
                None
            }
        }
    }

    fn advance_cursor(&mut self, id: NodeId) {
        if let RuntimeData::Cursor { index } = &mut self.slots[id.index()].data {
            *index += 1;
        }
    }

    /// Left to right; instantaneous successes advance within the same
    /// call, Running and Failure short-circuit.
    fn update_sequence(&mut self, id: NodeId, children: &[NodeId]) -> Status {
        loop {
            let Some(index) = self.cursor(id) else {
                return Status::Failure;
            };
            let Some(&child) = children.get(index) else {
                return Status::Success;
            };
            match self.tick_node(child) {
                Status::Success => self.advance_cursor(id),
                status => return status,
            }
        }
    }

    /// Mirror of Sequence with inverted polarity.
    fn update_selector(&mut self, id: NodeId, children: &[NodeId]) -> Status {
        loop {
            let Some(index) = self.cursor(id) else {
                return Status::Failure;
            };
            let Some(&child) = children.get(index) else {
                return Status::Failure;
            };
            match self.tick_node(child) {
                Status::Failure => self.advance_cursor(id),
                status => return status,
            }
        }
    }

    fn update_priority(&mut self, id: NodeId, cases: &[crate::node::PriorityCase]) -> Status {
        let generation = self.ctx.variables.generation();
        let (active, last_generation) = match &self.slots[id.index()].data {
            RuntimeData::Priority {
                active,
                last_generation,
            } => (*active, *last_generation),
            _ => {
                debug_assert!(false, "priority slot holds wrong runtime data");
                return Status::Failure;
            }
        };

        // Cases are re-evaluated only when the binding changed or on a
        // fresh activation, not every tick.
        let winner = if last_generation == Some(generation) {
            active
        } else {
            cases.iter().position(|case| {
                case.condition
                    .as_ref()
                    .map_or(true, |p| p.evaluate(self.ctx.variables))
            })
        };

        if winner != active {
            if let Some(previous) = active {
                if let Some(case) = cases.get(previous) {
                    self.terminate_node(case.child);
                }
            }
        }
        if let RuntimeData::Priority {
            active,
            last_generation,
        } = &mut self.slots[id.index()].data
        {
            *active = winner;
            *last_generation = Some(generation);
        }

        match winner {
            Some(case) => self.tick_node(cases[case].child),
            None => Status::Failure,
        }
    }

    /// Ticks every still-running child each frame; none is skipped based
    /// on a sibling's result. Finished children are never re-ticked this
    /// activation.
    fn update_parallel(
        &mut self,
        id: NodeId,
        children: &[NodeId],
        success: Quorum,
        failure: Quorum,
    ) -> Status {
        let (mut running, mut successes, mut failures) = match &self.slots[id.index()].data {
            RuntimeData::Parallel {
                running,
                successes,
                failures,
            } => (*running, *successes, *failures),
            _ => {
                debug_assert!(false, "parallel slot holds wrong runtime data");
                return Status::Failure;
            }
        };

        for (i, &child) in children.iter().enumerate() {
            let bit = 1u64 << i;
            if running & bit == 0 {
                continue;
            }
            match self.tick_node(child) {
                Status::Running => {}
                Status::Success => {
                    running &= !bit;
                    successes += 1;
                }
                _ => {
                    running &= !bit;
                    failures += 1;
                }
            }
        }

        if let RuntimeData::Parallel {
            running: r,
            successes: s,
            failures: f,
        } = &mut self.slots[id.index()].data
        {
            *r = running;
            *s = successes;
            *f = failures;
        }

        let total = children.len() as u32;
        let failed = match failure {
            Quorum::Any => failures > 0,
            Quorum::All => failures == total,
        };
        let succeeded = match success {
            Quorum::Any => successes > 0,
            Quorum::All => successes == total,
        };

        if failed {
            Status::Failure
        } else if succeeded {
            Status::Success
        } else if running != 0 {
            Status::Running
        } else {
            // Every child finished without either policy being met.
            Status::Failure
        }
    }

    fn loop_state(&self, id: NodeId) -> Option<(u32, bool)> {
        match &self.slots[id.index()].data {
            RuntimeData::Loop {
                completed,
                child_was_running,
            } => Some((*completed, *child_was_running)),
            _ => {
                debug_assert!(false, "loop slot holds wrong runtime data");
                None
            }
        }
    }

    fn set_loop_state(&mut self, id: NodeId, completed: u32, child_was_running: bool) {
        if let RuntimeData::Loop {
            completed: c,
            child_was_running: r,
        } = &mut self.slots[id.index()].data
        {
            *c = completed;
            *r = child_was_running;
        }
    }

    /// A child Success restarts within the same frame only when the child
    /// was Running on the previous tick; an instantly-succeeding child
    /// advances one iteration per frame. Callers rely on that one-frame
    /// delay, so it is kept as-is.
    fn update_loop(&mut self, id: NodeId, child: NodeId, count: u32) -> Status {
        loop {
            let Some((completed, child_was_running)) = self.loop_state(id) else {
                return Status::Failure;
            };
            match self.tick_node(child) {
                Status::Running => {
                    self.set_loop_state(id, completed, true);
                    return Status::Running;
                }
                Status::Success => {
                    let completed = completed + 1;
                    self.set_loop_state(id, completed, false);
                    if count != 0 && completed >= count {
                        return Status::Success;
                    }
                    if !child_was_running {
                        return Status::Running;
                    }
                    // Same-frame restart; the flag is cleared, so an
                    // instantly-succeeding restart defers next time.
                }
                status => return status,
            }
        }
    }

    /// Symmetric to `update_loop`, retrying on Failure instead.
    fn update_retry(&mut self, id: NodeId, child: NodeId, max_attempts: u32) -> Status {
        loop {
            let Some((attempts, child_was_running)) = self.loop_state(id) else {
                return Status::Failure;
            };
            match self.tick_node(child) {
                Status::Running => {
                    self.set_loop_state(id, attempts, true);
                    return Status::Running;
                }
                Status::Failure => {
                    let attempts = attempts + 1;
                    self.set_loop_state(id, attempts, false);
                    if max_attempts != 0 && attempts >= max_attempts {
                        return Status::Failure;
                    }
                    if !child_was_running {
                        return Status::Running;
                    }
                }
                status => return status,
            }
        }
    }

    /// Forces cleanup of a node and everything still active beneath it.
    /// Safe to call on an already-terminated node; second calls are
    /// no-ops.
    fn terminate_node(&mut self, id: NodeId) {
        if !self.slots[id.index()].active {
            return;
        }
        let template = self.template;
        match &template.node(id).kind {
            NodeKind::Sequence { children } | NodeKind::Selector { children } => {
                // Only the currently indexed child can still be live.
                let index = match &self.slots[id.index()].data {
                    RuntimeData::Cursor { index } => Some(*index),
                    _ => None,
                };
                if let Some(&child) = index.and_then(|i| children.get(i)) {
                    self.terminate_node(child);
                }
            }
            NodeKind::Priority { cases } => {
                let active = match &self.slots[id.index()].data {
                    RuntimeData::Priority { active, .. } => *active,
                    _ => None,
                };
                if let Some(case) = active.and_then(|i| cases.get(i)) {
                    self.terminate_node(case.child);
                }
            }
            NodeKind::Parallel { children, .. } => {
                let running = match &self.slots[id.index()].data {
                    RuntimeData::Parallel { running, .. } => *running,
                    _ => 0,
                };
                for (i, &child) in children.iter().enumerate() {
                    if running & (1u64 << i) != 0 {
                        self.terminate_node(child);
                    }
                }
            }
            NodeKind::Loop { child, .. }
            | NodeKind::LoopUntilSuccess { child, .. }
            | NodeKind::Gate { child, .. }
            | NodeKind::SuppressFailure { child }
            | NodeKind::Tag { child, .. } => {
                self.terminate_node(*child);
            }
            NodeKind::StateMachine { states } => {
                let current = match &self.slots[id.index()].data {
                    RuntimeData::Machine { current, .. } => Some(*current),
                    _ => None,
                };
                if let Some(state) = current.and_then(|c| states.get(c)) {
                    self.terminate_node(state.root);
                }
            }
            NodeKind::Leaf { leaf, .. } => {
                let slot = &mut self.slots[id.index()];
                if let RuntimeData::Leaf(state) = &mut slot.data {
                    leaf.on_terminate(self.ctx, state);
                }
            }
        }
        // Leaf state is dropped here; this is the single cancellation
        // point for outstanding external requests.
        self.slots[id.index()].reset();
    }

    /// Depth-first delivery along the active path only. Inactive nodes
    /// never see events.
    fn deliver_event(&mut self, id: NodeId, event: &Event) {
        if !self.slots[id.index()].active {
            return;
        }
        let template = self.template;
        match &template.node(id).kind {
            NodeKind::Sequence { children } | NodeKind::Selector { children } => {
                let index = match &self.slots[id.index()].data {
                    RuntimeData::Cursor { index } => Some(*index),
                    _ => None,
                };
                if let Some(&child) = index.and_then(|i| children.get(i)) {
                    self.deliver_event(child, event);
                }
            }
            NodeKind::Priority { cases } => {
                let active = match &self.slots[id.index()].data {
                    RuntimeData::Priority { active, .. } => *active,
                    _ => None,
                };
                if let Some(case) = active.and_then(|i| cases.get(i)) {
                    self.deliver_event(case.child, event);
                }
            }
            NodeKind::Parallel { children, .. } => {
                let running = match &self.slots[id.index()].data {
                    RuntimeData::Parallel { running, .. } => *running,
                    _ => 0,
                };
                for (i, &child) in children.iter().enumerate() {
                    if running & (1u64 << i) != 0 {
                        self.deliver_event(child, event);
                    }
                }
            }
            NodeKind::Loop { child, .. }
            | NodeKind::LoopUntilSuccess { child, .. }
            | NodeKind::SuppressFailure { child }
            | NodeKind::Tag { child, .. } => {
                self.deliver_event(*child, event);
            }
            NodeKind::Gate { child, .. } => {
                if matches!(
                    &self.slots[id.index()].data,
                    RuntimeData::Gate { open: true }
                ) {
                    self.deliver_event(*child, event);
                }
            }
            NodeKind::StateMachine { states } => {
                let (current, pending) = match &self.slots[id.index()].data {
                    RuntimeData::Machine { current, pending } => (*current, *pending),
                    _ => return,
                };
                // Transition lookup uses the pending state when one is
                // already queued, so chained events within one frame
                // resolve against the state the machine will be in.
                let source = pending.unwrap_or(current);
                let matched = states.get(source).and_then(|state| {
                    state
                        .transitions
                        .iter()
                        .find(|t| t.event == event.name())
                        .map(|t| t.target)
                });
                if let Some(target) = matched {
                    if let RuntimeData::Machine { pending, .. } =
                        &mut self.slots[id.index()].data
                    {
                        *pending = Some(target);
                    }
                }
                // The switch happens at the next tick; the event still
                // travels down the state that is active right now.
                if let Some(state) = states.get(current) {
                    self.deliver_event(state.root, event);
                }
            }
            NodeKind::Leaf { leaf, .. } => {
                let slot = &mut self.slots[id.index()];
                if let RuntimeData::Leaf(state) = &mut slot.data {
                    leaf.on_event(self.ctx, state, event);
                }
            }
        }
    }
}

fn full_mask(count: usize) -> u64 {
    debug_assert!(count <= 64, "parallel child count validated at load");
    if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    }
}
