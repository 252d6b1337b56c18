//! Utility leaves shipped with the engine.
//!
//! Domain leaves (movement, animation, combat, ...) belong to their own
//! subsystems and register themselves the same way; these four exist so
//! trees are authorable and testable with no collaborators wired in.

use bt_core::{Leaf, LeafState, Predicate, Status, UpdateContext};

use crate::config::NodeConfig;
use crate::error::LoadError;
use crate::registry::{LoadContext, NodeRegistry};

/// `wait`: runs for `seconds`, then succeeds. `seconds: 0` succeeds on
/// the first update.
pub struct WaitLeaf {
    seconds: f32,
}

impl Leaf for WaitLeaf {
    fn on_initialize(&self, _ctx: &mut UpdateContext<'_>) -> LeafState {
        Box::new(0.0f64)
    }

    fn on_update(&self, ctx: &mut UpdateContext<'_>, state: &mut LeafState) -> Status {
        let Some(elapsed) = state.downcast_mut::<f64>() else {
            debug_assert!(false, "wait leaf state has wrong type");
            return Status::Failure;
        };
        *elapsed += ctx.clock.dt_seconds as f64;
        if *elapsed >= self.seconds as f64 {
            Status::Success
        } else {
            Status::Running
        }
    }
}

/// `condition`: evaluates its compiled predicate every update.
pub struct ConditionLeaf {
    predicate: Box<dyn Predicate>,
}

impl Leaf for ConditionLeaf {
    fn on_initialize(&self, _ctx: &mut UpdateContext<'_>) -> LeafState {
        Box::new(())
    }

    fn on_update(&self, ctx: &mut UpdateContext<'_>, _state: &mut LeafState) -> Status {
        if self.predicate.evaluate(ctx.variables) {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

/// `succeed` / `fail`: constant leaves, mostly useful as branch stubs.
pub struct ConstLeaf {
    status: Status,
}

impl Leaf for ConstLeaf {
    fn on_initialize(&self, _ctx: &mut UpdateContext<'_>) -> LeafState {
        Box::new(())
    }

    fn on_update(&self, _ctx: &mut UpdateContext<'_>, _state: &mut LeafState) -> Status {
        self.status
    }
}

pub fn register_builtins(registry: &mut NodeRegistry) {
    registry.register("wait", |config: &NodeConfig, ctx: &mut LoadContext<'_>| {
        let path = ctx.path();
        let seconds = config.opt_f32_attr("seconds", &path)?.unwrap_or(0.0);
        if seconds < 0.0 {
            return Err(LoadError::InvalidAttribute {
                path,
                attribute: "seconds",
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(Box::new(WaitLeaf { seconds }) as Box<dyn Leaf>)
    });

    registry.register("condition", |config: &NodeConfig, ctx: &mut LoadContext<'_>| {
        let path = ctx.path();
        let expression = config.str_attr("expression", &path)?;
        let predicate = ctx.compile_condition(expression)?;
        Ok(Box::new(ConditionLeaf { predicate }) as Box<dyn Leaf>)
    });

    registry.register("succeed", |_config: &NodeConfig, _ctx: &mut LoadContext<'_>| {
        Ok(Box::new(ConstLeaf {
            status: Status::Success,
        }) as Box<dyn Leaf>)
    });

    registry.register("fail", |_config: &NodeConfig, _ctx: &mut LoadContext<'_>| {
        Ok(Box::new(ConstLeaf {
            status: Status::Failure,
        }) as Box<dyn Leaf>)
    });
}
