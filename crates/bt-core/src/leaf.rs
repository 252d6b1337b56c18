use std::any::Any;

use crate::{Event, Status, UpdateContext};

/// Per-activation mutable state for one leaf, owned by the instance's
/// runtime arena. Created by `on_initialize`, dropped on terminate.
pub type LeafState = Box<dyn Any>;

/// Contract implemented by domain leaf tasks (movement, animation,
/// timers, ...).
///
/// The leaf object itself belongs to the shared, immutable template and
/// must hold only static configuration; everything mutable goes into the
/// [`LeafState`] blob. The engine guarantees the lifecycle order
/// `on_initialize` → `on_update`* → `on_terminate` per activation, and
/// that `on_terminate` runs exactly once even when a parent abandons a
/// Running leaf. Any outstanding asynchronous request must be cancelled in
/// `on_terminate` (or the state's `Drop`).
pub trait Leaf {
    fn on_initialize(&self, ctx: &mut UpdateContext<'_>) -> LeafState;

    fn on_update(&self, ctx: &mut UpdateContext<'_>, state: &mut LeafState) -> Status;

    fn on_terminate(&self, _ctx: &mut UpdateContext<'_>, _state: &mut LeafState) {}

    /// Called only while this leaf is on the instance's active path.
    fn on_event(&self, _ctx: &mut UpdateContext<'_>, _state: &mut LeafState, _event: &Event) {}
}
