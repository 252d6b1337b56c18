//! Process-scoped behavior tree manager.
//!
//! Loads and caches templates, owns the live instance per agent, drives
//! the per-tick update loop, and routes external events into the right
//! instance. A manager is an explicit value with defined teardown
//! (`clear`), passed by reference into the simulation loop; there are no
//! ambient globals.

#![forbid(unsafe_code)]

pub mod manager;

pub use manager::TreeManager;
