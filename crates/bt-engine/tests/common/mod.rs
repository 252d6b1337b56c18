//! Shared test scaffolding: a recording probe leaf plus load helpers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use bt_core::{
    AgentHandle, Event, FlagCompiler, Leaf, LeafState, Status, TickContext, UpdateContext,
};
use bt_engine::{Instance, LoadError, NodeRegistry, Template, TreeConfig};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

pub fn count(log: &Log, entry: &str) -> usize {
    log.borrow().iter().filter(|e| *e == entry).count()
}

/// Leaf that records every lifecycle call and replays a scripted status
/// sequence per activation (the last entry repeats).
pub struct Probe {
    name: String,
    log: Log,
    script: Vec<Status>,
}

impl Leaf for Probe {
    fn on_initialize(&self, _ctx: &mut UpdateContext<'_>) -> LeafState {
        self.log.borrow_mut().push(format!("{}:init", self.name));
        Box::new(0usize)
    }

    fn on_update(&self, _ctx: &mut UpdateContext<'_>, state: &mut LeafState) -> Status {
        let pos = state.downcast_mut::<usize>().expect("probe state");
        let last = self.script.len().saturating_sub(1);
        let status = self.script.get((*pos).min(last)).copied().unwrap_or(Status::Success);
        *pos += 1;
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, status_word(status)));
        status
    }

    fn on_terminate(&self, _ctx: &mut UpdateContext<'_>, _state: &mut LeafState) {
        self.log.borrow_mut().push(format!("{}:term", self.name));
    }

    fn on_event(&self, _ctx: &mut UpdateContext<'_>, _state: &mut LeafState, event: &Event) {
        self.log
            .borrow_mut()
            .push(format!("{}:event:{}", self.name, event.name()));
    }
}

fn status_word(status: Status) -> &'static str {
    match status {
        Status::Success => "success",
        Status::Failure => "failure",
        Status::Running => "running",
        Status::Invalid => "invalid",
    }
}

/// Builtins plus a `probe` leaf type whose calls land in `log`.
///
/// Usage in config: `{type: probe, name: a, script: "running,success"}`.
pub fn registry_with_probe(log: &Log) -> NodeRegistry {
    let mut registry = NodeRegistry::with_builtins();
    let log = Rc::clone(log);
    registry.register("probe", move |config, ctx| {
        let path = ctx.path();
        let name = config.name.clone().unwrap_or_else(|| "probe".to_string());
        let script = match config.opt_str_attr("script", &path)? {
            None => vec![Status::Success],
            Some(text) => text
                .split(',')
                .map(|word| match word.trim() {
                    "success" => Ok(Status::Success),
                    "failure" => Ok(Status::Failure),
                    "running" => Ok(Status::Running),
                    other => Err(LoadError::InvalidAttribute {
                        path: path.clone(),
                        attribute: "script",
                        reason: format!("unknown status `{other}`"),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(Box::new(Probe {
            name,
            log: Rc::clone(&log),
            script,
        }) as Box<dyn Leaf>)
    });
    registry
}

pub fn load(yaml: &str, registry: &NodeRegistry) -> Rc<Template> {
    let config = TreeConfig::from_yaml(yaml).expect("config parses");
    Template::load(config, registry, &FlagCompiler).expect("template loads")
}

pub fn instance(yaml: &str, registry: &NodeRegistry) -> Instance {
    Instance::new(load(yaml, registry), AgentHandle(1), 0)
}

pub fn clock(tick: u64) -> TickContext {
    TickContext {
        tick,
        dt_seconds: 0.1,
        seed: 7,
    }
}
