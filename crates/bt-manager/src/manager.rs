use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, warn};

use bt_core::{AgentHandle, Event, PredicateCompiler, TickContext, Variables};
use bt_engine::{Instance, LoadError, NodeRegistry, Template, TreeConfig};

/// Registry of everything behavior-related in one process: the template
/// cache keyed by tree name, and at most one live instance per agent.
pub struct TreeManager {
    registry: NodeRegistry,
    compiler: Box<dyn PredicateCompiler>,
    templates: BTreeMap<String, Rc<Template>>,
    instances: BTreeMap<u64, Instance>,
    next_instance_id: u64,
    /// Clock of the most recent `update`, reused when a stop/replace has
    /// to terminate leaves between ticks.
    clock: TickContext,
}

impl TreeManager {
    pub fn new(registry: NodeRegistry, compiler: Box<dyn PredicateCompiler>) -> Self {
        Self {
            registry,
            compiler,
            templates: BTreeMap::new(),
            instances: BTreeMap::new(),
            next_instance_id: 0,
            clock: TickContext {
                tick: 0,
                dt_seconds: 0.0,
                seed: 0,
            },
        }
    }

    /// Parse, validate, and cache a template. On failure nothing is
    /// installed and the error names the offending node path.
    pub fn load_template(&mut self, config: TreeConfig) -> Result<Rc<Template>, LoadError> {
        let name = config.name.clone();
        match Template::load(config, &self.registry, self.compiler.as_ref()) {
            Ok(template) => {
                debug!(tree = %name, nodes = template.len(), "template cached");
                self.templates.insert(name, Rc::clone(&template));
                Ok(template)
            }
            Err(error) => {
                warn!(tree = %name, %error, "template load failed");
                Err(error)
            }
        }
    }

    pub fn template(&self, name: &str) -> Option<Rc<Template>> {
        self.templates.get(name).cloned()
    }

    /// Start the named tree on `agent`. Any tree the agent was already
    /// running is stopped first; at most one instance exists per agent.
    pub fn start_tree(&mut self, agent: AgentHandle, tree_name: &str) -> bool {
        let Some(template) = self.templates.get(tree_name).cloned() else {
            warn!(agent = agent.stable_id(), tree = tree_name, "start_tree: no such template");
            return false;
        };
        self.stop_tree(agent);

        let instance_id = self.next_instance_id;
        self.next_instance_id += 1;
        debug!(
            agent = agent.stable_id(),
            tree = tree_name,
            instance = instance_id,
            "tree started"
        );
        self.instances
            .insert(agent.stable_id(), Instance::new(template, agent, instance_id));
        true
    }

    /// Load `config` (caching it under its name) and start it in one
    /// step. Returns false when the config fails validation.
    pub fn start_tree_from_config(&mut self, agent: AgentHandle, config: TreeConfig) -> bool {
        let name = config.name.clone();
        if self.load_template(config).is_err() {
            return false;
        }
        self.start_tree(agent, &name)
    }

    /// Stop and destroy the agent's instance, terminating every active
    /// node. No-op when the agent runs nothing.
    pub fn stop_tree(&mut self, agent: AgentHandle) {
        if let Some(mut instance) = self.instances.remove(&agent.stable_id()) {
            instance.stop(&self.clock);
            debug!(
                agent = agent.stable_id(),
                tree = instance.template().name(),
                "tree stopped"
            );
        }
    }

    /// Route an event to the agent's instance, synchronously, down its
    /// active path. Returns false when the agent runs nothing.
    pub fn handle_event(&mut self, agent: AgentHandle, event: &Event) -> bool {
        let clock = self.clock;
        match self.instances.get_mut(&agent.stable_id()) {
            Some(instance) => {
                instance.handle_event(&clock, event);
                true
            }
            None => false,
        }
    }

    pub fn variables(&self, agent: AgentHandle) -> Option<&Variables> {
        self.instances
            .get(&agent.stable_id())
            .map(|i| i.variables())
    }

    /// Mutable variable binding for collaborators; writes are only legal
    /// between ticks.
    pub fn variables_mut(&mut self, agent: AgentHandle) -> Option<&mut Variables> {
        self.instances
            .get_mut(&agent.stable_id())
            .map(|i| i.variables_mut())
    }

    pub fn instance(&self, agent: AgentHandle) -> Option<&Instance> {
        self.instances.get(&agent.stable_id())
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Tick every live instance once, in ascending agent order.
    pub fn update(&mut self, clock: &TickContext) {
        self.clock = *clock;
        for instance in self.instances.values_mut() {
            instance.tick(clock);
        }
    }

    /// Process reset: stop all instances, drop the template cache, and
    /// restart the instance-id counter.
    pub fn clear(&mut self) {
        let agents: Vec<u64> = self.instances.keys().copied().collect();
        for agent in agents {
            self.stop_tree(AgentHandle(agent));
        }
        self.templates.clear();
        self.next_instance_id = 0;
        debug!("tree manager cleared");
    }
}
