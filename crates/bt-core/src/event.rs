/// A lightweight named signal.
///
/// Events are not queued commands: dispatch is synchronous, same-tick, and
/// walks only the active path of the receiving instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    name: String,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
