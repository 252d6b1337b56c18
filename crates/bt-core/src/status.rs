/// Tri-state result of one node tick.
///
/// `Running` is the only value that keeps a node alive across frames.
/// `Invalid` appears only before a node's first tick or as a defensive
/// sentinel when internal bookkeeping is broken; it is never a normal
/// control-flow value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Invalid,
    Success,
    Failure,
    Running,
}

impl Status {
    /// `true` for `Success` and `Failure`, the statuses that end an
    /// activation this frame.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }
}
