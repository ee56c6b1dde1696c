//! Bootstrap phases.

/// One ordered, non-repeatable step of the worker bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    ArgumentIngestion,
    RuntimeInit,
    ApplicationLoad,
    RequestServing,
    Shutdown,
}

impl Phase {
    /// Human-readable name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Phase::ArgumentIngestion => "argument_ingestion",
            Phase::RuntimeInit => "runtime_init",
            Phase::ApplicationLoad => "application_load",
            Phase::RequestServing => "request_serving",
            Phase::Shutdown => "shutdown",
        }
    }

    /// The phase that follows this one, if any.
    pub const fn next(self) -> Option<Phase> {
        match self {
            Phase::ArgumentIngestion => Some(Phase::RuntimeInit),
            Phase::RuntimeInit => Some(Phase::ApplicationLoad),
            Phase::ApplicationLoad => Some(Phase::RequestServing),
            Phase::RequestServing => Some(Phase::Shutdown),
            Phase::Shutdown => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
