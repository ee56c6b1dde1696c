//! State threaded through the bootstrap phases.

use crate::app::ApplicationHandle;
use crate::config::{StartupOptions, WorkerConfig};
use crate::lifecycle::phase::Phase;

/// Everything the bootstrap has accumulated so far.
pub struct WorkerContext {
    phase: Phase,
    options: StartupOptions,
    config: Option<WorkerConfig>,
    app: Option<ApplicationHandle>,
}

impl WorkerContext {
    /// A context at the start of argument ingestion.
    pub fn new() -> Self {
        Self {
            phase: Phase::ArgumentIngestion,
            options: StartupOptions::new(),
            config: None,
            app: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`.
    ///
    /// # Panics
    ///
    /// Panics unless `next` immediately follows the current phase.
    pub fn advance(&mut self, next: Phase) {
        assert!(
            self.phase.next() == Some(next),
            "bootstrap cannot move from {} to {}",
            self.phase,
            next
        );
        tracing::info!(phase = %next, "Entering phase");
        self.phase = next;
    }

    pub fn options(&self) -> &StartupOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: StartupOptions) {
        self.options = options;
    }

    pub fn config(&self) -> Option<&WorkerConfig> {
        self.config.as_ref()
    }

    pub fn set_config(&mut self, config: WorkerConfig) {
        self.config = Some(config);
    }

    /// The loaded application, once phase 3 has bound it.
    pub fn app(&self) -> Option<&ApplicationHandle> {
        self.app.as_ref()
    }

    pub fn bind_app(&mut self, app: ApplicationHandle) {
        self.app = Some(app);
    }
}

impl Default for WorkerContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_forward() {
        let mut ctx = WorkerContext::new();
        ctx.advance(Phase::RuntimeInit);
        ctx.advance(Phase::ApplicationLoad);
        assert_eq!(ctx.phase(), Phase::ApplicationLoad);
    }

    #[test]
    #[should_panic(expected = "cannot move")]
    fn test_advance_refuses_to_skip() {
        let mut ctx = WorkerContext::new();
        ctx.advance(Phase::ApplicationLoad);
    }

    #[test]
    #[should_panic(expected = "cannot move")]
    fn test_advance_refuses_to_go_back() {
        let mut ctx = WorkerContext::new();
        ctx.advance(Phase::RuntimeInit);
        ctx.advance(Phase::ApplicationLoad);
        ctx.advance(Phase::RuntimeInit);
    }

    #[test]
    #[should_panic(expected = "cannot move")]
    fn test_advance_refuses_to_repeat() {
        let mut ctx = WorkerContext::new();
        ctx.advance(Phase::RuntimeInit);
        ctx.advance(Phase::RuntimeInit);
    }
}
