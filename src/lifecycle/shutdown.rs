//! Shutdown coordination and the final bootstrap phase.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::Failure;
use crate::handler::RequestHandler;
use crate::helpers::LoaderHelpers;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the request loop subscribes to. The
/// trigger is sticky: a loop that subscribes late still sees it through
/// [`Shutdown::is_triggered`].
#[derive(Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    /// Return true once `trigger` has been called.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase 5: clean up the handler, then run the final helper hook.
pub fn finish(
    handler: &mut dyn RequestHandler,
    helpers: &dyn LoaderHelpers,
) -> Result<(), Failure> {
    handler.cleanup()?;
    helpers.after_handling_requests()?;
    tracing::info!("Shutdown complete");
    Ok(())
}
