//! Request handler collaborator.
//!
//! # Responsibilities
//! - Construct a handler from the input stream, options and application
//! - Describe the sockets it accepts requests on
//! - Run the request loop until shutdown or input EOF
//! - Release its resources exactly once in `cleanup`
//!
//! # Design Decisions
//! - The bootstrap blocks on `main_loop`; any threading lives inside it
//! - The handler owns its async runtime, so the bootstrap stays synchronous

pub mod json_lines;

use std::io::Read;

use serde::Serialize;

use crate::app::ApplicationHandle;
use crate::config::StartupOptions;
use crate::error::BootError;

pub use json_lines::{JsonLinesFactory, JsonLinesHandler, ResponseSink};

/// Input stream handed to the handler (stdin in production).
pub type Input = Box<dyn Read + Send>;

/// A place the handler accepts requests on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketDescriptor {
    pub name: String,
    pub address: String,
    pub protocol: String,
    pub concurrency: usize,
}

/// A constructed request handler.
pub trait RequestHandler {
    /// Sockets to advertise to the supervisor.
    fn sockets(&self) -> Vec<SocketDescriptor>;

    /// Serve requests until shutdown; blocks the calling thread.
    fn main_loop(&mut self) -> Result<(), BootError>;

    /// Release handler resources.
    fn cleanup(&mut self) -> Result<(), BootError>;
}

/// Builds the request handler for the serving phase.
pub trait HandlerFactory {
    fn construct(
        &self,
        input: Input,
        options: &StartupOptions,
        app: ApplicationHandle,
    ) -> Result<Box<dyn RequestHandler>, BootError>;
}
