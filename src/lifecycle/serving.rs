//! Phase 4: hand the application to the request handler.

use crate::error::{BootError, Failure};
use crate::handler::{HandlerFactory, Input, RequestHandler};
use crate::helpers::LoaderHelpers;
use crate::lifecycle::context::WorkerContext;

/// Construct the handler and advertise it to the supervisor.
///
/// The caller runs `main_loop` on the returned handler.
pub fn start_serving(
    ctx: &WorkerContext,
    helpers: &dyn LoaderHelpers,
    factory: &dyn HandlerFactory,
    input: Input,
) -> Result<Box<dyn RequestHandler>, Failure> {
    let options = ctx.options();
    helpers.before_handling_requests(false, options)?;

    let app = ctx
        .app()
        .cloned()
        .ok_or_else(|| BootError::Handler("no application was loaded".to_string()))?;
    let handler = factory.construct(input, options, app)?;

    helpers.advertise_sockets(options, handler.as_ref())?;
    helpers.advertise_readiness(options)?;
    Ok(handler)
}
