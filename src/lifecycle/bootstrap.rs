//! Bootstrap driver.
//!
//! # Responsibilities
//! - Run the five phases in order on the calling thread
//! - Route each phase's failure to the infrastructure or application channel
//! - Derive the exit status; the caller performs the actual exit
//!
//! # Design Decisions
//! - Before the helpers are located, failures use the fallback formatter
//! - Application-load failures always go to `report_app_exception`
//! - The handler is cleaned up even when its main loop fails

use std::ffi::OsString;
use std::io::{self, Write};

use crate::app::LoaderRegistry;
use crate::config::{StartupOptions, WORK_DIR_ENV};
use crate::error::{format_failure, BootError, Channel, Failure, Fatal};
use crate::handler::{HandlerFactory, Input};
use crate::helpers::{LoaderHelpers, RuntimeLocator};
use crate::lifecycle::context::WorkerContext;
use crate::lifecycle::phase::Phase;
use crate::lifecycle::{serving, shutdown, startup};

/// The worker bootstrap pipeline and its collaborators.
pub struct WorkerBootstrap {
    locator: Box<dyn RuntimeLocator>,
    loaders: LoaderRegistry,
    handlers: Box<dyn HandlerFactory>,
    input: Option<Input>,
    work_dir_value: Option<OsString>,
    fallback: Box<dyn Write + Send>,
}

impl WorkerBootstrap {
    /// Create a bootstrap reading its work directory from `SPAWN_WORK_DIR`
    /// and serving from stdin.
    pub fn new(
        locator: Box<dyn RuntimeLocator>,
        loaders: LoaderRegistry,
        handlers: Box<dyn HandlerFactory>,
    ) -> Self {
        Self {
            locator,
            loaders,
            handlers,
            input: None,
            work_dir_value: std::env::var_os(WORK_DIR_ENV),
            fallback: Box::new(io::stdout()),
        }
    }

    /// Use `input` instead of stdin for the request handler.
    pub fn with_input(mut self, input: Input) -> Self {
        self.input = Some(input);
        self
    }

    /// Use `value` instead of the current `SPAWN_WORK_DIR`.
    pub fn with_work_dir_value(mut self, value: Option<OsString>) -> Self {
        self.work_dir_value = value;
        self
    }

    /// Write fallback-formatter output to `out` instead of stdout.
    pub fn with_fallback_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.fallback = out;
        self
    }

    /// Run every phase. On failure the error has already been reported and
    /// the returned [`Fatal`] carries the exit status.
    pub fn run(mut self) -> Result<(), Fatal> {
        let mut ctx = WorkerContext::new();
        tracing::info!(phase = %ctx.phase(), "Entering phase");

        match startup::ingest_arguments(self.work_dir_value.take()) {
            Ok(options) => ctx.set_options(options),
            Err(failure) => return Err(abort_ingestion(self.fallback.as_mut(), &failure)),
        }

        ctx.advance(Phase::RuntimeInit);
        let helpers = match self.locator.locate(ctx.options()) {
            Ok(helpers) => helpers,
            Err(error) => {
                let failure = Failure::from(error);
                print_fallback(self.fallback.as_mut(), &failure);
                return Err(fatal(Phase::RuntimeInit, Channel::Infrastructure, &failure));
            }
        };
        let helpers = helpers.as_ref();
        if let Err(failure) = startup::init_runtime(&mut ctx, helpers) {
            return Err(report_infrastructure(
                Phase::RuntimeInit,
                ctx.options(),
                helpers,
                &failure,
            ));
        }

        ctx.advance(Phase::ApplicationLoad);
        if let Err(failure) = startup::load_app(&mut ctx, helpers, &self.loaders) {
            return Err(report_application(ctx.options(), helpers, &failure));
        }

        ctx.advance(Phase::RequestServing);
        let input = self
            .input
            .take()
            .unwrap_or_else(|| Box::new(std::io::stdin()));
        let mut handler =
            match serving::start_serving(&ctx, helpers, self.handlers.as_ref(), input) {
                Ok(handler) => handler,
                Err(failure) => {
                    return Err(report_infrastructure(
                        Phase::RequestServing,
                        ctx.options(),
                        helpers,
                        &failure,
                    ));
                }
            };
        let served = handler.main_loop();

        ctx.advance(Phase::Shutdown);
        let finished = shutdown::finish(handler.as_mut(), helpers);

        if let Err(error) = served {
            if let Err(cleanup) = &finished {
                tracing::warn!(error = %cleanup, "Cleanup failed after main loop failure");
            }
            return Err(report_infrastructure(
                Phase::RequestServing,
                ctx.options(),
                helpers,
                &Failure::from(error),
            ));
        }
        if let Err(failure) = finished {
            return Err(report_infrastructure(
                Phase::Shutdown,
                ctx.options(),
                helpers,
                &failure,
            ));
        }
        Ok(())
    }
}

fn fatal(phase: Phase, channel: Channel, failure: &Failure) -> Fatal {
    let exit_code = failure.exit_code();
    tracing::error!(
        phase = %phase,
        channel = %channel,
        exit_code,
        error = %failure,
        "Worker bootstrap aborted"
    );
    Fatal {
        phase,
        channel,
        exit_code,
    }
}

/// Print through the fallback formatter when no helpers can report.
fn print_fallback(out: &mut dyn Write, failure: &Failure) {
    let written = writeln!(out, "{}", format_failure(failure)).and_then(|()| out.flush());
    if let Err(e) = written {
        tracing::warn!(error = %e, "Cannot write fallback error report");
    }
}

/// Abort during argument ingestion; no helpers exist yet.
fn abort_ingestion(out: &mut dyn Write, failure: &Failure) -> Fatal {
    match failure.error() {
        BootError::MissingEnv(_) => eprintln!("{}", failure),
        _ => print_fallback(out, failure),
    }
    fatal(Phase::ArgumentIngestion, Channel::Infrastructure, failure)
}

fn report_infrastructure(
    phase: Phase,
    options: &StartupOptions,
    helpers: &dyn LoaderHelpers,
    failure: &Failure,
) -> Fatal {
    helpers.report_exception(options, failure);
    helpers.about_to_abort(options, failure);
    fatal(phase, Channel::Infrastructure, failure)
}

fn report_application(
    options: &StartupOptions,
    helpers: &dyn LoaderHelpers,
    failure: &Failure,
) -> Fatal {
    helpers.report_app_exception(options, failure);
    helpers.about_to_abort(options, failure);
    fatal(Phase::ApplicationLoad, Channel::Application, failure)
}
