//! spawn-loader worker
//!
//! # Startup Protocol
//!
//! ```text
//!  supervisor                                   spawn-loader
//!  ──────────                                   ────────────
//!  write <work_dir>/<key> files
//!  SPAWN_WORK_DIR=<work_dir> spawn ───────────▶ read options
//!                                               init runtime
//!                                               load <app_root>/config.ru
//!  <response_dir>/properties.json ◀──────────── advertise sockets
//!  <response_dir>/finish          ◀──────────── advertise readiness
//!  stdin (JSON lines)             ────────────▶ main loop
//!  stdout (JSON lines)            ◀────────────
//!  close stdin / SIGTERM          ────────────▶ cleanup, exit 0
//! ```
//!
//! Failures are written to `<response_dir>/error.json` and the process exits
//! with status 1 (or the status a deliberate exit carried).

use std::sync::Arc;

use clap::Parser;

use spawn_loader::app::LoaderRegistry;
use spawn_loader::handler::JsonLinesFactory;
use spawn_loader::helpers::StandardLocator;
use spawn_loader::lifecycle::{Shutdown, WorkerBootstrap};
use spawn_loader::observability::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "spawn-loader")]
#[command(about = "Worker process loader for supervised applications", long_about = None)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Log filter directives (overrides RUST_LOG).
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level.as_deref());

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "spawn-loader starting");

    let loaders = LoaderRegistry::with_defaults();
    let locator = StandardLocator::new(loaders.frameworks());
    let handlers = JsonLinesFactory::new(Arc::new(std::io::stdout()), Shutdown::new());

    let bootstrap = WorkerBootstrap::new(Box::new(locator), loaders, Box::new(handlers));
    if let Err(fatal) = bootstrap.run() {
        std::process::exit(fatal.exit_code);
    }
}
