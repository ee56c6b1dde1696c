//! Phases 1 to 3: argument ingestion, runtime init, application load.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::{EntryPoint, LoaderRegistry};
use crate::config::{read_startup_arguments, work_dir_from, StartupOptions, WorkerConfig};
use crate::error::{BootError, Failure};
use crate::helpers::LoaderHelpers;
use crate::lifecycle::context::WorkerContext;

/// Entry-point file name used when no `startup_file` is given.
pub const DEFAULT_STARTUP_FILE: &str = "config.ru";

/// Phase 1: read the handoff directory named by `work_dir_value`.
pub fn ingest_arguments(work_dir_value: Option<OsString>) -> Result<StartupOptions, Failure> {
    let dir = work_dir_from(work_dir_value)?;
    let options = read_startup_arguments(&dir)?;
    tracing::info!(
        work_dir = %dir.display(),
        options = options.len(),
        "Startup arguments read"
    );
    Ok(options)
}

/// Phase 2: unbuffer stdio, let the helpers initialize, decode the config.
pub fn init_runtime(ctx: &mut WorkerContext, helpers: &dyn LoaderHelpers) -> Result<(), Failure> {
    helpers.disable_stdio_buffering()?;
    let options = helpers.init(ctx.options().clone())?;
    let config = WorkerConfig::from_options(&options)?;

    tracing::info!(
        app_root = %config.app_root.display(),
        app_loader = %config.app_loader,
        environment = %config.environment,
        "Worker configured"
    );
    ctx.set_options(options);
    ctx.set_config(config);
    Ok(())
}

/// Resolve the entry-point file.
///
/// `startup_file` wins over `<app_root>/config.ru`; a relative path is taken
/// relative to `app_root`.
pub fn entry_point_path(app_root: &Path, startup_file: Option<&Path>) -> PathBuf {
    match startup_file {
        Some(file) if file.is_absolute() => file.to_path_buf(),
        Some(file) => app_root.join(file),
        None => app_root.join(DEFAULT_STARTUP_FILE),
    }
}

/// Phase 3: run the pre-load hooks, load the application, bind it.
pub fn load_app(
    ctx: &mut WorkerContext,
    helpers: &dyn LoaderHelpers,
    loaders: &LoaderRegistry,
) -> Result<(), Failure> {
    let config = ctx
        .config()
        .cloned()
        .ok_or_else(|| BootError::Collaborator("runtime was not initialized".to_string()))?;
    let path = entry_point_path(&config.app_root, config.startup_file.as_deref());
    let options = ctx.options();

    helpers.before_loading_app_code_step1(&path, options)?;
    helpers.run_load_path_setup_code(options)?;
    helpers.before_loading_app_code_step2(options)?;

    let loader = loaders.get(&config.app_loader)?;
    helpers.activate_dependency(loader.framework())?;

    let source = fs::read(&path).map_err(|e| BootError::io(&path, e))?;
    let app = loader.load(
        &EntryPoint {
            path: &path,
            source: &source,
        },
        options,
    )?;

    ctx.bind_app(app);
    helpers.after_loading_app_code(ctx.options())?;
    Ok(())
}
