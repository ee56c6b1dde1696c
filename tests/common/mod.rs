//! Shared fixtures for bootstrap integration tests.

#![allow(dead_code)]

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use spawn_loader::app::{ApplicationHandle, Env};
use spawn_loader::config::StartupOptions;
use spawn_loader::error::{BootError, Failure};
use spawn_loader::handler::{HandlerFactory, Input, RequestHandler, ResponseSink, SocketDescriptor};
use spawn_loader::helpers::{LoaderHelpers, RuntimeLocator};
use tempfile::TempDir;

/// A handoff directory plus an application root.
pub struct Fixture {
    pub args: TempDir,
    pub app_root: TempDir,
}

impl Fixture {
    /// Handoff directory whose `app_root` points at a fresh application root.
    pub fn new() -> Self {
        let fixture = Self {
            args: tempfile::tempdir().unwrap(),
            app_root: tempfile::tempdir().unwrap(),
        };
        let root = fixture.app_root.path().to_str().unwrap().to_string();
        fixture.arg("app_root", &root);
        fixture
    }

    /// Write one startup argument file.
    pub fn arg(&self, key: &str, value: &str) -> &Self {
        fs::write(self.args.path().join(key), value).unwrap();
        self
    }

    /// Write `<app_root>/config.ru`.
    pub fn config_ru(&self, source: &str) -> &Self {
        fs::write(self.app_root.path().join("config.ru"), source).unwrap();
        self
    }

    pub fn work_dir_value(&self) -> Option<OsString> {
        Some(self.args.path().as_os_str().to_owned())
    }

    pub fn app_root(&self) -> &Path {
        self.app_root.path()
    }
}

/// Where a recording collaborator should fail.
#[derive(Debug, Clone, Copy)]
pub struct Injected {
    pub at: &'static str,
    pub exit: Option<i32>,
}

/// Event log shared by the recording collaborators.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
    fail: Mutex<Vec<Injected>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_at(at: &'static str, exit: Option<i32>) -> Arc<Self> {
        Self::failing_at_each(&[(at, exit)])
    }

    /// Fail at every listed point, each with its own exit status.
    pub fn failing_at_each(points: &[(&'static str, Option<i32>)]) -> Arc<Self> {
        let recorder = Self::default();
        *recorder.fail.lock().unwrap() = points
            .iter()
            .map(|&(at, exit)| Injected { at, exit })
            .collect();
        Arc::new(recorder)
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    /// Record `event` and fail if it is an injected failure point.
    pub fn hook(&self, event: &str) -> Result<(), BootError> {
        self.record(event);
        let injected = self
            .fail
            .lock()
            .unwrap()
            .iter()
            .find(|point| point.at == event)
            .copied();
        match injected {
            Some(Injected { exit: Some(status), .. }) => Err(BootError::Exit(status)),
            Some(Injected { exit: None, .. }) => Err(BootError::Collaborator(format!(
                "injected failure at {}",
                event
            ))),
            None => Ok(()),
        }
    }
}

pub struct RecordingLocator(pub Arc<Recorder>);

impl RuntimeLocator for RecordingLocator {
    fn locate(&self, _options: &StartupOptions) -> Result<Box<dyn LoaderHelpers>, BootError> {
        self.0.hook("locate")?;
        Ok(Box::new(RecordingHelpers(self.0.clone())))
    }
}

pub struct RecordingHelpers(pub Arc<Recorder>);

impl LoaderHelpers for RecordingHelpers {
    fn disable_stdio_buffering(&self) -> Result<(), BootError> {
        self.0.hook("disable_stdio_buffering")
    }

    fn init(&self, mut options: StartupOptions) -> Result<StartupOptions, BootError> {
        self.0.hook("init")?;
        options.insert_derived("recorded", "yes")?;
        Ok(options)
    }

    fn before_loading_app_code_step1(
        &self,
        startup_file: &Path,
        _options: &StartupOptions,
    ) -> Result<(), BootError> {
        self.0.record(format!("startup_file:{}", startup_file.display()));
        self.0.hook("before_loading_app_code_step1")
    }

    fn run_load_path_setup_code(&self, _options: &StartupOptions) -> Result<(), BootError> {
        self.0.hook("run_load_path_setup_code")
    }

    fn before_loading_app_code_step2(&self, _options: &StartupOptions) -> Result<(), BootError> {
        self.0.hook("before_loading_app_code_step2")
    }

    fn activate_dependency(&self, name: &str) -> Result<(), BootError> {
        self.0.hook(&format!("activate_dependency:{}", name))
    }

    fn after_loading_app_code(&self, _options: &StartupOptions) -> Result<(), BootError> {
        self.0.hook("after_loading_app_code")
    }

    fn report_exception(&self, _options: &StartupOptions, _failure: &Failure) {
        self.0.record("report_exception");
    }

    fn report_app_exception(&self, _options: &StartupOptions, _failure: &Failure) {
        self.0.record("report_app_exception");
    }

    fn about_to_abort(&self, _options: &StartupOptions, failure: &Failure) {
        self.0.record(format!("about_to_abort:{}", failure.exit_code()));
    }

    fn before_handling_requests(
        &self,
        forked: bool,
        options: &StartupOptions,
    ) -> Result<(), BootError> {
        assert_eq!(options.get("recorded"), Some(&b"yes"[..]));
        self.0.hook(&format!("before_handling_requests:{}", forked))
    }

    fn advertise_sockets(
        &self,
        _options: &StartupOptions,
        handler: &dyn RequestHandler,
    ) -> Result<(), BootError> {
        self.0.record(format!("sockets:{}", handler.sockets().len()));
        self.0.hook("advertise_sockets")
    }

    fn advertise_readiness(&self, _options: &StartupOptions) -> Result<(), BootError> {
        self.0.hook("advertise_readiness")
    }

    fn after_handling_requests(&self) -> Result<(), BootError> {
        self.0.hook("after_handling_requests")
    }
}

pub struct RecordingFactory(pub Arc<Recorder>);

impl HandlerFactory for RecordingFactory {
    fn construct(
        &self,
        _input: Input,
        _options: &StartupOptions,
        app: ApplicationHandle,
    ) -> Result<Box<dyn RequestHandler>, BootError> {
        self.0.hook("construct")?;
        Ok(Box::new(RecordingHandler {
            recorder: self.0.clone(),
            app,
        }))
    }
}

/// Handler whose main loop makes one request against the application.
pub struct RecordingHandler {
    recorder: Arc<Recorder>,
    app: ApplicationHandle,
}

impl RequestHandler for RecordingHandler {
    fn sockets(&self) -> Vec<SocketDescriptor> {
        vec![SocketDescriptor {
            name: "main".into(),
            address: "test:".into(),
            protocol: "test".into(),
            concurrency: 1,
        }]
    }

    fn main_loop(&mut self) -> Result<(), BootError> {
        let response = self
            .app
            .call(&Env::new())
            .map_err(|e| BootError::Handler(e.to_string()))?;
        self.recorder
            .record(format!("main_loop:{}:{}", response.status, response.body));
        self.recorder.hook("main_loop")
    }

    fn cleanup(&mut self) -> Result<(), BootError> {
        self.recorder.hook("cleanup")
    }
}

/// In-memory response sink.
#[derive(Default)]
pub struct MemorySink(Mutex<Vec<u8>>);

impl MemorySink {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl ResponseSink for MemorySink {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        self.0.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Cloneable in-memory writer for fallback formatter output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
