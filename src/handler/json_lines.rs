//! JSON-lines request handler.
//!
//! # Data Flow
//! ```text
//! input (one JSON request per line)
//!     → reader thread → mpsc channel
//!     → main loop (select: next line | shutdown)
//!     → semaphore permit (max_concurrency)
//!     → blocking task: app.call(env)
//!     → LockGuard::synchronize → one JSON response line on the sink
//! ```
//!
//! # Wire Format
//! Request: `{"id": "optional", "env": {"PATH_INFO": "/", ...}}`
//! Response: `{"id": "...", "status": 200, "headers": {...}, "body": "..."}`
//!
//! # Design Decisions
//! - Input EOF means the supervisor went away: leave the loop gracefully
//! - In-flight requests are drained before `main_loop` returns
//! - Every response line is written under the shared output lock

use std::io::{self, BufRead, BufReader, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use uuid::Uuid;

use crate::app::{ApplicationHandle, Env, Response};
use crate::config::{StartupOptions, WorkerConfig};
use crate::error::BootError;
use crate::handler::{HandlerFactory, Input, RequestHandler, SocketDescriptor};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::sync::{BlockingMutex, LockGuard};

/// How long `cleanup` waits for runtime threads to stop.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Destination for response lines.
///
/// Individual calls must be thread-safe; whole lines are kept together by the
/// handler's output lock.
pub trait ResponseSink: Send + Sync {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()>;
    fn flush(&self) -> io::Result<()>;
}

impl ResponseSink for io::Stdout {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut out: &io::Stdout = self;
        Write::write_all(&mut out, bytes)
    }

    fn flush(&self) -> io::Result<()> {
        let mut out: &io::Stdout = self;
        Write::flush(&mut out)
    }
}

#[derive(Debug, Deserialize)]
struct WireRequest {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    env: Env,
}

#[derive(Debug, Serialize)]
struct WireResponse<'a> {
    id: &'a str,
    status: u16,
    headers: &'a std::collections::BTreeMap<String, String>,
    body: &'a str,
}

/// Builds [`JsonLinesHandler`]s writing to a shared sink.
pub struct JsonLinesFactory {
    sink: Arc<dyn ResponseSink>,
    shutdown: Shutdown,
    listen_for_signals: bool,
}

impl JsonLinesFactory {
    /// Create a factory whose handlers write to `sink` and stop on `shutdown`.
    pub fn new(sink: Arc<dyn ResponseSink>, shutdown: Shutdown) -> Self {
        Self {
            sink,
            shutdown,
            listen_for_signals: true,
        }
    }

    /// Do not install SIGTERM/SIGINT handlers in the request loop.
    pub fn without_signal_handlers(mut self) -> Self {
        self.listen_for_signals = false;
        self
    }
}

impl HandlerFactory for JsonLinesFactory {
    fn construct(
        &self,
        input: Input,
        options: &StartupOptions,
        app: ApplicationHandle,
    ) -> Result<Box<dyn RequestHandler>, BootError> {
        let config = WorkerConfig::from_options(options)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(2)
            .max_blocking_threads(config.max_concurrency)
            .thread_name("spawn-loader-worker")
            .build()
            .map_err(|e| BootError::Handler(format!("cannot start runtime: {}", e)))?;

        tracing::info!(
            max_concurrency = config.max_concurrency,
            "JSON-lines handler constructed"
        );

        Ok(Box::new(JsonLinesHandler {
            input: Some(input),
            dispatch: Dispatch {
                app,
                sink: self.sink.clone(),
                output_lock: Arc::new(BlockingMutex::new()),
            },
            max_concurrency: config.max_concurrency,
            shutdown: self.shutdown.clone(),
            listen_for_signals: self.listen_for_signals,
            runtime: Some(runtime),
        }))
    }
}

/// Everything a blocking request task needs.
#[derive(Clone)]
struct Dispatch {
    app: ApplicationHandle,
    sink: Arc<dyn ResponseSink>,
    output_lock: Arc<BlockingMutex>,
}

impl Dispatch {
    fn handle_line(&self, line: &str) -> io::Result<()> {
        let (id, response) = match serde_json::from_str::<WireRequest>(line) {
            Ok(request) => {
                let id = request.id.unwrap_or_else(|| Uuid::new_v4().to_string());
                let response = self.call_app(&id, &request.env);
                (id, response)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Malformed request line");
                (Uuid::new_v4().to_string(), Response::new(400, "Bad Request"))
            }
        };

        tracing::debug!(request_id = %id, status = response.status, "Request handled");
        self.write_response(&id, &response)
    }

    fn call_app(&self, id: &str, env: &Env) -> Response {
        match panic::catch_unwind(AssertUnwindSafe(|| self.app.call(env))) {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(request_id = %id, error = %e, "Application error");
                Response::new(500, "Internal Server Error")
            }
            Err(_) => {
                tracing::error!(request_id = %id, "Application panicked");
                Response::new(500, "Internal Server Error")
            }
        }
    }

    fn write_response(&self, id: &str, response: &Response) -> io::Result<()> {
        let wire = WireResponse {
            id,
            status: response.status,
            headers: &response.headers,
            body: &response.body,
        };
        let line = serde_json::to_vec(&wire)?;

        let mut guard = LockGuard::new(self.output_lock.clone());
        guard.synchronize(|_| {
            self.sink.write_all(&line)?;
            self.sink.write_all(b"\n")?;
            self.sink.flush()
        })
    }
}

/// Request handler speaking newline-delimited JSON over a byte stream.
pub struct JsonLinesHandler {
    input: Option<Input>,
    dispatch: Dispatch,
    max_concurrency: usize,
    shutdown: Shutdown,
    listen_for_signals: bool,
    runtime: Option<Runtime>,
}

impl RequestHandler for JsonLinesHandler {
    fn sockets(&self) -> Vec<SocketDescriptor> {
        vec![SocketDescriptor {
            name: "main".to_string(),
            address: "stdio:".to_string(),
            protocol: "json-lines".to_string(),
            concurrency: self.max_concurrency,
        }]
    }

    fn main_loop(&mut self) -> Result<(), BootError> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| BootError::Handler("handler already cleaned up".to_string()))?;
        let input = self
            .input
            .take()
            .ok_or_else(|| BootError::Handler("main loop already ran".to_string()))?;

        let accepted = runtime.block_on(serve(
            input,
            self.dispatch.clone(),
            self.max_concurrency,
            self.shutdown.clone(),
            self.listen_for_signals,
        ))?;

        tracing::info!(requests = accepted, "Main loop finished");
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), BootError> {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
            tracing::info!("Request handler cleaned up");
        }
        Ok(())
    }
}

/// Forward input lines from a blocking reader thread.
fn spawn_line_reader(input: Input) -> Result<mpsc::Receiver<io::Result<String>>, BootError> {
    let (tx, rx) = mpsc::channel(64);
    std::thread::Builder::new()
        .name("spawn-loader-input".to_string())
        .spawn(move || {
            for line in BufReader::new(input).lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })
        .map_err(|e| BootError::Handler(format!("cannot start input reader: {}", e)))?;
    Ok(rx)
}

fn log_finished(result: Result<io::Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Cannot write response"),
        Err(e) => tracing::error!(error = %e, "Request task failed"),
    }
}

async fn serve(
    input: Input,
    dispatch: Dispatch,
    max_concurrency: usize,
    shutdown: Shutdown,
    listen_for_signals: bool,
) -> Result<u64, BootError> {
    let mut stop = shutdown.subscribe();
    if shutdown.is_triggered() {
        return Ok(0);
    }
    if listen_for_signals {
        signals::spawn_listener(shutdown.clone());
    }

    let mut lines = spawn_line_reader(input)?;
    let limit = Arc::new(Semaphore::new(max_concurrency));
    let mut in_flight = JoinSet::new();
    let mut accepted = 0u64;
    let mut outcome = Ok(());

    loop {
        tokio::select! {
            _ = stop.recv() => {
                tracing::info!("Shutdown requested, leaving main loop");
                break;
            }
            line = lines.recv() => match line {
                None => {
                    tracing::info!("Input closed, leaving main loop");
                    break;
                }
                Some(Err(e)) => {
                    outcome = Err(BootError::Handler(format!("cannot read input: {}", e)));
                    break;
                }
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let permit = limit
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|e| BootError::Handler(e.to_string()))?;
                    let dispatch = dispatch.clone();
                    in_flight.spawn_blocking(move || {
                        let _permit = permit;
                        dispatch.handle_line(&line)
                    });
                    accepted += 1;
                }
            }
        }

        while let Some(done) = in_flight.try_join_next() {
            log_finished(done);
        }
    }

    // Drain in-flight requests
    while let Some(done) = in_flight.join_next().await {
        log_finished(done);
    }

    outcome.map(|()| accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppError, Application};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<u8>>);

    impl MemorySink {
        fn lines(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8(bytes.clone())
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
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

    struct EchoPath;

    impl Application for EchoPath {
        fn call(&self, env: &Env) -> Result<Response, AppError> {
            match env.get("PATH_INFO").map(String::as_str) {
                Some("/fail") => Err(AppError("boom".into())),
                Some("/panic") => panic!("application bug"),
                path => Ok(Response::new(200, path.unwrap_or("/"))),
            }
        }
    }

    /// Reader that never yields data until dropped.
    struct Stalled(std::sync::mpsc::Receiver<()>);

    impl io::Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    fn options(concurrency: &str) -> StartupOptions {
        let mut values = BTreeMap::new();
        values.insert("app_root".to_string(), b"/srv/app".to_vec());
        values.insert("max_concurrency".to_string(), concurrency.as_bytes().to_vec());
        StartupOptions::from_supervisor(values)
    }

    fn handler(input: Input, shutdown: Shutdown) -> (Arc<MemorySink>, Box<dyn RequestHandler>) {
        let sink = Arc::new(MemorySink::default());
        let factory = JsonLinesFactory::new(sink.clone(), shutdown).without_signal_handlers();
        let handler = factory
            .construct(input, &options("4"), Arc::new(EchoPath))
            .unwrap();
        (sink, handler)
    }

    #[test]
    fn test_serves_until_input_closes() {
        let input = "{\"id\":\"a\",\"env\":{\"PATH_INFO\":\"/one\"}}\n\n{\"id\":\"b\",\"env\":{\"PATH_INFO\":\"/two\"}}\n";
        let (sink, mut handler) = handler(Box::new(io::Cursor::new(input)), Shutdown::new());

        handler.main_loop().unwrap();
        handler.cleanup().unwrap();

        let mut lines = sink.lines();
        lines.sort_by_key(|l| l["id"].as_str().unwrap().to_string());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], "a");
        assert_eq!(lines[0]["body"], "/one");
        assert_eq!(lines[1]["status"], 200);
        assert_eq!(lines[1]["body"], "/two");
    }

    #[test]
    fn test_missing_id_gets_uuid() {
        let input = "{\"env\":{}}\n";
        let (sink, mut handler) = handler(Box::new(io::Cursor::new(input)), Shutdown::new());
        handler.main_loop().unwrap();

        let lines = sink.lines();
        let id = lines[0]["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_bad_requests_and_app_failures() {
        let input = "not json\n{\"env\":{\"PATH_INFO\":\"/fail\"}}\n{\"env\":{\"PATH_INFO\":\"/panic\"}}\n";
        let (sink, mut handler) = handler(Box::new(io::Cursor::new(input)), Shutdown::new());
        handler.main_loop().unwrap();

        let mut statuses: Vec<u64> = sink
            .lines()
            .iter()
            .map(|l| l["status"].as_u64().unwrap())
            .collect();
        statuses.sort();
        assert_eq!(statuses, vec![400, 500, 500]);
    }

    #[test]
    fn test_shutdown_ends_loop_with_open_input() {
        let (_keep_open, rx) = std::sync::mpsc::channel();
        let shutdown = Shutdown::new();
        let (_sink, mut handler) = handler(Box::new(Stalled(rx)), shutdown.clone());

        let trigger = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            shutdown.trigger();
        });

        handler.main_loop().unwrap();
        trigger.join().unwrap();
        handler.cleanup().unwrap();
    }

    #[test]
    fn test_main_loop_runs_once() {
        let (_sink, mut handler) = handler(Box::new(io::empty()), Shutdown::new());
        handler.main_loop().unwrap();
        assert!(matches!(handler.main_loop(), Err(BootError::Handler(_))));
    }

    #[test]
    fn test_advertises_stdio_socket() {
        let (_sink, handler) = handler(Box::new(io::empty()), Shutdown::new());
        let sockets = handler.sockets();
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].protocol, "json-lines");
        assert_eq!(sockets[0].concurrency, 4);
    }
}
