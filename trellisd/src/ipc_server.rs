use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};

use sprig::catalog;
use sprig::errors::SprigError;
use sprig::ipc::{deserialize_request, serialize_response, Alert, IpcCommand, IpcResponse};
use sprig::log::Loggers;
use sprig::status::LogLevel;

use crate::controller::ToggleController;
use crate::executor::TaskExecutor;
use crate::store::ConfigStore;

pub type AlertSource = fn() -> Result<Vec<Alert>, SprigError>;

/// Turns IPC commands into controller calls.
pub struct RequestHandler<E: TaskExecutor, S: ConfigStore> {
    controller: ToggleController<E, S>,
    alerts: AlertSource,
    loggers: Loggers,
    in_flight: Arc<Mutex<()>>,
}

impl<E: TaskExecutor, S: ConfigStore> RequestHandler<E, S> {
    pub fn new(controller: ToggleController<E, S>, alerts: AlertSource, loggers: Loggers) -> Self {
        Self {
            controller,
            alerts,
            loggers,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Held from reading a request until its response is written. Whoever
    /// wants to stop the process takes it first so no toggle is cut off
    /// halfway.
    pub fn in_flight(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.in_flight)
    }

    /// Returns the response and whether the daemon should stop afterwards.
    pub fn handle(&mut self, command: IpcCommand) -> (IpcResponse, bool) {
        match command {
            IpcCommand::Toggle { target, force } => (self.toggle(&target, force), false),
            IpcCommand::GetStatus => {
                let response = match self.controller.overview() {
                    Ok(rows) => to_response(format!("{} services", rows.len()), &rows),
                    Err(e) => {
                        self.loggers.log(LogLevel::Fail, &format!("Service overview failed: {}", e));
                        IpcResponse::err(e.to_string())
                    }
                };
                (response, false)
            }
            IpcCommand::GetAlerts => {
                let response = match (self.alerts)() {
                    Ok(alerts) => to_response(format!("{} alert(s)", alerts.len()), &alerts),
                    Err(e) => {
                        self.loggers.log(LogLevel::Fail, &format!("Alert checks failed: {}", e));
                        IpcResponse::err(e.to_string())
                    }
                };
                (response, false)
            }
            IpcCommand::Shutdown => {
                self.loggers.log(LogLevel::Info, "Shutdown requested over IPC");
                (IpcResponse::ok("Shutdown initiated", None), true)
            }
        }
    }

    fn toggle(&mut self, target: &str, force: bool) -> IpcResponse {
        let service = match catalog::resolve(target) {
            Ok(service) => service,
            Err(e) => {
                self.loggers.log(
                    LogLevel::Fail,
                    &format!("Toggle target '{}' is not in the service catalog", target),
                );
                return IpcResponse::err(e.to_string());
            }
        };

        match self.controller.toggle(service.as_str(), force) {
            Ok(result) => {
                let message = match result.message() {
                    Some(msg) => msg.to_string(),
                    None => format!(
                        "{} is now {}",
                        result.service(),
                        result.status().map(|s| s.as_str()).unwrap_or("unchanged")
                    ),
                };
                let mut response = to_response(message, &result);
                response.success = response.success && !result.is_error();
                response
            }
            Err(e) => IpcResponse::err(e.to_string()),
        }
    }
}

fn to_response<T: serde::Serialize>(message: String, data: &T) -> IpcResponse {
    match serde_json::to_value(data) {
        Ok(value) => IpcResponse::ok(message, Some(value)),
        Err(e) => IpcResponse::err(format!("Failed to encode response: {}", e)),
    }
}

pub fn run_ipc_server<E: TaskExecutor, S: ConfigStore>(
    socket_path: &str,
    mut handler: RequestHandler<E, S>,
    loggers: Loggers,
    ready_tx: Option<mpsc::Sender<()>>,
) -> Result<(), SprigError> {
    let path = Path::new(socket_path);

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    if path.exists() {
        fs::remove_file(path)?;
    }

    let listener = UnixListener::bind(path)?;
    loggers.log(LogLevel::Info, &format!("trellisd IPC server listening on {}", socket_path));

    if let Some(tx) = ready_tx {
        let _ = tx.send(());
    }

    for stream_result in listener.incoming() {
        match stream_result {
            Ok(mut stream) => match handle_client(&mut stream, &mut handler) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => loggers.log(LogLevel::Fail, &format!("Error handling IPC client: {}", e)),
            },
            Err(e) => loggers.log(LogLevel::Fail, &format!("Failed to accept IPC connection: {}", e)),
        }
    }

    let _ = fs::remove_file(path);
    Ok(())
}

/// Serve one request. Returns true when the client asked for shutdown.
fn handle_client<E: TaskExecutor, S: ConfigStore>(
    stream: &mut UnixStream,
    handler: &mut RequestHandler<E, S>,
) -> Result<bool, SprigError> {
    let reader = BufReader::new(stream.try_clone()?);
    serve_request(reader, stream, handler)
}

fn serve_request<E: TaskExecutor, S: ConfigStore>(
    mut reader: impl BufRead,
    writer: &mut impl Write,
    handler: &mut RequestHandler<E, S>,
) -> Result<bool, SprigError> {
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;

    let request = match deserialize_request(&buf) {
        Ok(req) => req,
        Err(_) => {
            let _ = writer.write_all(&serialize_response(&IpcResponse::err("Invalid IPC request"))?);
            return Ok(false);
        }
    };

    let in_flight = handler.in_flight();
    let _guard = in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let (response, shutdown) = handler.handle(request.command);
    writer.write_all(&serialize_response(&response)?)?;
    writer.flush()?;

    Ok(shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::thread;

    use sprig::ipc::{send_ipc_request, serialize_request, AlertLevel, IpcRequest};
    use sprig::status::{DesiredStatus, ServiceState};
    use sprig::toggle::ToggleResult;

    use crate::testutil::{quiet_loggers, FakeExecutor, RecordingStore};

    fn no_alerts() -> Result<Vec<Alert>, SprigError> {
        Ok(Vec::new())
    }

    fn one_alert() -> Result<Vec<Alert>, SprigError> {
        Ok(vec![Alert { level: AlertLevel::Warn, message: "mps0 mismatch".into() }])
    }

    fn handler(executor: FakeExecutor, alerts: AlertSource) -> RequestHandler<FakeExecutor, RecordingStore> {
        let controller = ToggleController::new(executor, RecordingStore::default(), quiet_loggers());
        RequestHandler::new(controller, alerts, quiet_loggers())
    }

    #[test]
    fn toggle_accepts_form_identifiers() {
        let executor = FakeExecutor::default().with_state("sshd", ServiceState::Stopped);
        let mut handler = handler(executor, no_alerts);

        let (response, shutdown) = handler.handle(IpcCommand::Toggle { target: "ssh_toggle".into(), force: false });

        assert!(!shutdown);
        assert!(response.success);
        assert_eq!(response.message, "sshd is now on");
        let result: ToggleResult = serde_json::from_value(response.data.unwrap()).unwrap();
        assert_eq!(result.status(), Some(DesiredStatus::On));
    }

    #[test]
    fn error_results_are_unsuccessful_but_carry_data() {
        let executor = FakeExecutor::default().with_state("nfs", ServiceState::Unknown);
        let mut handler = handler(executor, no_alerts);

        let (response, _) = handler.handle(IpcCommand::Toggle { target: "nfs".into(), force: false });

        assert!(!response.success);
        assert_eq!(response.message, "Service state unknown");
        let data = response.data.unwrap();
        assert_eq!(data["error"], true);
        assert_eq!(data["status"], serde_json::Value::Null);
    }

    #[test]
    fn unknown_targets_fail_without_data() {
        let executor = FakeExecutor::default();
        let mut handler = handler(executor.clone(), no_alerts);

        let (response, _) = handler.handle(IpcCommand::Toggle { target: "bogus_toggle".into(), force: false });

        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message, "Unknown service 'bogus_toggle'");
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn alerts_are_returned_as_data() {
        let mut handler = handler(FakeExecutor::default(), one_alert);
        let (response, _) = handler.handle(IpcCommand::GetAlerts);

        let alerts: Vec<Alert> = serde_json::from_value(response.data.unwrap()).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(response.message, "1 alert(s)");
    }

    /// Fails the write if the request lock is not held at that moment.
    struct LockCheckingWriter {
        in_flight: Arc<Mutex<()>>,
        written: Vec<u8>,
    }

    impl Write for LockCheckingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.in_flight.try_lock().is_ok() {
                return Err(std::io::Error::other("response written without the request lock"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn response_is_written_under_the_request_lock() {
        let executor = FakeExecutor::default().with_state("afp", ServiceState::Stopped);
        let mut handler = handler(executor, no_alerts);
        let mut writer = LockCheckingWriter { in_flight: handler.in_flight(), written: Vec::new() };

        let request = serialize_request(&IpcRequest {
            command: IpcCommand::Toggle { target: "afp_toggle".into(), force: false },
        })
        .unwrap();
        let shutdown = serve_request(Cursor::new(request), &mut writer, &mut handler).unwrap();

        assert!(!shutdown);
        let response = sprig::ipc::deserialize_response(&writer.written).unwrap();
        assert_eq!(response.message, "afp is now on");
        assert!(handler.in_flight().try_lock().is_ok());
    }

    #[test]
    fn serves_requests_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("run/trellisd.sock").to_string_lossy().into_owned();
        let executor = FakeExecutor::default().with_state("webdav", ServiceState::Running);
        let handler = handler(executor, no_alerts);

        let (ready_tx, ready_rx) = mpsc::channel();
        let server_socket = socket.clone();
        let server = thread::spawn(move || run_ipc_server(&server_socket, handler, quiet_loggers(), Some(ready_tx)));
        ready_rx.recv().unwrap();

        let toggle = IpcRequest {
            command: IpcCommand::Toggle { target: "webdav_toggle".into(), force: false },
        };
        let response = send_ipc_request(&socket, &toggle).unwrap();
        assert!(response.success);
        assert_eq!(response.message, "webdav is now off");

        let response = send_ipc_request(&socket, &IpcRequest { command: IpcCommand::Shutdown }).unwrap();
        assert!(response.success);

        server.join().unwrap().unwrap();
        assert!(!Path::new(&socket).exists());
    }
}
