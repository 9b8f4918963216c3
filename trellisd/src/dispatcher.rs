use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use sprig::catalog::ServiceName;
use sprig::config::DispatcherConfig;
use sprig::errors::SprigError;
use sprig::status::{Action, ServiceState};

use crate::executor::{ServiceSettings, TaskError, TaskExecutor, TaskOutcome};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchRequest {
    /// Plain RPC, answered immediately.
    Call { method: String, args: Value },
    /// Task submission; the reply only comes once the task is terminal.
    Task { task: String, args: Value },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchReply {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<TaskError>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    name: String,
    state: ServiceState,
}

/// Task executor backed by the middleware dispatcher's Unix socket.
/// One connection per call, one JSON line each way.
pub struct DispatcherClient {
    socket_path: String,
    timeout: Duration,
}

impl DispatcherClient {
    pub fn new(config: &DispatcherConfig) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn round_trip(&self, request: &DispatchRequest) -> Result<DispatchReply, SprigError> {
        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        stream.write_all(&line)?;

        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        reader.read_until(b'\n', &mut buf)?;

        if buf.is_empty() {
            return Err(SprigError::Custom(format!(
                "Dispatcher at {} closed the connection without replying",
                self.socket_path
            )));
        }

        Ok(serde_json::from_slice(&buf)?)
    }

    fn call(&self, method: &str, args: Value) -> Result<Value, SprigError> {
        let reply = self.round_trip(&DispatchRequest::Call {
            method: method.to_string(),
            args,
        })?;

        match reply.error {
            Some(err) => Err(SprigError::Custom(format!("{} failed: {}", method, err.message))),
            None => Ok(reply.result),
        }
    }

    fn task(&self, task: &str, args: Value) -> Result<TaskOutcome, SprigError> {
        let reply = self.round_trip(&DispatchRequest::Task {
            task: task.to_string(),
            args,
        })?;

        // A refused submission never produced a task; its text is the failure.
        if let Some(err) = reply.error {
            return Err(SprigError::TaskFailed(err.message));
        }

        Ok(serde_json::from_value(reply.result)?)
    }
}

impl TaskExecutor for DispatcherClient {
    fn query(&mut self, service: ServiceName) -> Result<ServiceState, SprigError> {
        let result = self.call(
            "services.query",
            json!([[["name", "=", service.as_str()]], {"single": true}]),
        )?;

        if result.is_null() {
            return Ok(ServiceState::Unknown);
        }

        let entry: ServiceEntry = serde_json::from_value(result)?;
        Ok(entry.state)
    }

    fn query_all(&mut self) -> Result<Vec<(String, ServiceState)>, SprigError> {
        let result = self.call("services.query", json!([]))?;
        let entries: Vec<ServiceEntry> = serde_json::from_value(result)?;

        Ok(entries.into_iter().map(|e| (e.name, e.state)).collect())
    }

    fn manage(&mut self, service: ServiceName, action: Action) -> Result<TaskOutcome, SprigError> {
        self.task("service.manage", json!([service.as_str(), action.as_str()]))
    }

    fn configure(&mut self, service: ServiceName, settings: ServiceSettings) -> Result<TaskOutcome, SprigError> {
        self.task("service.configure", json!([service.as_str(), settings]))
    }
}
