use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{Classification, ServiceName};
use crate::errors::SprigError;
use crate::status::ServiceState;

//
// ─── SOCKET PATHS ────────────────────────────────────────────────────────

/// Socket path for the trellisd toggle daemon.
pub const TRELLISD_SOCKET_PATH: &str = "/var/run/trellis/trellisd.sock";

/// How long a client waits for trellisd to answer. Toggles block on the
/// dispatcher, so this sits above the dispatcher's own timeout.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

//
// ─── MESSAGES ────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum IpcCommand {
    /// `target` is a UI form identifier (`ssh_toggle`) or a service name.
    Toggle { target: String, force: bool },

    GetStatus,
    GetAlerts,

    Shutdown,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IpcRequest {
    pub command: IpcCommand,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IpcResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl IpcResponse {
    pub fn ok(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self { success: true, message: message.into(), data }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None }
    }
}

/// One row of the service overview.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStatus {
    pub service: ServiceName,
    pub class: Classification,
    /// Executor-reported state; delegated services only.
    pub state: Option<ServiceState>,
    /// Persisted enabled flag; local services only.
    pub enabled: Option<bool>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Warn,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

//
// ─── SERIALIZATION HELPERS ───────────────────────────────────────────────

fn to_line<T: Serialize>(value: &T) -> Result<Vec<u8>, SprigError> {
    let mut vec = serde_json::to_vec(value)?;
    vec.push(b'\n');
    Ok(vec)
}

pub fn serialize_request(req: &IpcRequest) -> Result<Vec<u8>, SprigError> {
    to_line(req)
}

pub fn deserialize_request(buf: &[u8]) -> Result<IpcRequest, SprigError> {
    Ok(serde_json::from_slice(buf)?)
}

pub fn serialize_response(resp: &IpcResponse) -> Result<Vec<u8>, SprigError> {
    to_line(resp)
}

pub fn deserialize_response(buf: &[u8]) -> Result<IpcResponse, SprigError> {
    Ok(serde_json::from_slice(buf)?)
}

//
// ─── IPC TRANSPORT CLIENT ────────────────────────────────────────────

/// Sends an IPC request and waits for a response.
/// Used by `tctl` to talk to `trellisd`.
pub fn send_ipc_request(socket_path: &str, request: &IpcRequest) -> Result<IpcResponse, SprigError> {
    let mut stream = UnixStream::connect(socket_path)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;

    stream.write_all(&serialize_request(request)?)?;

    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;

    if buf.is_empty() {
        return Err(SprigError::Custom("trellisd closed the connection without answering".into()));
    }

    deserialize_response(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_one_json_line() {
        let req = IpcRequest {
            command: IpcCommand::Toggle { target: "ssh_toggle".into(), force: true },
        };
        let bytes = serialize_request(&req).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);

        let back = deserialize_request(&bytes).unwrap();
        assert_eq!(back.command, req.command);
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        assert!(matches!(deserialize_request(b"{not json"), Err(SprigError::Json(_))));
        assert!(deserialize_response(b"").is_err());
    }

    #[test]
    fn status_rows_use_wire_state_names() {
        let row = ServiceStatus {
            service: ServiceName::lookup("cifs").unwrap(),
            class: Classification::Delegated,
            state: Some(ServiceState::Running),
            enabled: None,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["state"], "RUNNING");
        assert_eq!(value["class"], "delegated");
    }

    #[test]
    fn alerts_carry_the_warn_level_only() {
        let alert = Alert { level: AlertLevel::Warn, message: "mps1 mismatch".into() };
        assert_eq!(serde_json::to_value(&alert).unwrap()["level"], "WARN");
        assert!(serde_json::from_str::<Alert>(r#"{"level": "CRIT", "message": "x"}"#).is_err());
    }
}
