use serde::{Deserialize, Serialize};

/// Running state of a service as reported by the task executor.
///
/// Anything other than `RUNNING` or `STOPPED` on the wire is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceState {
    Running,
    Stopped,
    Unknown,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Running => "RUNNING",
            ServiceState::Stopped => "STOPPED",
            ServiceState::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for ServiceState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "RUNNING" => ServiceState::Running,
            "STOPPED" => ServiceState::Stopped,
            _ => ServiceState::Unknown,
        }
    }
}

impl From<ServiceState> for String {
    fn from(state: ServiceState) -> Self {
        state.as_str().to_string()
    }
}

/// Status a toggle is driving the service towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredStatus {
    On,
    Off,
}

impl DesiredStatus {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { DesiredStatus::On } else { DesiredStatus::Off }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, DesiredStatus::On)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredStatus::On => "on",
            DesiredStatus::Off => "off",
        }
    }
}

/// Service-management operation sent to the task executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Stop,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
        }
    }
}

/// Log levels to control verbosity of logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Fail,
    Ok,
}
