use serde::{Deserialize, Serialize};

use sprig::catalog::ServiceName;
use sprig::errors::SprigError;
use sprig::status::{Action, ServiceState};

/// Terminal state of a dispatcher task. Only `FINISHED` counts as success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    Finished,
    Other(String),
}

impl From<String> for TaskState {
    fn from(s: String) -> Self {
        if s == "FINISHED" { TaskState::Finished } else { TaskState::Other(s) }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Finished => "FINISHED".to_string(),
            TaskState::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub state: TaskState,
    #[serde(default)]
    pub error: Option<TaskError>,
}

impl TaskOutcome {
    pub fn finished() -> Self {
        Self { state: TaskState::Finished, error: None }
    }

    pub fn failed(state: &str, message: impl Into<String>) -> Self {
        Self {
            state: TaskState::Other(state.to_string()),
            error: Some(TaskError { message: message.into() }),
        }
    }

    /// `Ok` when the task finished, otherwise `TaskFailed` with the executor's
    /// error text as-is.
    pub fn into_result(self) -> Result<(), SprigError> {
        match self.state {
            TaskState::Finished => Ok(()),
            TaskState::Other(state) => {
                let message = match self.error {
                    Some(err) if !err.message.is_empty() => err.message,
                    _ => format!("Task ended in state {}", state),
                };
                Err(SprigError::TaskFailed(message))
            }
        }
    }
}

/// Settings sent with `service.configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub enable: bool,
}

/// The middleware that actually starts and stops delegated services.
///
/// Every call blocks until the executor reports a terminal outcome; timeouts
/// belong to the implementation.
pub trait TaskExecutor {
    fn query(&mut self, service: ServiceName) -> Result<ServiceState, SprigError>;

    /// State of every service the executor knows about, by name.
    fn query_all(&mut self) -> Result<Vec<(String, ServiceState)>, SprigError>;

    fn manage(&mut self, service: ServiceName, action: Action) -> Result<TaskOutcome, SprigError>;

    fn configure(&mut self, service: ServiceName, settings: ServiceSettings) -> Result<TaskOutcome, SprigError>;
}
