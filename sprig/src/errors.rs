use std::fmt;

#[derive(Debug)]
pub enum SprigError {
    Io(std::io::Error),
    Parse(String),
    Json(serde_json::Error),

    /// Name is not in the service catalog.
    UnknownService(String),
    /// The record change was rejected before anything was saved.
    ValidationFailed(String),
    /// A task executor call did not reach a successful terminal state.
    TaskFailed(String),
    /// Post-save state contradicts the requested direction.
    ConsistencyViolation(String),

    Custom(String),
}

impl SprigError {
    /// Text suitable for the `message` field of a toggle result.
    pub fn user_message(&self) -> String {
        match self {
            SprigError::ValidationFailed(msg)
            | SprigError::TaskFailed(msg)
            | SprigError::ConsistencyViolation(msg)
            | SprigError::Custom(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for SprigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SprigError::Io(e) => write!(f, "IO error: {}", e),
            SprigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SprigError::Json(e) => write!(f, "JSON error: {}", e),
            SprigError::UnknownService(name) => write!(f, "Unknown service '{}'", name),
            SprigError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            SprigError::TaskFailed(msg) => write!(f, "Task failed: {}", msg),
            SprigError::ConsistencyViolation(msg) => write!(f, "Consistency violation: {}", msg),
            SprigError::Custom(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for SprigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SprigError::Io(e) => Some(e),
            SprigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SprigError {
    fn from(err: std::io::Error) -> SprigError {
        SprigError::Io(err)
    }
}

impl From<serde_json::Error> for SprigError {
    fn from(err: serde_json::Error) -> SprigError {
        SprigError::Json(err)
    }
}

impl From<toml::de::Error> for SprigError {
    fn from(err: toml::de::Error) -> SprigError {
        SprigError::Parse(err.to_string())
    }
}
