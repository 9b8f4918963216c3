//! Recording fakes for the executor, store and launcher seams.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sprig::catalog::ServiceName;
use sprig::errors::SprigError;
use sprig::log::{ConsoleLogger, FileLogger, Loggers};
use sprig::status::{Action, LogLevel, ServiceState};

use crate::executor::{ServiceSettings, TaskExecutor, TaskOutcome};
use crate::launcher::Launcher;
use crate::store::{ConfigStore, SaveOutcome, ServiceRecord};

#[derive(Clone, Default)]
pub struct LogSink {
    lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl LogSink {
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().unwrap().clone()
    }
}

impl ConsoleLogger for LogSink {
    fn message(&mut self, _level: LogLevel, _message: &str, _duration: Duration) {}
    fn banner(&mut self, _message: &str) {}
}

impl FileLogger for LogSink {
    fn log(&mut self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }

    fn initialize(&mut self, _console_logger: &mut dyn ConsoleLogger) -> Result<(), SprigError> {
        Ok(())
    }
}

pub fn quiet_loggers() -> Loggers {
    capturing_loggers().0
}

pub fn capturing_loggers() -> (Loggers, LogSink) {
    let sink = LogSink::default();
    let loggers = Loggers::new(
        Arc::new(Mutex::new(LogSink::default())),
        Arc::new(Mutex::new(sink.clone())),
    );
    (loggers, sink)
}

// === LAUNCHER ===

#[derive(Default)]
struct LauncherState {
    running: BTreeSet<String>,
    calls: Vec<String>,
    failing_start: BTreeSet<String>,
    failing_stop: BTreeSet<String>,
    failing_status: BTreeSet<String>,
}

/// Keeps a set of running services; clones share state.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl FakeLauncher {
    pub fn failing_start(self, name: &str) -> Self {
        self.state.lock().unwrap().failing_start.insert(name.to_string());
        self
    }

    pub fn failing_stop(self, name: &str) -> Self {
        self.state.lock().unwrap().failing_stop.insert(name.to_string());
        self
    }

    pub fn failing_status(self, name: &str) -> Self {
        self.state.lock().unwrap().failing_status.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

impl Launcher for FakeLauncher {
    fn start(&mut self, service: ServiceName) -> Result<(), SprigError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("start {}", service));
        if state.failing_start.contains(service.as_str()) {
            return Err(SprigError::Custom("exit status: 1".into()));
        }
        state.running.insert(service.as_str().to_string());
        Ok(())
    }

    fn stop(&mut self, service: ServiceName) -> Result<(), SprigError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("stop {}", service));
        if state.failing_stop.contains(service.as_str()) {
            return Err(SprigError::Custom("exit status: 1".into()));
        }
        state.running.remove(service.as_str());
        Ok(())
    }

    fn is_running(&mut self, service: ServiceName) -> Result<bool, SprigError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("status {}", service));
        if state.failing_status.contains(service.as_str()) {
            return Err(SprigError::Custom("onestatus timed out".into()));
        }
        Ok(state.running.contains(service.as_str()))
    }
}

// === EXECUTOR ===

#[derive(Default)]
struct ExecutorState {
    states: Vec<(String, ServiceState)>,
    manage_outcomes: VecDeque<TaskOutcome>,
    configure_outcomes: VecDeque<TaskOutcome>,
    query_error: Option<String>,
    calls: Vec<String>,
}

/// Reports per-service states and flips them when a `manage` task finishes.
/// Queued outcomes override the default `FINISHED`.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<ExecutorState>>,
}

impl FakeExecutor {
    pub fn with_state(self, name: &str, state: ServiceState) -> Self {
        {
            let mut inner = self.state.lock().unwrap();
            inner.states.retain(|(n, _)| n != name);
            inner.states.push((name.to_string(), state));
        }
        self
    }

    pub fn manage_outcome(self, outcome: TaskOutcome) -> Self {
        self.state.lock().unwrap().manage_outcomes.push_back(outcome);
        self
    }

    pub fn configure_outcome(self, outcome: TaskOutcome) -> Self {
        self.state.lock().unwrap().configure_outcomes.push_back(outcome);
        self
    }

    pub fn query_error(self, message: &str) -> Self {
        self.state.lock().unwrap().query_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn state_of(&self, name: &str) -> ServiceState {
        let inner = self.state.lock().unwrap();
        inner
            .states
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| *s)
            .unwrap_or(ServiceState::Unknown)
    }
}

impl TaskExecutor for FakeExecutor {
    fn query(&mut self, service: ServiceName) -> Result<ServiceState, SprigError> {
        let error = {
            let mut inner = self.state.lock().unwrap();
            inner.calls.push(format!("query {}", service));
            inner.query_error.clone()
        };
        if let Some(message) = error {
            return Err(SprigError::Custom(message));
        }
        Ok(self.state_of(service.as_str()))
    }

    fn query_all(&mut self) -> Result<Vec<(String, ServiceState)>, SprigError> {
        let mut inner = self.state.lock().unwrap();
        inner.calls.push("query_all".to_string());
        if let Some(message) = inner.query_error.clone() {
            return Err(SprigError::Custom(message));
        }
        Ok(inner.states.clone())
    }

    fn manage(&mut self, service: ServiceName, action: Action) -> Result<TaskOutcome, SprigError> {
        let mut inner = self.state.lock().unwrap();
        inner.calls.push(format!("manage {} {}", service, action.as_str()));
        let outcome = inner.manage_outcomes.pop_front().unwrap_or_else(TaskOutcome::finished);

        if outcome.clone().into_result().is_ok() {
            let new_state = match action {
                Action::Start => ServiceState::Running,
                Action::Stop => ServiceState::Stopped,
            };
            inner.states.retain(|(n, _)| n != service.as_str());
            inner.states.push((service.as_str().to_string(), new_state));
        }
        Ok(outcome)
    }

    fn configure(&mut self, service: ServiceName, settings: ServiceSettings) -> Result<TaskOutcome, SprigError> {
        let mut inner = self.state.lock().unwrap();
        inner.calls.push(format!("configure {} enable={}", service, settings.enable));
        Ok(inner.configure_outcomes.pop_front().unwrap_or_else(TaskOutcome::finished))
    }
}

// === STORE ===

#[derive(Default)]
struct StoreState {
    calls: Vec<String>,
    outcome: Option<SaveOutcome>,
}

/// Store that records every call. `save` fails unless an outcome is queued.
#[derive(Clone, Default)]
pub struct RecordingStore {
    state: Arc<Mutex<StoreState>>,
}

impl RecordingStore {
    pub fn save_outcome(self, outcome: SaveOutcome) -> Self {
        self.state.lock().unwrap().outcome = Some(outcome);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl ConfigStore for RecordingStore {
    fn get_or_create(&mut self, service: ServiceName) -> Result<ServiceRecord, SprigError> {
        self.record(format!("get_or_create {}", service));
        Ok(ServiceRecord::new(service))
    }

    fn records(&mut self) -> Result<Vec<ServiceRecord>, SprigError> {
        self.record("records".to_string());
        Ok(Vec::new())
    }

    fn validate(&mut self, record: &ServiceRecord, _force: bool) -> Result<(), SprigError> {
        self.record(format!("validate {}", record.service));
        Ok(())
    }

    fn save(&mut self, record: &ServiceRecord, _force: bool) -> Result<SaveOutcome, SprigError> {
        self.record(format!("save {} enable={}", record.service, record.enable));
        self.state
            .lock()
            .unwrap()
            .outcome
            .clone()
            .ok_or_else(|| SprigError::Custom("RecordingStore has no save outcome".into()))
    }
}
