use std::collections::HashMap;

use sprig::catalog::{Classification, ServiceName};
use sprig::errors::SprigError;
use sprig::ipc::ServiceStatus;
use sprig::log::Loggers;
use sprig::status::{Action, DesiredStatus, LogLevel, ServiceState};
use sprig::time::ProcessTimer;
use sprig::toggle::ToggleResult;

use crate::executor::{ServiceSettings, TaskExecutor, TaskOutcome};
use crate::store::{ConfigStore, StartState};

pub const STATE_UNKNOWN_MESSAGE: &str = "Service state unknown";
pub const COULD_NOT_STOP_MESSAGE: &str = "The service could not be stopped.";
pub const COULD_NOT_START_MESSAGE: &str = "The service could not be started.";

/// Flips services on and off, one request at a time.
///
/// Delegated services go through the task executor (`manage`, then
/// `configure`); local services go through the configuration store, whose
/// save step does the starting and stopping.
pub struct ToggleController<E: TaskExecutor, S: ConfigStore> {
    executor: E,
    store: S,
    loggers: Loggers,
}

impl<E: TaskExecutor, S: ConfigStore> ToggleController<E, S> {
    pub fn new(executor: E, store: S, loggers: Loggers) -> Self {
        Self { executor, store, loggers }
    }

    /// Toggle `name`. Only an uncatalogued name is an `Err`, and it is
    /// returned before either collaborator is called; every other failure
    /// comes back as an error result.
    pub fn toggle(&mut self, name: &str, force: bool) -> Result<ToggleResult, SprigError> {
        let service = ServiceName::lookup(name)?;
        let timer = ProcessTimer::start();

        self.loggers.file_only(
            LogLevel::Info,
            &format!("Toggle requested for {} (force={})", service, force),
        );

        let result = match service.classification() {
            Classification::Delegated => self.toggle_delegated(service),
            Classification::Local => self.toggle_local(service, force),
        };

        match (result.is_error(), result.status()) {
            (false, Some(status)) => self.loggers.timed(
                LogLevel::Ok,
                &format!("{} is now {}", service, status.as_str()),
                timer.elapsed(),
            ),
            _ => self.loggers.timed(
                LogLevel::Fail,
                &format!("Toggling {} failed: {}", service, result.message().unwrap_or_default()),
                timer.elapsed(),
            ),
        }

        Ok(result)
    }

    fn toggle_delegated(&mut self, service: ServiceName) -> ToggleResult {
        let state = match self.executor.query(service) {
            Ok(state) => state,
            Err(e) => {
                self.loggers.log(LogLevel::Fail, &format!("Querying {} failed: {}", service, e));
                return ToggleResult::from_error(service, None, &e);
            }
        };

        let (action, status) = match state {
            ServiceState::Running => (Action::Stop, DesiredStatus::Off),
            ServiceState::Stopped => (Action::Start, DesiredStatus::On),
            ServiceState::Unknown => {
                self.loggers.log(
                    LogLevel::Fail,
                    &format!("Unexpected service state for {}: {}", service, state.as_str()),
                );
                return ToggleResult::failure(service, None, STATE_UNKNOWN_MESSAGE);
            }
        };

        self.loggers.file_only(
            LogLevel::Info,
            &format!("Submitting service.manage {} {}", service, action.as_str()),
        );
        if let Err(e) = self.executor.manage(service, action).and_then(TaskOutcome::into_result) {
            return ToggleResult::from_error(service, None, &e);
        }

        let settings = ServiceSettings { enable: status.is_on() };
        if let Err(e) = self.executor.configure(service, settings).and_then(TaskOutcome::into_result) {
            // The process already changed state; only the enable flag is stale.
            self.loggers.log(
                LogLevel::Warn,
                &format!(
                    "{} was {} but saving enable={} failed: {}",
                    service,
                    if status.is_on() { "started" } else { "stopped" },
                    settings.enable,
                    e
                ),
            );
            return ToggleResult::from_error(service, Some(status), &e);
        }

        ToggleResult::success(service, status)
    }

    fn toggle_local(&mut self, service: ServiceName, force: bool) -> ToggleResult {
        let mut record = match self.store.get_or_create(service) {
            Ok(record) => record,
            Err(e) => return ToggleResult::from_error(service, None, &e),
        };

        let was_enabled = record.enable;
        record.enable = !was_enabled;

        if let Err(e) = self.store.validate(&record, force) {
            self.loggers.log(LogLevel::Warn, &format!("Refusing to toggle {}: {}", service, e));
            return ToggleResult::from_error(service, None, &e);
        }

        let outcome = match self.store.save(&record, force) {
            Ok(outcome) => outcome,
            Err(e) => return ToggleResult::from_error(service, None, &e),
        };

        let (status, violation) = match outcome.started {
            StartState::Started => (DesiredStatus::On, was_enabled.then_some(COULD_NOT_STOP_MESSAGE)),
            StartState::Stopped => (DesiredStatus::Off, (!was_enabled).then_some(COULD_NOT_START_MESSAGE)),
            StartState::Unspecified => (DesiredStatus::from_enabled(record.enable), None),
        };

        let result = match violation {
            Some(message) => {
                let err = SprigError::ConsistencyViolation(message.to_string());
                self.loggers.log(LogLevel::Warn, &format!("{}: {}", service, err));
                ToggleResult::from_error(service, Some(status), &err)
            }
            None => ToggleResult::success(service, status),
        };

        result.with_side_effects(outcome.enabled, outcome.disabled, outcome.events)
    }

    /// Executor state for every delegated service and the enabled flag of
    /// every local one, in catalog order. Local services without a record get
    /// one created.
    pub fn overview(&mut self) -> Result<Vec<ServiceStatus>, SprigError> {
        let states: HashMap<String, ServiceState> = self.executor.query_all()?.into_iter().collect();
        let persisted: HashMap<ServiceName, bool> = self
            .store
            .records()?
            .into_iter()
            .map(|record| (record.service, record.enable))
            .collect();

        let mut rows = Vec::new();
        for service in ServiceName::all() {
            rows.push(match service.classification() {
                Classification::Delegated => ServiceStatus {
                    service,
                    class: Classification::Delegated,
                    state: Some(states.get(service.as_str()).copied().unwrap_or(ServiceState::Unknown)),
                    enabled: None,
                },
                Classification::Local => ServiceStatus {
                    service,
                    class: Classification::Local,
                    state: None,
                    enabled: Some(match persisted.get(&service) {
                        Some(enable) => *enable,
                        None => self.store.get_or_create(service)?.enable,
                    }),
                },
            });
        }
        Ok(rows)
    }
}
