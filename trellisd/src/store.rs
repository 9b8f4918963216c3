use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sprig::catalog::ServiceName;
use sprig::config::StoreConfig;
use sprig::errors::SprigError;
use sprig::log::Loggers;
use sprig::status::LogLevel;

use crate::launcher::Launcher;

/// Persisted settings for one locally managed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service: ServiceName,
    pub enable: bool,
}

impl ServiceRecord {
    pub fn new(service: ServiceName) -> Self {
        Self { service, enable: false }
    }
}

/// What the save step did to the service's process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartState {
    /// The service is running after the save.
    Started,
    /// The service is not running after the save.
    Stopped,
    /// No start or stop was attempted; only the record was written.
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub started: StartState,
    pub enabled: Vec<ServiceName>,
    pub disabled: Vec<ServiceName>,
    pub events: Vec<String>,
}

impl SaveOutcome {
    fn record_only() -> Self {
        Self {
            started: StartState::Unspecified,
            enabled: Vec::new(),
            disabled: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Persistence for locally managed services.
pub trait ConfigStore {
    /// The service's record, created disabled on first access.
    fn get_or_create(&mut self, service: ServiceName) -> Result<ServiceRecord, SprigError>;

    fn records(&mut self) -> Result<Vec<ServiceRecord>, SprigError>;

    /// Reject a change before anything is written or launched.
    fn validate(&mut self, record: &ServiceRecord, force: bool) -> Result<(), SprigError>;

    /// Commit the record and bring the service (and whatever depends on it)
    /// in line with its enabled flag.
    fn save(&mut self, record: &ServiceRecord, force: bool) -> Result<SaveOutcome, SprigError>;
}

/// JSON-file store that starts and stops services through a [`Launcher`].
pub struct FileStore<L: Launcher> {
    path: PathBuf,
    requires: BTreeMap<ServiceName, Vec<ServiceName>>,
    launcher: L,
    loggers: Loggers,
}

impl<L: Launcher> FileStore<L> {
    pub fn new(config: &StoreConfig, launcher: L, loggers: Loggers) -> Result<Self, SprigError> {
        let mut requires = BTreeMap::new();
        for (service, deps) in &config.requires {
            let deps = deps
                .iter()
                .map(|d| ServiceName::lookup(d))
                .collect::<Result<Vec<_>, _>>()?;
            requires.insert(ServiceName::lookup(service)?, deps);
        }

        Ok(Self {
            path: PathBuf::from(&config.path),
            requires,
            launcher,
            loggers,
        })
    }

    fn load(&self) -> Result<BTreeMap<ServiceName, bool>, SprigError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read(&self.path)?;
        let records: Vec<ServiceRecord> = serde_json::from_slice(&contents)?;
        Ok(records.into_iter().map(|r| (r.service, r.enable)).collect())
    }

    /// Write to a sibling temp file and rename over the old one.
    fn persist(&self, flags: &BTreeMap<ServiceName, bool>) -> Result<(), SprigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let records: Vec<ServiceRecord> = flags
            .iter()
            .map(|(service, enable)| ServiceRecord { service: *service, enable: *enable })
            .collect();

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, serde_json::to_vec_pretty(&records)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Everything `service` needs, dependencies before dependants.
    fn required_by(&self, service: ServiceName) -> Vec<ServiceName> {
        fn visit(
            requires: &BTreeMap<ServiceName, Vec<ServiceName>>,
            service: ServiceName,
            seen: &mut BTreeSet<ServiceName>,
            out: &mut Vec<ServiceName>,
        ) {
            for dep in requires.get(&service).into_iter().flatten() {
                if seen.insert(*dep) {
                    visit(requires, *dep, seen, out);
                    out.push(*dep);
                }
            }
        }

        let mut seen = BTreeSet::from([service]);
        let mut out = Vec::new();
        visit(&self.requires, service, &mut seen, &mut out);
        out
    }

    /// Enabled services that need `service`, directly or through others.
    /// Dependants come before the services they require, so stopping in
    /// this order never leaves a running service without a requirement.
    fn enabled_dependents(&self, service: ServiceName, flags: &BTreeMap<ServiceName, bool>) -> Vec<ServiceName> {
        let dependents: BTreeSet<ServiceName> = self
            .requires
            .keys()
            .filter(|candidate| flags.get(*candidate).copied().unwrap_or(false))
            .filter(|candidate| self.required_by(**candidate).contains(&service))
            .copied()
            .collect();

        let mut ordered = Vec::new();
        for dependent in &dependents {
            for svc in self.required_by(*dependent).into_iter().chain([*dependent]) {
                if dependents.contains(&svc) && !ordered.contains(&svc) {
                    ordered.push(svc);
                }
            }
        }
        ordered.reverse();
        ordered
    }

    /// Launcher failures become events; the record change still stands.
    fn start_one(&mut self, service: ServiceName, events: &mut Vec<String>) -> bool {
        match self.launcher.start(service) {
            Ok(()) => true,
            Err(e) => {
                let msg = format!("Could not start {}: {}", service, e);
                self.loggers.log(LogLevel::Warn, &msg);
                events.push(msg);
                false
            }
        }
    }

    fn stop_one(&mut self, service: ServiceName, events: &mut Vec<String>) -> bool {
        match self.launcher.stop(service) {
            Ok(()) => true,
            Err(e) => {
                let msg = format!("Could not stop {}: {}", service, e);
                self.loggers.log(LogLevel::Warn, &msg);
                events.push(msg);
                false
            }
        }
    }
}

impl<L: Launcher> ConfigStore for FileStore<L> {
    fn get_or_create(&mut self, service: ServiceName) -> Result<ServiceRecord, SprigError> {
        let mut flags = self.load()?;
        if let Some(enable) = flags.get(&service) {
            return Ok(ServiceRecord { service, enable: *enable });
        }

        flags.insert(service, false);
        self.persist(&flags)?;
        self.loggers.file_only(LogLevel::Info, &format!("Created settings record for {}", service));
        Ok(ServiceRecord::new(service))
    }

    fn records(&mut self) -> Result<Vec<ServiceRecord>, SprigError> {
        Ok(self
            .load()?
            .into_iter()
            .map(|(service, enable)| ServiceRecord { service, enable })
            .collect())
    }

    fn validate(&mut self, record: &ServiceRecord, force: bool) -> Result<(), SprigError> {
        if record.enable || force {
            return Ok(());
        }

        let flags = self.load()?;
        let dependents = self.enabled_dependents(record.service, &flags);
        if dependents.is_empty() {
            return Ok(());
        }

        let names: Vec<&str> = dependents.iter().map(|s| s.as_str()).collect();
        Err(SprigError::ValidationFailed(format!(
            "{} cannot be disabled while {} depend on it. Use force to stop them too.",
            record.service,
            names.join(", ")
        )))
    }

    fn save(&mut self, record: &ServiceRecord, force: bool) -> Result<SaveOutcome, SprigError> {
        self.validate(record, force)?;

        let mut flags = self.load()?;
        let service = record.service;
        let prior = flags.get(&service).copied().unwrap_or(false);

        if prior == record.enable {
            flags.insert(service, record.enable);
            self.persist(&flags)?;
            return Ok(SaveOutcome::record_only());
        }

        let mut outcome = SaveOutcome::record_only();

        if record.enable {
            for dep in self.required_by(service) {
                if flags.get(&dep).copied().unwrap_or(false) {
                    continue;
                }
                flags.insert(dep, true);
                self.persist(&flags)?;
                outcome.enabled.push(dep);
                if self.start_one(dep, &mut outcome.events) {
                    outcome.events.push(format!("Started {}, required by {}", dep, service));
                }
            }

            flags.insert(service, true);
            self.persist(&flags)?;
            self.start_one(service, &mut outcome.events);
        } else {
            for dependent in self.enabled_dependents(service, &flags) {
                flags.insert(dependent, false);
                self.persist(&flags)?;
                outcome.disabled.push(dependent);
                if self.stop_one(dependent, &mut outcome.events) {
                    outcome.events.push(format!("Stopped {}, which requires {}", dependent, service));
                }
            }

            flags.insert(service, false);
            self.persist(&flags)?;
            self.stop_one(service, &mut outcome.events);
        }

        // The record is committed by now, so a failed status check only leaves the
        // process state undetermined.
        outcome.started = match self.launcher.is_running(service) {
            Ok(true) => StartState::Started,
            Ok(false) => StartState::Stopped,
            Err(e) => {
                let msg = format!("Could not check whether {} is running: {}", service, e);
                self.loggers.log(LogLevel::Warn, &msg);
                outcome.events.push(msg);
                StartState::Unspecified
            }
        };

        Ok(outcome)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
