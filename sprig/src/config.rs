use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::catalog::{Classification, ServiceName};
use crate::errors::SprigError;
use crate::status::LogLevel;

pub const DEFAULT_CONFIG_PATH: &str = "/usr/local/etc/trellis/trellis.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub socket_path: String,
    pub log_file: String,
    pub log_level: LogLevel,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: crate::ipc::TRELLISD_SOCKET_PATH.to_string(),
            log_file: "/var/log/trellis/trellisd.log".to_string(),
            log_level: LogLevel::Info,
        }
    }
}

/// Connection to the middleware task dispatcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub socket_path: String,
    /// Upper bound on one blocking call, task calls included.
    pub timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            socket_path: "/var/run/dispatcher.sock".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
    pub rc_command: String,
    pub rc_timeout_secs: u64,
    /// service -> services it needs running first
    pub requires: BTreeMap<String, Vec<String>>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "/data/trellis/services.json".to_string(),
            rc_command: "/usr/sbin/service".to_string(),
            rc_timeout_secs: 60,
            requires: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub dispatcher: DispatcherConfig,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SprigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, SprigError> {
        let config: Config = toml::from_str(contents)?;
        config.check()?;
        Ok(config)
    }

    /// Like `from_file`, but a missing file means defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, SprigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Dependencies are resolved by the store's rc launcher, so both ends must
    /// be locally managed services.
    fn check(&self) -> Result<(), SprigError> {
        for (service, deps) in &self.store.requires {
            require_local(service)?;
            for dep in deps {
                require_local(dep)?;
                if dep == service {
                    return Err(SprigError::Parse(format!("Service '{}' cannot require itself", service)));
                }
            }
        }
        Ok(())
    }
}

fn require_local(name: &str) -> Result<(), SprigError> {
    match ServiceName::lookup(name)?.classification() {
        Classification::Local => Ok(()),
        Classification::Delegated => Err(SprigError::Parse(format!(
            "Service '{}' is managed by the dispatcher and cannot appear in store.requires",
            name
        ))),
    }
}
