use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use sprig::catalog::ServiceName;
use sprig::config::StoreConfig;
use sprig::errors::SprigError;

/// Starts, stops and probes locally managed services.
pub trait Launcher {
    fn start(&mut self, service: ServiceName) -> Result<(), SprigError>;
    fn stop(&mut self, service: ServiceName) -> Result<(), SprigError>;
    fn is_running(&mut self, service: ServiceName) -> Result<bool, SprigError>;
}

/// Drives rc scripts through `service <name> onestart|onestop|onestatus`.
pub struct RcLauncher {
    command: String,
    timeout: Duration,
}

impl RcLauncher {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            command: config.rc_command.clone(),
            timeout: Duration::from_secs(config.rc_timeout_secs),
        }
    }

    fn run(&self, service: ServiceName, verb: &str) -> Result<ExitStatus, SprigError> {
        let mut child = Command::new(&self.command)
            .arg(service.as_str())
            .arg(verb)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        match child.wait_timeout(self.timeout)? {
            Some(status) => Ok(status),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(SprigError::Custom(format!(
                    "'{} {} {}' did not finish within {}s",
                    self.command,
                    service,
                    verb,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

impl Launcher for RcLauncher {
    fn start(&mut self, service: ServiceName) -> Result<(), SprigError> {
        let status = self.run(service, "onestart")?;
        if status.success() {
            Ok(())
        } else {
            Err(SprigError::Custom(format!("Starting {} exited with {}", service, status)))
        }
    }

    fn stop(&mut self, service: ServiceName) -> Result<(), SprigError> {
        let status = self.run(service, "onestop")?;
        if status.success() {
            Ok(())
        } else {
            Err(SprigError::Custom(format!("Stopping {} exited with {}", service, status)))
        }
    }

    /// rc scripts exit 0 from `onestatus` only while the daemon is up.
    fn is_running(&mut self, service: ServiceName) -> Result<bool, SprigError> {
        Ok(self.run(service, "onestatus")?.success())
    }
}
