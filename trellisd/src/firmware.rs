use std::collections::BTreeMap;
use std::process::Command;

use sprig::errors::SprigError;
use sprig::ipc::{Alert, AlertLevel};

const MPS_PREFIX: &str = "dev.mps";

/// Split `sysctl` output (`name: value` per line) into pairs.
pub fn parse_sysctl(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Warn for every mps controller whose firmware major version differs from
/// the driver's. Controllers missing either version are left alone.
pub fn check_mps(entries: &[(String, String)]) -> Vec<Alert> {
    let mut controllers: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();

    for (name, value) in entries {
        let mibs: Vec<&str> = name.splitn(4, '.').collect();
        if mibs.len() < 4 || format!("{}.{}", mibs[0], mibs[1]) != MPS_PREFIX {
            continue;
        }

        let major = value.split('.').next().and_then(|m| m.trim().parse::<u64>().ok());
        if let Some(major) = major {
            controllers.entry(mibs[2]).or_default().insert(mibs[3], major);
        }
    }

    controllers
        .into_iter()
        .filter_map(|(number, mibs)| {
            let firmware = *mibs.get("firmware_version")?;
            let driver = *mibs.get("driver_version")?;
            (firmware != driver).then(|| Alert {
                level: AlertLevel::Warn,
                message: format!(
                    "Firmware version {firmware} does not match driver version {driver} for /dev/mps{number}. \
                     Please flash controller to P{driver} IT firmware."
                ),
            })
        })
        .collect()
}

/// Read `dev.mps` from the running kernel. No such tree means no controllers.
pub fn read_mps_sysctl() -> Result<Vec<(String, String)>, SprigError> {
    let output = Command::new("sysctl").arg(MPS_PREFIX).output()?;
    if !output.status.success() {
        return Ok(Vec::new());
    }
    Ok(parse_sysctl(&String::from_utf8_lossy(&output.stdout)))
}

pub fn run_checks() -> Result<Vec<Alert>, SprigError> {
    Ok(check_mps(&read_mps_sysctl()?))
}
