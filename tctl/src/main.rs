use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use sprig::colour::color::{color_state, color_status, BOLD, DIM, RED, RESET, YELLOW};
use sprig::ipc::{send_ipc_request, Alert, AlertLevel, IpcCommand, IpcRequest, IpcResponse, ServiceStatus, TRELLISD_SOCKET_PATH};
use sprig::status::DesiredStatus;
use sprig::toggle::ToggleResult;

#[derive(Parser)]
#[command(name = "tctl")]
#[command(about = "Trellis Control CLI", long_about = None)]
struct Cli {
    /// trellisd control socket
    #[arg(long, default_value = TRELLISD_SOCKET_PATH)]
    socket: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flip a service on or off. Accepts service names and form identifiers.
    Toggle {
        target: String,
        /// Also stop services that depend on the target
        #[arg(long)]
        force: bool,
    },
    /// Show every known service
    Status,
    /// Run the hardware checks
    Alerts,
    Shutdown,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{RED}tctl: {e:#}{RESET}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the daemon reported success.
fn run(cli: Cli) -> Result<bool> {
    let command = match cli.command {
        Commands::Toggle { target, force } => IpcCommand::Toggle { target, force },
        Commands::Status => IpcCommand::GetStatus,
        Commands::Alerts => IpcCommand::GetAlerts,
        Commands::Shutdown => IpcCommand::Shutdown,
    };

    let request = IpcRequest { command: command.clone() };
    let response = send_ipc_request(&cli.socket, &request)
        .with_context(|| format!("Failed to reach trellisd on {}", cli.socket))?;

    match command {
        IpcCommand::Toggle { .. } => print_toggle(&response)?,
        IpcCommand::GetStatus if response.success => print_status(&decode::<Vec<ServiceStatus>>(&response)?),
        IpcCommand::GetAlerts if response.success => print_alerts(&decode::<Vec<Alert>>(&response)?),
        _ => print_message(&response),
    }

    Ok(response.success)
}

fn decode<T: DeserializeOwned>(response: &IpcResponse) -> Result<T> {
    let data = response.data.clone().context("trellisd sent no data")?;
    serde_json::from_value(data).context("Malformed reply from trellisd")
}

fn print_message(response: &IpcResponse) {
    if response.success {
        println!("{}", response.message);
    } else {
        eprintln!("{RED}{}{RESET}", response.message);
    }
}

fn print_toggle(response: &IpcResponse) -> Result<()> {
    if response.data.is_none() {
        print_message(response);
        return Ok(());
    }

    let result: ToggleResult = decode(response)?;
    match (result.is_error(), result.status()) {
        (false, Some(status)) => println!("{BOLD}{}{RESET} is now {}", result.service(), color_status(status)),
        (false, None) => println!("{}", response.message),
        (true, _) => eprintln!("{RED}{}: {}{RESET}", result.service(), response.message),
    }

    for svc in result.enabled_svcs() {
        println!("  {DIM}also started{RESET} {svc}");
    }
    for svc in result.disabled_svcs() {
        println!("  {DIM}also stopped{RESET} {svc}");
    }
    for event in result.events() {
        println!("  {DIM}{event}{RESET}");
    }
    Ok(())
}

fn print_status(rows: &[ServiceStatus]) {
    let width = rows.iter().map(|r| r.service.as_str().len()).max().unwrap_or(0);

    for row in rows {
        let state = match (row.state, row.enabled) {
            (Some(state), _) => color_state(state),
            (None, Some(enabled)) => color_status(DesiredStatus::from_enabled(enabled)),
            (None, None) => format!("{DIM}-{RESET}"),
        };
        println!("{:<width$}  {:<9}  {}", row.service.as_str(), row.class.as_str(), state);
    }
}

fn print_alerts(alerts: &[Alert]) {
    if alerts.is_empty() {
        println!("No alerts");
        return;
    }

    for alert in alerts {
        let colour = match alert.level {
            AlertLevel::Warn => YELLOW,
        };
        println!("{colour}[{:?}]{RESET} {}", alert.level, alert.message);
    }
}
