use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use nix::unistd::Uid;

mod controller;
mod dispatcher;
mod executor;
mod firmware;
mod ipc_server;
mod launcher;
mod signal;
mod store;
#[cfg(test)]
mod testutil;

use crate::controller::ToggleController;
use crate::dispatcher::DispatcherClient;
use crate::ipc_server::{run_ipc_server, RequestHandler};
use crate::launcher::RcLauncher;
use crate::signal::install_signal_handlers;
use crate::store::FileStore;

use sprig::config::{Config, DEFAULT_CONFIG_PATH};
use sprig::log::{ConsoleLogger, ConsoleLoggerImpl, FileLogger, FileLoggerImpl, Loggers};
use sprig::status::LogLevel;

// Get the Cargo package version set at compile time
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "trellisd")]
#[command(about = "Trellis service toggle daemon", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    let mut console_logger = ConsoleLoggerImpl::new(config.daemon.log_level);
    let mut file_logger = FileLoggerImpl::new(config.daemon.log_level, config.daemon.log_file.clone());

    console_logger.banner(&format!("Trellisd v{} - Service Toggles", VERSION));

    file_logger
        .initialize(&mut console_logger)
        .context("Failed to init file logger")?;

    let loggers = Loggers::new(Arc::new(Mutex::new(console_logger)), Arc::new(Mutex::new(file_logger)));

    if !Uid::effective().is_root() {
        loggers.log(
            LogLevel::Warn,
            "trellisd is not running as root; starting and stopping services will likely fail",
        );
    }

    let executor = DispatcherClient::new(&config.dispatcher);
    let store = FileStore::new(&config.store, RcLauncher::new(&config.store), loggers.clone())
        .with_context(|| format!("Failed to open service store {}", config.store.path))?;
    let controller = ToggleController::new(executor, store, loggers.clone());
    let handler = RequestHandler::new(controller, firmware::run_checks, loggers.clone());

    install_signal_handlers(loggers.clone(), handler.in_flight(), config.daemon.socket_path.clone())?;

    run_ipc_server(&config.daemon.socket_path, handler, loggers.clone(), None)
        .with_context(|| format!("IPC server on {} failed", config.daemon.socket_path))?;

    loggers.log(LogLevel::Ok, "trellisd stopped");
    Ok(())
}
