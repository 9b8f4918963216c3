use std::fs;
use std::process;
use std::sync::{Arc, Mutex};
use std::thread;

use signal_hook::{consts::signal::*, iterator::Signals};

use sprig::errors::SprigError;
use sprig::log::Loggers;
use sprig::status::LogLevel;
use sprig::time::ProcessTimer;

/// Exit on SIGTERM or SIGINT once the request being served has finished.
pub fn install_signal_handlers(
    loggers: Loggers,
    in_flight: Arc<Mutex<()>>,
    socket_path: String,
) -> Result<(), SprigError> {
    let mut signals = Signals::new([SIGTERM, SIGINT])
        .map_err(|e| SprigError::Custom(format!("Failed to register signals: {e}")))?;

    thread::spawn(move || {
        let timer = ProcessTimer::start();

        if let Some(signal) = signals.forever().next() {
            let name = if signal == SIGINT { "SIGINT" } else { "SIGTERM" };
            loggers.timed(
                LogLevel::Warn,
                &format!("Received {name}, waiting for the current request"),
                timer.elapsed(),
            );

            let _guard = in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = fs::remove_file(&socket_path);
            loggers.timed(LogLevel::Ok, "trellisd stopped", timer.elapsed());
            process::exit(0);
        }
    });

    Ok(())
}
