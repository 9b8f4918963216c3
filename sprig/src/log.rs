use std::fs::{metadata, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use regex::Regex;
use terminal_size::{Width, terminal_size};

use crate::colour::color::{color_time, color_level, GREEN, RESET, BOLD};
use crate::errors::SprigError;
use crate::status::LogLevel;
use crate::time::format_duration;

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Ok => "OK",
            LogLevel::Fail => "FAIL",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        }
    }
}

// === CONSOLE LOGGER ===

pub trait ConsoleLogger {
    fn message(&mut self, level: LogLevel, message: &str, duration: Duration);
    fn banner(&mut self, message: &str);
}

pub struct ConsoleLoggerImpl {
    pub min_level: LogLevel,
    pub start_time: Instant,
}

impl ConsoleLoggerImpl {
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            start_time: Instant::now(),
        }
    }

    fn format_console(&self, level: LogLevel, message: &str, duration: Duration) -> String {
        let time_str = color_time(&format_duration(duration));
        let level_str = color_level(level, &padded_level(level));

        let term_width = terminal_size()
            .map(|(Width(w), _)| w as usize)
            .unwrap_or(80);

        let base_str = format!("{time_str} {message}");

        // Visible lengths only
        let base_len = strip_ansi_codes(&base_str).chars().count();
        let level_len = strip_ansi_codes(&level_str).chars().count();

        let padding = term_width.saturating_sub(base_len + level_len).max(1);

        format!("{base_str}{}{level_str}", " ".repeat(padding))
    }
}

impl ConsoleLogger for ConsoleLoggerImpl {
    fn message(&mut self, level: LogLevel, message: &str, duration: Duration) {
        if level >= self.min_level {
            println!("{}", self.format_console(level, message, duration));
        }
    }

    fn banner(&mut self, message: &str) {
        println!("{BOLD}{GREEN}{message}{RESET}\n");
    }
}

// === FILE LOGGER ===

pub trait FileLogger {
    fn log(&mut self, level: LogLevel, message: &str);

    // No default implementation here: force explicit call on impl
    fn initialize(&mut self, console_logger: &mut dyn ConsoleLogger) -> Result<(), SprigError>;
}

pub struct FileLoggerImpl {
    pub min_level: LogLevel,
    pub file_path: String,
    has_initialized: bool,
    buffer: Vec<String>,
}

impl FileLoggerImpl {
    pub fn new(min_level: LogLevel, file_path: impl Into<String>) -> Self {
        Self {
            min_level,
            file_path: file_path.into(),
            has_initialized: false,
            buffer: Vec::new(),
        }
    }

    fn format_file(&self, level: LogLevel, message: &str) -> String {
        let timestamp = chrono::Local::now().format("[%d-%m-%Y %H:%M:%S]");
        format!("{} {timestamp} {message}", padded_level(level))
    }

    fn append_lines<'a>(&self, lines: impl IntoIterator<Item = &'a String>) -> Result<(), SprigError> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.file_path)?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

impl FileLogger for FileLoggerImpl {
    fn log(&mut self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }

        let line = self.format_file(level, message);
        if self.has_initialized {
            let _ = self.append_lines([&line]);
        } else {
            self.buffer.push(line);
        }
    }

    fn initialize(&mut self, console_logger: &mut dyn ConsoleLogger) -> Result<(), SprigError> {
        if self.has_initialized {
            return Ok(());
        }

        if let Some(parent) = Path::new(&self.file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let is_existing_file = metadata(&self.file_path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);

        if is_existing_file {
            self.append_lines([&"\n────────── NEW SESSION ──────────".to_string()])?;
        }

        self.append_lines(&self.buffer)?;
        self.buffer.clear();
        self.has_initialized = true;

        console_logger.message(
            LogLevel::Info,
            &format!("File logger initialized: {}", self.file_path),
            Duration::ZERO,
        );

        Ok(())
    }
}

// === SHARED HANDLE ===

pub type SharedConsoleLogger = Arc<Mutex<dyn ConsoleLogger + Send + Sync>>;
pub type SharedFileLogger = Arc<Mutex<dyn FileLogger + Send + Sync>>;

/// Both loggers behind one cloneable handle, handed to every component that
/// reports progress.
#[derive(Clone)]
pub struct Loggers {
    console: SharedConsoleLogger,
    file: SharedFileLogger,
}

impl Loggers {
    pub fn new(console: SharedConsoleLogger, file: SharedFileLogger) -> Self {
        Self { console, file }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        self.timed(level, message, Duration::ZERO);
    }

    pub fn timed(&self, level: LogLevel, message: &str, duration: Duration) {
        if let Ok(mut con) = self.console.lock() {
            con.message(level, message, duration);
        }
        self.file_only(level, message);
    }

    pub fn file_only(&self, level: LogLevel, message: &str) {
        if let Ok(mut file) = self.file.lock() {
            file.log(level, message);
        }
    }
}

// === HELPERS ===

fn padded_level(level: LogLevel) -> String {
    format!("[ {:^4} ]", level.as_str())
}

fn strip_ansi_codes(s: &str) -> String {
    // Matches ANSI escape codes like \x1b[...m
    match Regex::new(r"\x1b\[[0-9;]*m") {
        Ok(re) => re.replace_all(s, "").into_owned(),
        Err(_) => s.to_string(),
    }
}
