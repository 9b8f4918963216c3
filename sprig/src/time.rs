use std::time::{Duration, Instant};

/// Measure how long one request took, for the console log column.
pub struct ProcessTimer {
    start: Instant,
}

impl ProcessTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Format a Duration into a string like `[ 01:23:045 ]` (mm:ss:ms)
pub fn format_duration(duration: Duration) -> String {
    let mins = duration.as_secs() / 60;
    let secs = duration.as_secs() % 60;
    let millis = duration.subsec_millis();

    format!("[ {:02}:{:02}:{:03} ]", mins, secs, millis)
}
