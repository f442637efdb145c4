use crate::severity::LogSeverity;
use crate::time::now;
use once_cell::sync::Lazy;
use std::env;

/// Environment variable holding the minimum severity that gets printed.
pub const LOG_ENV: &str = "WORLDDIFF_LOG";

static THRESHOLD: Lazy<LogSeverity> = Lazy::new(|| {
    env::var(LOG_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LogSeverity::Info)
});

/// Minimum severity currently printed.
pub fn threshold() -> LogSeverity {
    *THRESHOLD
}

pub fn enabled(log_severity: LogSeverity) -> bool {
    log_severity >= threshold()
}

/// Formats a line the way it is printed, without the threshold check.
pub fn format_line(msg: &str, log_severity: LogSeverity) -> String {
    format!("[{}] {} {}", log_severity, now(), msg)
}

pub fn log(msg: String, log_severity: LogSeverity) {
    if !enabled(log_severity) {
        return;
    }
    let line = format_line(&msg, log_severity);
    if log_severity.is_error_stream() {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}
