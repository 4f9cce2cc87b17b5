//! Simple file-based logging for aiwatch
//!
//! Logs to <aiwatch_dir>/logs/aiwatch.log in JSONL format. Nothing is ever
//! written to stdout/stderr: the wrapped program owns the terminal and any
//! stray output would corrupt its TUI.

use crate::config::Config;
use chrono::Utc;
use serde::Serialize;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;

/// Log entry structure for safe JSON serialization
#[derive(Serialize)]
struct LogEntry<'a> {
    ts: String,
    level: String,
    subsystem: &'a str,
    event: &'a str,
    msg: &'a str,
}

/// Numeric rank for level filtering
fn level_rank(level: &str) -> u8 {
    match level {
        "debug" => 0,
        "info" => 1,
        "warn" => 2,
        _ => 3,
    }
}

/// Log a message to the aiwatch log file.
/// No-op before Config::init() (notably: unit tests).
pub fn log(level: &str, subsystem: &str, event: &str, message: &str) {
    let Some(config) = Config::try_get() else {
        return;
    };
    if level_rank(level) < level_rank(&config.log_level) {
        return;
    }

    let path = crate::paths::log_path();

    // Ensure directory exists
    if let Some(parent) = path.parent() {
        let _ = create_dir_all(parent);
    }

    let entry = LogEntry {
        ts: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        level: level.to_uppercase(),
        subsystem,
        event,
        msg: message,
    };

    // Serialize with serde_json for proper escaping
    let log_line = match serde_json::to_string(&entry) {
        Ok(line) => line,
        Err(_) => return, // Silently fail on serialization error
    };

    // Append to file
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = writeln!(file, "{}", log_line);
    }
}

/// Log debug message
pub fn log_debug(subsystem: &str, event: &str, message: &str) {
    log("debug", subsystem, event, message);
}

/// Log info message
pub fn log_info(subsystem: &str, event: &str, message: &str) {
    log("info", subsystem, event, message);
}

/// Log warning message
pub fn log_warn(subsystem: &str, event: &str, message: &str) {
    log("warn", subsystem, event, message);
}

/// Log error message
pub fn log_error(subsystem: &str, event: &str, message: &str) {
    log("error", subsystem, event, message);
}
