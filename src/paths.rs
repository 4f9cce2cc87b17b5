//! Centralized path resolution for aiwatch
//!
//! Single source of truth for the aiwatch state directory and the files
//! inside it. Respects AIWATCH_DIR for worktrees/dev, falls back to
//! ~/.aiwatch.

use crate::config::Config;
use std::path::PathBuf;

/// Get the aiwatch base directory.
///
/// Uses centralized Config (AIWATCH_DIR env var or ~/.aiwatch fallback).
pub fn aiwatch_dir() -> PathBuf {
    Config::get().aiwatch_dir
}

/// Get the log file path (aiwatch_dir/logs/aiwatch.log)
pub fn log_path() -> PathBuf {
    aiwatch_dir().join("logs").join("aiwatch.log")
}
