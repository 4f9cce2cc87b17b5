//! tmux INSERT-mode detection.
//!
//! When the wrapper runs inside tmux, a modal editor in another layer of
//! the pane (vim inside the wrapped tool, etc.) can be mid-edit; injecting
//! a prompt then would type into the wrong buffer. A small polling thread
//! captures the visible pane and tracks whether it shows a `-- INSERT`
//! indicator. Capture failures keep the previous state.

use crate::log::log_debug;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Whether this process runs inside a tmux session.
pub fn in_tmux() -> bool {
    std::env::var("TMUX").map(|v| !v.is_empty()).unwrap_or(false)
}

/// Polling detector for the pane's INSERT indicator.
pub struct InsertModeDetector {
    insert_mode: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InsertModeDetector {
    /// Start polling at `interval`. Call only when [`in_tmux`] is true.
    pub fn start(interval: Duration) -> Self {
        let insert_mode = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let thread_insert = insert_mode.clone();
        let thread_running = running.clone();
        let handle = std::thread::spawn(move || {
            while thread_running.load(Ordering::Acquire) {
                if let Some(now_insert) = capture_insert_state() {
                    let was = thread_insert.swap(now_insert, Ordering::AcqRel);
                    if was != now_insert {
                        log_debug(
                            "tmux",
                            "insert_mode.change",
                            if now_insert { "entered" } else { "left" },
                        );
                    }
                }
                std::thread::sleep(interval);
            }
        });

        Self {
            insert_mode,
            running,
            handle: Some(handle),
        }
    }

    /// A cloneable view of the INSERT flag for the dispatch loop.
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.insert_mode.clone()
    }

    pub fn stop(mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InsertModeDetector {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Capture the visible pane and look for the INSERT indicator.
/// None when capture fails (not in tmux, tmux gone); keep previous state.
fn capture_insert_state() -> Option<bool> {
    let output = Command::new("tmux")
        .args(["capture-pane", "-p"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let pane = String::from_utf8_lossy(&output.stdout);
    Some(pane.contains("-- INSERT"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_in_tmux_reflects_env() {
        // SAFETY: serial test, no concurrent env access.
        unsafe {
            std::env::set_var("TMUX", "/tmp/tmux-1000/default,1234,0");
        }
        assert!(in_tmux());
        unsafe {
            std::env::set_var("TMUX", "");
        }
        assert!(!in_tmux());
        unsafe {
            std::env::remove_var("TMUX");
        }
        assert!(!in_tmux());
    }

    #[test]
    fn test_detector_starts_and_stops() {
        let detector = InsertModeDetector::start(Duration::from_millis(10));
        // Freshly started: not in insert mode until a capture says otherwise.
        assert!(!detector.flag().load(Ordering::Acquire));
        detector.stop();
    }
}
