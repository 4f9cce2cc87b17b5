//! Dispatch loop: changed files in, prompts out.
//!
//! Consumes paths from the watcher channel, batches closely-spaced events,
//! runs extraction, filters already-handled fingerprints through the
//! processed cache, renders a prompt, and hands it to the PTY side.
//! Fingerprints are claimed with a single check-and-set before rendering
//! and released again if the send fails, so a marker fires exactly once
//! per content change even with overlapping triggers.

use crate::comment::prompt::{render_batch_prompt, render_prompt};
use crate::comment::{ActionKind, CommentRecord, ProcessedCache, extract_from_path};
use crate::log::{log_error, log_info, log_warn};
use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Extra window after the first event in which further events join the batch
const BATCH_WINDOW: Duration = Duration::from_millis(100);

/// Longest we hold a prompt waiting for the pane to leave INSERT mode
const INSERT_GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for rendered prompt text.
///
/// The PTY proxy provides the real implementation; tests substitute their own.
pub trait PromptSink: Send {
    fn send_prompt(&self, text: &str) -> Result<()>;
}

/// Run the dispatch loop until `running` clears or the watcher channel closes.
pub fn run_dispatch_loop(
    running: Arc<AtomicBool>,
    rx: Receiver<PathBuf>,
    cache: Arc<ProcessedCache>,
    sink: &dyn PromptSink,
    insert_mode: Option<Arc<AtomicBool>>,
) {
    log_info("dispatch", "start", "dispatch loop running");

    while running.load(Ordering::Acquire) {
        let first = match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(path) => path,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        // Let one save burst (or one multi-file write) land as one batch.
        let mut paths = vec![first];
        std::thread::sleep(BATCH_WINDOW);
        while let Ok(path) = rx.try_recv() {
            paths.push(path);
        }
        let mut seen = HashSet::new();
        paths.retain(|p| seen.insert(p.clone()));

        wait_for_insert_gate(insert_mode.as_deref());
        process_batch(&paths, &cache, sink);
    }

    log_info("dispatch", "stop", "dispatch loop stopped");
}

/// Hold while the tmux pane shows INSERT, up to a bounded wait.
fn wait_for_insert_gate(insert_mode: Option<&AtomicBool>) {
    let Some(flag) = insert_mode else { return };
    let deadline = Instant::now() + INSERT_GATE_TIMEOUT;
    while flag.load(Ordering::Acquire) {
        if Instant::now() >= deadline {
            log_warn("dispatch", "insert_gate.timeout", "injecting despite INSERT mode");
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Extract, dedup, render, and send one batch of changed files.
pub fn process_batch(paths: &[PathBuf], cache: &ProcessedCache, sink: &dyn PromptSink) {
    let mut actionable: Vec<CommentRecord> = Vec::new();
    let mut context: Vec<CommentRecord> = Vec::new();

    for path in paths {
        let records = match extract_from_path(path) {
            Ok(records) => records,
            Err(e) => {
                log_error("dispatch", "extract.fail", &format!("{}", e));
                continue;
            }
        };
        for record in records {
            match record.action {
                ActionKind::Context => context.push(record),
                ActionKind::Command | ActionKind::Question => actionable.push(record),
            }
        }
    }

    // Claim fingerprints atomically; only unclaimed records fire.
    let fresh: Vec<CommentRecord> = actionable
        .into_iter()
        .filter(|r| cache.check_and_mark(&r.fingerprint))
        .collect();

    if fresh.is_empty() {
        return;
    }

    let prompt = if fresh.len() == 1 {
        render_prompt(&fresh[0], &context)
    } else {
        render_batch_prompt(&fresh, &context)
    };

    log_info(
        "dispatch",
        "send",
        &format!("{} record(s), {} context record(s)", fresh.len(), context.len()),
    );

    if let Err(e) = sink.send_prompt(&prompt) {
        log_error("dispatch", "send.fail", &format!("{}", e));
        // Release the claims so the markers can fire again next save.
        for record in &fresh {
            cache.unmark(&record.fingerprint);
        }
    }
}
