//! aiwatch: PTY wrapper with a comment-marker workflow
//!
//! Modes:
//!   aiwatch <command> [args...] [--watch=DIR]  - wrap a program under a PTY
//!   aiwatch scan [DIR]                         - batch marker search, no PTY
//!   aiwatch --help                             - usage
//!
//! While wrapping, source files under the watch directory are monitored for
//! AI? / AI! / AI: comment markers; new markers are rendered into prompts
//! and typed into the wrapped program's stdin.

mod comment;
mod config;
mod dispatch;
mod log;
mod paths;
mod pty;
mod search;
mod tmux;
mod watcher;

use anyhow::{Context, Result};
use comment::ProcessedCache;
use config::Config;
use std::env;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Action to take based on command-line arguments
#[derive(Debug, PartialEq)]
enum MainAction {
    /// Wrap a command under the PTY proxy
    RunWrapper {
        command: String,
        args: Vec<String>,
        watch_dir: Option<String>,
    },
    /// Batch scan for markers
    RunScan { dir: String },
    /// Print usage (exit code distinguishes help from misuse)
    ShowUsage { error: bool },
}

/// Determine what action to take based on command-line arguments
fn determine_action(args: &[String]) -> MainAction {
    if args.len() < 2 {
        return MainAction::ShowUsage { error: true };
    }

    match args[1].as_str() {
        "--help" | "-h" => MainAction::ShowUsage { error: false },
        "scan" => MainAction::RunScan {
            dir: args.get(2).cloned().unwrap_or_else(|| ".".to_string()),
        },
        _ => {
            // A trailing --watch=DIR applies to the wrapper, not the child.
            let mut rest: Vec<String> = args[1..].to_vec();
            let mut watch_dir = None;
            if let Some(last) = rest.last() {
                if let Some(dir) = last.strip_prefix("--watch=") {
                    watch_dir = Some(dir.to_string());
                    rest.pop();
                }
            }
            if rest.is_empty() {
                // Just a --watch flag with nothing to wrap
                return MainAction::ShowUsage { error: true };
            }
            MainAction::RunWrapper {
                command: rest[0].clone(),
                args: rest[1..].to_vec(),
                watch_dir,
            }
        }
    }
}

fn print_usage() {
    eprintln!("aiwatch - PTY wrapper with an AI comment-marker workflow");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  aiwatch <command> [args...] [--watch=DIR]");
    eprintln!("  aiwatch scan [DIR]");
    eprintln!();
    eprintln!("Wrapper mode watches source files for AI?, AI! and AI: comment");
    eprintln!("markers and feeds them to the wrapped program as prompts.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  AIWATCH_DIR               State directory (default ~/.aiwatch)");
    eprintln!("  AIWATCH_WATCH_DIR         Directory to watch (default .)");
    eprintln!("  AIWATCH_OUTPUT_THROTTLE   Coalesce output frames (default true)");
    eprintln!("  AIWATCH_INPUT_THROTTLE    Remap Enter for multi-line input (default true)");
    eprintln!("  AIWATCH_HELD_ENTER        Held-Enter submit detection (default false)");
    eprintln!("  AIWATCH_LOG_LEVEL         debug|info|warn|error (default info)");
}

fn main() -> Result<()> {
    Config::init();

    // Panics must go to the log file, not the wrapped program's terminal.
    panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        log::log_error("main", "panic", &format!("{} at {}", message, location));
    }));

    let args: Vec<String> = env::args().collect();

    match determine_action(&args) {
        MainAction::ShowUsage { error } => {
            print_usage();
            if error {
                std::process::exit(1);
            }
        }
        MainAction::RunScan { dir } => {
            run_scan(Path::new(&dir))?;
        }
        MainAction::RunWrapper {
            command,
            args,
            watch_dir,
        } => {
            let code = run_wrapper(&command, &args, watch_dir)?;
            std::process::exit(code);
        }
    }

    Ok(())
}

/// Batch mode: pre-filter the tree, extract every surviving file, print.
fn run_scan(dir: &Path) -> Result<()> {
    let candidates =
        search::find_candidate_files_default(dir).context("marker search failed")?;

    let mut total = 0usize;
    for path in &candidates {
        let records = match comment::extract_from_path(path) {
            Ok(records) => records,
            Err(e) => {
                eprintln!("warning: {}", e);
                continue;
            }
        };
        for record in records {
            total += 1;
            println!(
                "{} {} [{}] {}",
                record.file_path.display(),
                record.location(),
                record.action,
                record.content
            );
        }
    }

    eprintln!(
        "{} marker comment(s) in {} candidate file(s)",
        total,
        candidates.len()
    );
    Ok(())
}

/// Wrapper mode: PTY proxy + watcher + dispatch loop.
fn run_wrapper(command: &str, args: &[String], watch_flag: Option<String>) -> Result<i32> {
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let mut proxy = pty::Proxy::spawn(command, &arg_refs).context("Failed to spawn PTY")?;
    let writer = proxy.prompt_writer()?;

    let watch_dir = watch_flag
        .or(Config::get().watch_dir)
        .unwrap_or_else(|| ".".to_string());
    let watch_dir = PathBuf::from(watch_dir);

    let (tx, rx) = std::sync::mpsc::channel();
    let _watcher = watcher::FileWatcher::spawn(&watch_dir, tx)
        .with_context(|| format!("Failed to watch {}", watch_dir.display()))?;

    // INSERT-mode gate only matters inside tmux.
    let detector = tmux::in_tmux().then(|| tmux::InsertModeDetector::start(Duration::from_millis(500)));
    let insert_flag = detector.as_ref().map(|d| d.flag());

    let running = Arc::new(AtomicBool::new(true));
    let cache = Arc::new(ProcessedCache::new());

    let dispatch_running = running.clone();
    let dispatch_cache = cache.clone();
    let dispatch_handle = std::thread::spawn(move || {
        dispatch::run_dispatch_loop(dispatch_running, rx, dispatch_cache, &writer, insert_flag);
    });

    let exit_code = proxy.run().context("PTY run failed")?;

    // Stop the dispatch loop; dropping the watcher above closes its channel.
    running.store(false, Ordering::Release);
    if let Some(detector) = detector {
        detector.stop();
    }
    let _ = dispatch_handle.join();

    Ok(exit_code)
}
