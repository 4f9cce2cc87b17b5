//! Controlling-terminal handling for the proxy.
//!
//! Raw mode setup with RAII restore, window-size queries, and signal
//! handler installation. All of it degrades gracefully when stdin is not a
//! TTY (headless runs, pipes in tests).

use anyhow::{Context, Result};
use nix::pty::Winsize;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::termios::{SetArg, Termios, cfmakeraw, tcgetattr, tcsetattr};
use nix::unistd::isatty;
use std::io;
use std::os::fd::AsRawFd;

use super::{handle_sighup, handle_sigint, handle_sigterm, handle_sigwinch};

/// RAII guard that owns the terminal's original settings.
///
/// Creating it flips stdin into raw mode (no line buffering, no echo, no
/// special-character processing) so every keystroke reaches the proxy
/// immediately; dropping it restores whatever the shell had configured.
/// A non-TTY stdin makes the guard a no-op.
pub struct RawModeGuard {
    saved: Option<Termios>,
}

impl RawModeGuard {
    pub fn engage() -> Result<Self> {
        let stdin = io::stdin();
        if !isatty(&stdin).unwrap_or(false) {
            return Ok(Self { saved: None });
        }

        let original = tcgetattr(&stdin).context("tcgetattr failed")?;
        let mut raw = original.clone();
        cfmakeraw(&mut raw);
        tcsetattr(&stdin, SetArg::TCSANOW, &raw).context("tcsetattr failed")?;
        Ok(Self {
            saved: Some(original),
        })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Some(ref termios) = self.saved {
            let _ = tcsetattr(io::stdin(), SetArg::TCSANOW, termios);
        }
    }
}

/// Current terminal window size, defaulting to 80x24 when the query fails
/// (not a TTY, or a zero-sized pane during teardown).
pub fn window_size() -> Winsize {
    // SAFETY: Winsize is a plain C struct; all-zero is a valid value that
    // the ioctl below overwrites on success.
    let mut ws: Winsize = unsafe { std::mem::zeroed() };

    // SAFETY: stdout is fd 1 for the life of the process; TIOCGWINSZ writes
    // the window size into ws and the return value is checked below.
    let ret = unsafe {
        libc::ioctl(
            io::stdout().as_raw_fd(),
            libc::TIOCGWINSZ as libc::c_ulong,
            &mut ws,
        )
    };
    if ret == -1 || ws.ws_row == 0 || ws.ws_col == 0 {
        ws.ws_row = 24;
        ws.ws_col = 80;
    }
    ws
}

fn install_handler(
    signal: Signal,
    handler: extern "C" fn(libc::c_int),
    restart: bool,
) -> Result<()> {
    let flags = if restart {
        SaFlags::SA_RESTART
    } else {
        SaFlags::empty()
    };
    let action = SigAction::new(SigHandler::Handler(handler), flags, SigSet::empty());
    unsafe { sigaction(signal, &action) }.context(format!("sigaction {:?} failed", signal))?;
    Ok(())
}

/// Install every signal handler the proxy loop depends on.
pub fn install_signal_handlers() -> Result<()> {
    // SIGPIPE ignored: a write to a revoked terminal or closed pipe must
    // return EPIPE instead of killing us before cleanup runs.
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(Signal::SIGPIPE, &ignore) }.context("sigaction SIGPIPE failed")?;

    // Resize and Ctrl+C only set flags; syscalls may restart.
    install_handler(Signal::SIGWINCH, handle_sigwinch, true)?;
    install_handler(Signal::SIGINT, handle_sigint, true)?;
    // Termination must interrupt poll() with EINTR so the loop can exit.
    install_handler(Signal::SIGTERM, handle_sigterm, false)?;
    install_handler(Signal::SIGHUP, handle_sighup, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size_has_sane_fallback() {
        let ws = window_size();
        assert!(ws.ws_row > 0);
        assert!(ws.ws_col > 0);
    }

    #[test]
    fn test_raw_mode_guard_engages_and_restores() {
        // With a piped stdin the guard is inert; with a real TTY it must
        // restore settings on drop. Either way this must not error.
        let guard = RawModeGuard::engage().unwrap();
        drop(guard);
        let again = RawModeGuard::engage().unwrap();
        drop(again);
    }
}
