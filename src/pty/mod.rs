//! PTY proxy: spawns the wrapped program with terminal emulation and
//! forwards I/O both ways.
//!
//! Components:
//! - Proxy: main poll loop with I/O forwarding, throttling, input remap
//! - RawModeGuard / signal handling: terminal.rs
//! - OutputThrottle: adaptive output coalescing (throttle.rs)
//! - InputFilter: Enter-key remapping (input.rs)
//! - PromptWriter: handle for the dispatch thread to type prompts into the
//!   wrapped program's stdin

mod input;
mod terminal;
mod throttle;

use anyhow::{Context, Result, bail};
use nix::errno::Errno;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::pty::openpty;
use nix::sys::signal::{Signal, kill};
use nix::unistd::{Pid, read, write};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::dispatch::PromptSink;
use crate::log::{log_info, log_warn};
use input::InputFilter;
use terminal::RawModeGuard;
use throttle::OutputThrottle;

// Signal flags (set by signal handlers, checked in the poll loop)
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);
static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);
static SIGTERM_RECEIVED: AtomicBool = AtomicBool::new(false);
static SIGHUP_RECEIVED: AtomicBool = AtomicBool::new(false);

// Set by the watchdog thread when the parent process disappears
static PARENT_GONE: AtomicBool = AtomicBool::new(false);

pub extern "C" fn handle_sigwinch(_: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Release);
}

pub extern "C" fn handle_sigint(_: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::Release);
}

pub extern "C" fn handle_sigterm(_: libc::c_int) {
    SIGTERM_RECEIVED.store(true, Ordering::Release);
}

pub extern "C" fn handle_sighup(_: libc::c_int) {
    SIGHUP_RECEIVED.store(true, Ordering::Release);
}

/// Pause between prompt text and the submitting CR. The wrapped assistant
/// treats text+CR in one write as a paste; the gap makes the CR a submit.
const SUBMIT_PAUSE: Duration = Duration::from_millis(100);

/// Debounce window for resize forwarding
const RESIZE_DEBOUNCE: Duration = Duration::from_millis(50);

/// Handle for typing prompt text into the wrapped program.
///
/// Holds its own dup of the PTY master; a mutex serializes senders so two
/// prompts can't interleave mid-text.
pub struct PromptWriter {
    master: OwnedFd,
    gate: Mutex<()>,
}

impl PromptWriter {
    /// Write the prompt, pause, then submit with a bare CR.
    pub fn send_command(&self, text: &str) -> Result<()> {
        let _guard = self.gate.lock().unwrap();
        write_all(&self.master, text.as_bytes())?;
        std::thread::sleep(SUBMIT_PAUSE);
        write_all(&self.master, b"\r")
    }
}

impl PromptSink for PromptWriter {
    fn send_prompt(&self, text: &str) -> Result<()> {
        self.send_command(text)
    }
}

/// PTY proxy that owns the child process and forwards I/O.
pub struct Proxy {
    pty_master: OwnedFd,
    child: Child,
    _raw_guard: RawModeGuard,
    throttle: Option<OutputThrottle>,
    input_filter: Option<InputFilter>,
    last_resize: Option<Instant>,
}

impl Proxy {
    /// Spawn `command` under a fresh PTY sized to the current terminal.
    pub fn spawn(command: &str, args: &[&str]) -> Result<Self> {
        let config = Config::get();
        let winsize = terminal::window_size();
        let pty = openpty(&winsize, None).context("openpty failed")?;

        let raw_guard = RawModeGuard::engage()?;
        terminal::install_signal_handlers()?;

        let slave_fd = pty.slave.as_raw_fd();
        let master_fd = pty.master.as_raw_fd();

        let mut cmd = Command::new(command);
        cmd.args(args);
        if config.force_ansi && std::env::var("TERM").is_err() {
            cmd.env("TERM", "xterm-256color");
        }

        // SAFETY: the pre_exec closure runs in the child between fork() and
        // exec(). Everything called is async-signal-safe (setsid, ioctl,
        // dup2, close); the fds are plain i32s captured by value.
        let child = unsafe {
            cmd.pre_exec(move || {
                // New session, with the PTY slave as controlling terminal
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                if libc::ioctl(slave_fd, libc::TIOCSCTTY as libc::c_ulong, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                // Stdio onto the slave
                for fd in 0..=2 {
                    if libc::dup2(slave_fd, fd) == -1 {
                        return Err(io::Error::last_os_error());
                    }
                }
                if slave_fd > 2 {
                    libc::close(slave_fd);
                }
                // The child must not hold the master side; a retained ref
                // blocks SIGHUP delivery on PTY teardown.
                libc::close(master_fd);
                Ok(())
            })
            .spawn()
            .context("spawn failed")?
        };

        // Parent keeps only the master, non-blocking for the poll loop.
        drop(pty.slave);
        set_nonblocking(&pty.master)?;

        log_info(
            "pty",
            "spawn",
            &format!("wrapped '{}' (pid {})", command, child.id()),
        );

        Ok(Self {
            pty_master: pty.master,
            child,
            _raw_guard: raw_guard,
            throttle: config.output_throttle.then(OutputThrottle::new),
            input_filter: config
                .input_throttle
                .then(|| InputFilter::new(config.held_enter)),
            last_resize: None,
        })
    }

    /// A prompt-injection handle backed by a dup of the master fd.
    pub fn prompt_writer(&self) -> Result<PromptWriter> {
        let master = self
            .pty_master
            .try_clone()
            .context("failed to dup PTY master for prompt writer")?;
        Ok(PromptWriter {
            master,
            gate: Mutex::new(()),
        })
    }

    /// Run the proxy loop until the child exits or the terminal goes away.
    /// Returns the exit code to propagate.
    pub fn run(&mut self) -> Result<i32> {
        let stdin_fd = io::stdin();
        let stdout_fd = io::stdout();
        let mut buf = [0u8; 65536];

        spawn_parent_watchdog();

        loop {
            if SIGWINCH_RECEIVED.swap(false, Ordering::AcqRel) {
                self.forward_winsize();
            }
            if SIGINT_RECEIVED.swap(false, Ordering::AcqRel) {
                self.forward_signal(Signal::SIGINT);
            }
            if SIGTERM_RECEIVED.swap(false, Ordering::AcqRel) {
                self.forward_signal(Signal::SIGTERM);
                break;
            }
            if SIGHUP_RECEIVED.swap(false, Ordering::AcqRel) {
                // Terminal closed; the child gets its own SIGHUP on teardown
                break;
            }
            if PARENT_GONE.swap(false, Ordering::AcqRel) {
                log_warn("pty", "parent.gone", "parent process died, shutting down");
                break;
            }

            let now = Instant::now();
            let timeout = self.poll_timeout(now);

            let master_borrow = unsafe { BorrowedFd::borrow_raw(self.pty_master.as_raw_fd()) };
            let stdin_borrow = unsafe { BorrowedFd::borrow_raw(stdin_fd.as_raw_fd()) };
            let mut poll_fds = [
                PollFd::new(master_borrow, PollFlags::POLLIN),
                PollFd::new(stdin_borrow, PollFlags::POLLIN),
            ];

            match poll(&mut poll_fds, timeout) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(e) => bail!("poll failed: {}", e),
            }

            // PTY output → (throttle) → stdout
            if let Some(revents) = poll_fds[0].revents() {
                if revents.contains(PollFlags::POLLIN) {
                    match read(self.pty_master.as_fd(), &mut buf) {
                        Ok(0) => break, // EOF
                        Ok(n) => {
                            let now = Instant::now();
                            match self.throttle.as_mut() {
                                Some(throttle) => throttle.push(&buf[..n], now),
                                None => write_all(&stdout_fd, &buf[..n])?,
                            }
                        }
                        Err(Errno::EAGAIN) => {}
                        Err(Errno::EIO) => break, // child side closed
                        Err(e) => bail!("read from pty failed: {}", e),
                    }
                }
                if revents.contains(PollFlags::POLLHUP) {
                    break;
                }
            }

            // stdin → (input filter) → PTY
            if let Some(revents) = poll_fds[1].revents() {
                if revents.contains(PollFlags::POLLHUP) {
                    break; // terminal disconnected
                }
                if revents.contains(PollFlags::POLLIN) {
                    match read(stdin_fd.as_fd(), &mut buf) {
                        Ok(0) => break, // stdin EOF = terminal gone
                        Ok(n) => {
                            let now = Instant::now();
                            if let Some(throttle) = self.throttle.as_mut() {
                                throttle.note_input(now);
                            }
                            match self.input_filter.as_mut() {
                                Some(filter) => {
                                    let mapped = filter.process(&buf[..n], now);
                                    if !mapped.is_empty() {
                                        write_all(&self.pty_master, &mapped)?;
                                    }
                                }
                                None => write_all(&self.pty_master, &buf[..n])?,
                            }
                        }
                        Err(Errno::EAGAIN) => {}
                        Err(e) => bail!("read from stdin failed: {}", e),
                    }
                }
            }

            // Deadline-driven work: flush throttled output, release deferred input
            let now = Instant::now();
            if let Some(data) = self.throttle.as_mut().and_then(|t| t.take_due(now)) {
                write_all(&stdout_fd, &data)?;
            }
            if let Some(bytes) = self.input_filter.as_mut().and_then(|f| f.take_expired(now)) {
                write_all(&self.pty_master, &bytes)?;
            }
        }

        // Push out whatever the throttle still holds
        if let Some(data) = self.throttle.as_mut().and_then(|t| t.drain()) {
            let _ = write_all(&stdout_fd, &data);
        }

        // Child is the session leader (setsid), so PID == PGID; signal the
        // whole group to take the assistant's own children down with it.
        let pgid = Pid::from_raw(-(self.child.id() as i32));
        let _ = kill(pgid, Signal::SIGTERM);

        self.drain_and_wait_child()
    }

    /// Poll timeout: the earliest pending deadline, or a slow idle tick.
    fn poll_timeout(&self, now: Instant) -> PollTimeout {
        let mut deadline: Option<Instant> = None;
        if let Some(t) = self.throttle.as_ref().and_then(|t| t.next_deadline(now)) {
            deadline = Some(deadline.map_or(t, |d: Instant| d.min(t)));
        }
        if let Some(t) = self.input_filter.as_ref().and_then(|f| f.next_deadline()) {
            deadline = Some(deadline.map_or(t, |d: Instant| d.min(t)));
        }

        let millis = match deadline {
            Some(d) => d.saturating_duration_since(now).as_millis().clamp(1, 1000) as u16,
            None => 1000,
        };
        PollTimeout::from(millis)
    }

    fn forward_winsize(&mut self) {
        if let Some(last) = self.last_resize {
            if last.elapsed() < RESIZE_DEBOUNCE {
                return;
            }
        }
        self.last_resize = Some(Instant::now());

        let winsize = terminal::window_size();
        // SAFETY: pty_master is an OwnedFd valid for the Proxy's lifetime;
        // TIOCSWINSZ with a valid Winsize is best-effort, failure only means
        // the child keeps its old size.
        unsafe {
            libc::ioctl(
                self.pty_master.as_raw_fd(),
                libc::TIOCSWINSZ as libc::c_ulong,
                &winsize,
            );
        }
    }

    fn forward_signal(&self, signal: Signal) {
        let pgid = Pid::from_raw(-(self.child.id() as i32));
        let _ = kill(pgid, signal);
    }

    /// Wait for the child while draining the PTY master to prevent deadlock.
    ///
    /// The child may keep writing during shutdown; with nobody reading, the
    /// kernel buffer fills and its write() blocks against our waitpid().
    /// Drain in a non-blocking loop, escalating to SIGKILL on timeout.
    fn drain_and_wait_child(&mut self) -> Result<i32> {
        let mut buf = [0u8; 65536];
        let deadline = Instant::now() + Duration::from_secs(5);

        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return Ok(exit_code_from_status(status)),
                Ok(None) => {}
                Err(e) => bail!("wait failed: {}", e),
            }

            if Instant::now() > deadline {
                let pgid = Pid::from_raw(-(self.child.id() as i32));
                let _ = kill(pgid, Signal::SIGKILL);
                let kill_deadline = Instant::now() + Duration::from_secs(2);
                while Instant::now() < kill_deadline {
                    match self.child.try_wait() {
                        Ok(Some(status)) => return Ok(exit_code_from_status(status)),
                        Ok(None) => std::thread::sleep(Duration::from_millis(50)),
                        Err(e) => bail!("wait after SIGKILL failed: {}", e),
                    }
                }
                // Stuck in uninterruptible sleep; give up
                return Ok(1);
            }

            match read(self.pty_master.as_fd(), &mut buf) {
                Ok(0) | Err(Errno::EIO) => {
                    // Child side closed; a blocking wait is safe now
                    match self.child.wait() {
                        Ok(status) => return Ok(exit_code_from_status(status)),
                        Err(e) => bail!("wait failed: {}", e),
                    }
                }
                Ok(_) => {} // drained some shutdown output
                Err(_) => std::thread::sleep(Duration::from_millis(50)),
            }
        }
    }
}

/// Watch for the parent process dying (e.g. the launching shell was killed)
/// so the wrapper doesn't linger orphaned.
fn spawn_parent_watchdog() {
    let initial = nix::unistd::getppid();
    std::thread::spawn(move || {
        loop {
            if nix::unistd::getppid() != initial {
                PARENT_GONE.store(true, Ordering::Release);
                return;
            }
            std::thread::sleep(Duration::from_secs(1));
        }
    });
}

fn exit_code_from_status(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(code) = status.code() {
        code
    } else if let Some(signal) = status.signal() {
        128 + signal
    } else {
        1
    }
}

fn set_nonblocking<Fd: AsFd>(fd: &Fd) -> Result<()> {
    let flags = fcntl(fd.as_fd(), FcntlArg::F_GETFL).context("fcntl F_GETFL failed")?;
    let flags = OFlag::from_bits_truncate(flags);
    fcntl(fd.as_fd(), FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))
        .context("fcntl F_SETFL failed")?;
    Ok(())
}

fn write_all<F: AsFd>(fd: &F, data: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < data.len() {
        match write(fd, &data[written..]) {
            Ok(n) => written += n,
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => continue,
            Err(e) => bail!("write failed: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_plain() {
        use std::os::unix::process::ExitStatusExt;
        let status = ExitStatus::from_raw(0);
        assert_eq!(exit_code_from_status(status), 0);
    }

    #[test]
    fn test_exit_code_from_signal() {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status for death by SIGKILL (9)
        let status = ExitStatus::from_raw(9);
        assert_eq!(exit_code_from_status(status), 128 + 9);
    }

    #[test]
    fn test_exit_code_nonzero() {
        use std::os::unix::process::ExitStatusExt;
        // Exit code 3 lives in the high byte of a raw wait status
        let status = ExitStatus::from_raw(3 << 8);
        assert_eq!(exit_code_from_status(status), 3);
    }

    #[test]
    fn test_write_all_to_pipe() {
        use nix::unistd::pipe;
        let (read_end, write_end) = pipe().unwrap();
        write_all(&write_end, b"hello pty").unwrap();
        let mut buf = [0u8; 16];
        let n = read(read_end.as_fd(), &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello pty");
    }
}
