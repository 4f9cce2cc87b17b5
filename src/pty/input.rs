//! User-input remapping.
//!
//! The wrapped assistant treats Enter as "submit", which makes multi-line
//! prompts painful. The filter inverts that: plain Enter becomes `\` +
//! Enter (a newline in the assistant's input box) and Ctrl+J sends the
//! real submit. Optional held-Enter detection lets a deliberately held key
//! still submit: the first CR of a potential burst is deferred one repeat
//! window, and a rapid run of CRs passes through raw. Deferred bytes
//! surface to the proxy loop via an explicit deadline, not a timer thread.

use std::time::{Duration, Instant};

/// Rapid CR presses needed to count as a held key
const HELD_THRESHOLD: u32 = 3;

/// Maximum gap between presses that still counts as the same burst
const REPEAT_WINDOW: Duration = Duration::from_millis(500);

/// Deferred output waiting for its deadline
struct Pending {
    bytes: Vec<u8>,
    deadline: Instant,
}

/// Stateful stdin filter applied before forwarding to the PTY master.
pub struct InputFilter {
    held_enter_mode: bool,
    consecutive: u32,
    last_cr: Option<Instant>,
    held: bool,
    pending: Option<Pending>,
}

impl InputFilter {
    pub fn new(held_enter_mode: bool) -> Self {
        Self {
            held_enter_mode,
            consecutive: 0,
            last_cr: None,
            held: false,
            pending: None,
        }
    }

    /// Filter one chunk of user input; the result goes to the PTY master.
    /// May hold bytes back; poll [`next_deadline`] and [`take_expired`].
    pub fn process(&mut self, input: &[u8], now: Instant) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len() * 2);

        for &byte in input {
            match byte {
                // Ctrl+J: the reliable way to send a real Enter.
                b'\n' => out.push(b'\r'),
                b'\r' if !self.held_enter_mode => {
                    out.push(b'\\');
                    out.push(b'\r');
                }
                b'\r' => self.process_cr(&mut out, now),
                _ => {
                    // Any other key ends a potential burst: flush the
                    // deferred mapping in order, then the key itself.
                    if self.held_enter_mode {
                        if let Some(pending) = self.pending.take() {
                            out.extend_from_slice(&pending.bytes);
                        }
                        self.consecutive = 0;
                        self.held = false;
                    }
                    out.push(byte);
                }
            }
        }

        out
    }

    /// Held-Enter bookkeeping for one CR.
    fn process_cr(&mut self, out: &mut Vec<u8>, now: Instant) {
        let same_burst = self
            .last_cr
            .is_some_and(|t| now.duration_since(t) <= REPEAT_WINDOW);

        if self.consecutive == 0 || !same_burst {
            self.consecutive = 1;
            self.held = false;
        } else {
            self.consecutive += 1;
            if self.consecutive >= HELD_THRESHOLD {
                self.held = true;
            }
        }
        self.last_cr = Some(now);

        if self.held {
            // Held key: drop the deferred newline mapping, submit raw.
            self.pending = None;
            out.push(b'\r');
        } else if self.consecutive == 1 {
            // First CR of a possible burst: defer the newline mapping.
            self.pending = Some(Pending {
                bytes: vec![b'\\', b'\r'],
                deadline: now + REPEAT_WINDOW,
            });
        } else {
            out.push(b'\r');
        }
    }

    /// Deadline of deferred bytes, for the proxy's poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Deferred bytes whose deadline has passed, if any.
    pub fn take_expired(&mut self, now: Instant) -> Option<Vec<u8>> {
        if self.pending.as_ref()?.deadline > now {
            return None;
        }
        self.pending.take().map(|p| p.bytes)
    }
}
