//! Adaptive output coalescing.
//!
//! Raw PTY output arrives in bursts that repaint the wrapped tool's TUI
//! many times per frame; writing each burst straight through flickers.
//! The throttle buffers output and releases it on a short delay: one
//! frame at ~60fps while the user is typing (snappy echo), ~30fps when
//! idle (less repaint churn). The proxy's poll loop drives the clock; no
//! timer threads. Byte content is never altered, only batched.

use std::time::{Duration, Instant};

/// Flush delay while the user is actively typing (~60fps)
const FAST_DELAY: Duration = Duration::from_millis(16);

/// Flush delay when input has gone quiet (~30fps)
const SLOW_DELAY: Duration = Duration::from_millis(33);

/// How long after the last keystroke the fast delay still applies
const INPUT_WINDOW: Duration = Duration::from_secs(2);

/// Output buffer with an input-activity-adaptive flush delay.
pub struct OutputThrottle {
    buf: Vec<u8>,
    /// When the oldest unflushed byte arrived
    pending_since: Option<Instant>,
    /// Last user keystroke; None until the first one
    last_input: Option<Instant>,
}

impl OutputThrottle {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            pending_since: None,
            last_input: None,
        }
    }

    /// Record user input activity; switches the throttle into fast mode.
    pub fn note_input(&mut self, now: Instant) {
        self.last_input = Some(now);
    }

    fn delay(&self, now: Instant) -> Duration {
        match self.last_input {
            Some(t) if now.duration_since(t) < INPUT_WINDOW => FAST_DELAY,
            _ => SLOW_DELAY,
        }
    }

    /// Buffer a chunk of PTY output.
    pub fn push(&mut self, data: &[u8], now: Instant) {
        if self.buf.is_empty() {
            self.pending_since = Some(now);
        }
        self.buf.extend_from_slice(data);
    }

    /// When the pending data should flush, if any is pending.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        self.pending_since.map(|since| since + self.delay(now))
    }

    /// Take the buffered data if its flush deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Vec<u8>> {
        let deadline = self.next_deadline(now)?;
        if now < deadline {
            return None;
        }
        self.pending_since = None;
        Some(std::mem::take(&mut self.buf))
    }

    /// Take everything regardless of deadline (EOF/shutdown).
    pub fn drain(&mut self) -> Option<Vec<u8>> {
        self.pending_since = None;
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_throttle_has_no_deadline() {
        let throttle = OutputThrottle::new();
        assert!(throttle.next_deadline(Instant::now()).is_none());
    }

    #[test]
    fn test_data_held_until_deadline() {
        let mut throttle = OutputThrottle::new();
        let t0 = Instant::now();
        throttle.push(b"hello", t0);

        assert!(throttle.take_due(t0).is_none());
        assert!(throttle.take_due(t0 + Duration::from_millis(10)).is_none());
        let flushed = throttle.take_due(t0 + SLOW_DELAY).unwrap();
        assert_eq!(flushed, b"hello");
    }

    #[test]
    fn test_idle_uses_slow_delay() {
        let mut throttle = OutputThrottle::new();
        let t0 = Instant::now();
        throttle.push(b"x", t0);
        assert_eq!(throttle.next_deadline(t0), Some(t0 + SLOW_DELAY));
    }

    #[test]
    fn test_recent_input_uses_fast_delay() {
        let mut throttle = OutputThrottle::new();
        let t0 = Instant::now();
        throttle.note_input(t0);
        throttle.push(b"x", t0 + Duration::from_millis(5));
        let deadline = throttle.next_deadline(t0 + Duration::from_millis(5)).unwrap();
        assert_eq!(deadline, t0 + Duration::from_millis(5) + FAST_DELAY);
    }

    #[test]
    fn test_input_window_expires_back_to_slow() {
        let mut throttle = OutputThrottle::new();
        let t0 = Instant::now();
        throttle.note_input(t0);
        let later = t0 + INPUT_WINDOW + Duration::from_millis(1);
        throttle.push(b"x", later);
        assert_eq!(throttle.next_deadline(later), Some(later + SLOW_DELAY));
    }

    #[test]
    fn test_chunks_coalesce_into_one_flush() {
        let mut throttle = OutputThrottle::new();
        let t0 = Instant::now();
        throttle.push(b"first ", t0);
        throttle.push(b"second", t0 + Duration::from_millis(5));

        let flushed = throttle.take_due(t0 + SLOW_DELAY).unwrap();
        assert_eq!(flushed, b"first second");
        // Buffer resets after a flush.
        assert!(throttle.take_due(t0 + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_deadline_anchored_to_first_pending_byte() {
        let mut throttle = OutputThrottle::new();
        let t0 = Instant::now();
        throttle.push(b"a", t0);
        throttle.push(b"b", t0 + Duration::from_millis(30));
        // Deadline comes from the first byte, not the latest push.
        assert_eq!(throttle.next_deadline(t0), Some(t0 + SLOW_DELAY));
    }

    #[test]
    fn test_drain_returns_everything_immediately() {
        let mut throttle = OutputThrottle::new();
        throttle.push(b"tail", Instant::now());
        assert_eq!(throttle.drain().unwrap(), b"tail");
        assert!(throttle.drain().is_none());
    }

    #[test]
    fn test_binary_data_passes_untouched() {
        let mut throttle = OutputThrottle::new();
        let t0 = Instant::now();
        let data = b"\x1b[2J\r\n\x00\xff";
        throttle.push(data, t0);
        assert_eq!(throttle.take_due(t0 + SLOW_DELAY).unwrap(), data);
    }
}
