//! Rate-limited debug diagnostics.
//!
//! The polling loop hits the same non-event ("foreground window is not
//! the target") ten times a second; logging each hit would drown the
//! output. This gate emits one line per key per interval, and nothing
//! at all when debug is off.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-key time-gated `tracing::debug!` emitter.
pub struct RateLimitedLog {
    enabled: bool,
    min_interval: Duration,
    last_emitted: HashMap<&'static str, Instant>,
}

impl RateLimitedLog {
    pub fn new(enabled: bool, min_interval: Duration) -> Self {
        Self {
            enabled,
            min_interval,
            last_emitted: HashMap::new(),
        }
    }

    /// A disabled gate that never emits.
    pub fn disabled() -> Self {
        Self::new(false, Duration::ZERO)
    }

    /// Emits the message if the gate for `key` is open, and closes it
    /// for the next `min_interval`. The message is built lazily.
    pub fn emit(&mut self, key: &'static str, message: impl FnOnce() -> String) {
        self.emit_at(key, Instant::now(), message)
    }

    fn emit_at(&mut self, key: &'static str, now: Instant, message: impl FnOnce() -> String) {
        if !self.should_emit(key, now) {
            return;
        }
        tracing::debug!(key, "{}", message());
        self.last_emitted.insert(key, now);
    }

    fn should_emit(&self, key: &'static str, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_emitted.get(key) {
            Some(last) => now.duration_since(*last) >= self.min_interval,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_gate_never_opens() {
        let gate = RateLimitedLog::disabled();
        assert!(!gate.should_emit("skip", Instant::now()));
    }

    #[test]
    fn test_gate_opens_once_per_interval() {
        let mut gate = RateLimitedLog::new(true, Duration::from_secs(2));
        let t0 = Instant::now();

        assert!(gate.should_emit("skip", t0));
        gate.emit_at("skip", t0, || "first".into());

        // Closed inside the interval, open again after it.
        assert!(!gate.should_emit("skip", t0 + Duration::from_millis(500)));
        assert!(gate.should_emit("skip", t0 + Duration::from_secs(2)));
    }

    #[test]
    fn test_keys_are_gated_independently() {
        let mut gate = RateLimitedLog::new(true, Duration::from_secs(2));
        let t0 = Instant::now();

        gate.emit_at("skip", t0, || "skip".into());
        assert!(gate.should_emit("layout", t0));
    }
}
