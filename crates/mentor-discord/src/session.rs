use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Gateway session phase. Exactly one session exists per process; the
/// supervisor is the only writer of `Connecting`/`RateLimited`, the event
/// handler the only writer of `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Ready,
    RateLimited,
}

/// Shared session bookkeeping between the supervisor and the event handler.
///
/// Backoff decisions use the monotonic clock only — wall-clock skew must not
/// shorten or lengthen a retry window.
pub struct SessionState {
    phase: Mutex<SessionPhase>,
    consecutive_failures: AtomicU32,
    last_event_at: Mutex<Instant>,
    rate_limit_until: Mutex<Option<Instant>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(SessionPhase::Disconnected),
            consecutive_failures: AtomicU32::new(0),
            last_event_at: Mutex::new(Instant::now()),
            rate_limit_until: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().unwrap()
    }

    pub fn set_phase(&self, phase: SessionPhase) {
        *self.phase.lock().unwrap() = phase;
    }

    /// Called by the event handler on the gateway `Ready` event: the
    /// connection is healthy, so the retry counter starts over.
    pub fn mark_ready(&self) {
        self.set_phase(SessionPhase::Ready);
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.touch();
    }

    /// Stamp gateway activity for the liveness probe.
    pub fn touch(&self) {
        *self.last_event_at.lock().unwrap() = Instant::now();
    }

    pub fn last_event_age(&self) -> Duration {
        self.last_event_at.lock().unwrap().elapsed()
    }

    /// Record one more consecutive connection failure, returning the new count.
    pub fn record_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub fn failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    pub fn enter_rate_limited(&self, until: Instant) {
        self.set_phase(SessionPhase::RateLimited);
        *self.rate_limit_until.lock().unwrap() = Some(until);
    }

    pub fn leave_rate_limited(&self) {
        self.set_phase(SessionPhase::Disconnected);
        *self.rate_limit_until.lock().unwrap() = None;
        self.reset_failures();
    }

    pub fn rate_limited_remaining(&self) -> Option<Duration> {
        self.rate_limit_until
            .lock()
            .unwrap()
            .map(|until| until.saturating_duration_since(Instant::now()))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_resets_failures() {
        let state = SessionState::new();
        assert_eq!(state.record_failure(), 1);
        assert_eq!(state.record_failure(), 2);
        state.mark_ready();
        assert_eq!(state.failures(), 0);
        assert_eq!(state.phase(), SessionPhase::Ready);
    }

    #[test]
    fn rate_limit_roundtrip() {
        let state = SessionState::new();
        state.enter_rate_limited(Instant::now() + Duration::from_secs(60));
        assert_eq!(state.phase(), SessionPhase::RateLimited);
        assert!(state.rate_limited_remaining().unwrap() <= Duration::from_secs(60));
        state.leave_rate_limited();
        assert_eq!(state.phase(), SessionPhase::Disconnected);
        assert!(state.rate_limited_remaining().is_none());
    }
}
