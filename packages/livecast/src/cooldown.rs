use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Per-room pause of all outbound generation and synthesis calls after a
/// rate-limit signal.
#[derive(Debug)]
pub struct CooldownGate {
    default: Duration,
    until: Mutex<Option<Instant>>,
}

impl CooldownGate {
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            until: Mutex::new(None),
        }
    }

    /// Pause for the configured window, or longer if the provider asked for
    /// it. Extends an active pause, never shortens it. Returns the remaining
    /// pause.
    pub fn trip(&self, retry_after: Option<Duration>) -> Duration {
        let wanted = retry_after.map_or(self.default, |hint| hint.max(self.default));
        let candidate = Instant::now() + wanted;
        let mut until = self.until.lock();
        let end = match *until {
            Some(current) if current > candidate => current,
            _ => candidate,
        };
        *until = Some(end);
        end.saturating_duration_since(Instant::now())
    }

    pub fn remaining(&self) -> Option<Duration> {
        let until = (*self.until.lock())?;
        let left = until.saturating_duration_since(Instant::now());
        (!left.is_zero()).then_some(left)
    }

    pub fn is_active(&self) -> bool {
        self.remaining().is_some()
    }

    /// Clear an elapsed pause. Returns true exactly once per pause, when it
    /// has run out.
    pub fn take_expired(&self) -> bool {
        let mut until = self.until.lock();
        match *until {
            Some(end) if end <= Instant::now() => {
                *until = None;
                true
            }
            _ => false,
        }
    }
}
