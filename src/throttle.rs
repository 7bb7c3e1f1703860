use std::time::{Duration, Instant};

pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Cooldown on the fetch control. At most one countdown runs; `start`
/// replaces whatever was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchThrottle {
    cooldown: Duration,
    started: Option<Instant>,
}

impl Default for FetchThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_COOLDOWN_SECS))
    }
}

impl FetchThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            started: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.started = Some(now);
    }

    /// Whole seconds left before another fetch is allowed, `None` when ready.
    pub fn remaining_secs(&self, now: Instant) -> Option<u64> {
        let started = self.started?;
        let elapsed = now.saturating_duration_since(started).as_secs();
        let remaining = self.cooldown.as_secs().saturating_sub(elapsed);
        (remaining > 0).then_some(remaining)
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.remaining_secs(now).is_none()
    }

    pub fn label(&self, now: Instant) -> String {
        match self.remaining_secs(now) {
            Some(secs) => format!("Fetch ({secs}s)"),
            None => "Fetch".to_string(),
        }
    }
}
