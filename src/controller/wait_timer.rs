use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Debounce timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Never started or already elapsed; the guarded action may run.
    Armed,
    /// Started; the guarded action must wait until the deadline.
    CoolingDown { until: DateTime<FixedOffset> },
}

/// Elapsed-time guard evaluated on each control cycle.
///
/// Nothing fires on its own: callers ask [`is_timeout`](Self::is_timeout)
/// and restart the cooldown with [`update`](Self::update).
#[derive(Debug, Clone)]
pub struct WaitTimer {
    timeout: Duration,
    state: TimerState,
}

impl WaitTimer {
    /// A timer that starts armed.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: TimerState::Armed,
        }
    }

    /// A timer whose first cooldown starts at `now`.
    pub fn started(timeout: Duration, now: DateTime<FixedOffset>) -> Self {
        let mut timer = Self::new(timeout);
        timer.update(now);
        timer
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_timeout(&self, now: DateTime<FixedOffset>) -> bool {
        match self.state {
            TimerState::Armed => true,
            TimerState::CoolingDown { until } => now >= until,
        }
    }

    /// Start a cooldown of the default length.
    pub fn update(&mut self, now: DateTime<FixedOffset>) {
        self.update_with(now, self.timeout);
    }

    /// Start a cooldown of a custom length; the default is left untouched.
    /// A deadline past chrono's range never elapses.
    pub fn update_with(&mut self, now: DateTime<FixedOffset>, timeout: Duration) {
        let until = now
            .checked_add_signed(timeout)
            .unwrap_or_else(|| DateTime::<Utc>::MAX_UTC.fixed_offset());
        self.state = TimerState::CoolingDown { until };
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Armed;
    }

    pub fn deadline(&self) -> Option<DateTime<FixedOffset>> {
        match self.state {
            TimerState::Armed => None,
            TimerState::CoolingDown { until } => Some(until),
        }
    }
}
