use chrono::{DateTime, TimeDelta, Utc};

/// Last accepted code for a session. Owned by the frame path only.
#[derive(Debug, Clone)]
pub struct DebounceState {
    last_code: Option<String>,
    last_time: Option<DateTime<Utc>>,
    cooldown: TimeDelta,
}

impl DebounceState {
    pub fn new(cooldown: TimeDelta) -> Self {
        Self {
            last_code: None,
            last_time: None,
            cooldown,
        }
    }

    pub fn last_code(&self) -> Option<&str> {
        self.last_code.as_deref()
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.last_time
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    /// Clamps `now` so that `last_time` never moves backwards.
    pub fn monotonic(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_time {
            Some(last) if now < last => last,
            _ => now,
        }
    }

    /// Must be called by the owner after every accepted candidate.
    pub fn record(&mut self, code: &str, now: DateTime<Utc>) {
        let now = self.monotonic(now);
        self.last_code = Some(code.to_string());
        self.last_time = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_code = None;
        self.last_time = None;
    }
}

/// Accept/suppress decision for a decoded candidate.
pub struct DebounceGate;

impl DebounceGate {
    /// Pure: a different code is always accepted, the same code only once
    /// more than `cooldown` has elapsed since it was last accepted.
    pub fn accept(candidate: &str, now: DateTime<Utc>, state: &DebounceState) -> bool {
        if state.last_code.as_deref() != Some(candidate) {
            return true;
        }
        match state.last_time {
            Some(last) => now - last > state.cooldown,
            None => true,
        }
    }
}
