//! Session bookkeeping. Pure timing logic with the current time passed in,
//! so every transition can be exercised without a scheduler.

use serde::{Deserialize, Serialize};

use crate::{KenshoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Running,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    total_seconds: u64,
    remaining_seconds: u64,
    start_ms: Option<u64>,
    state: SessionState,
}

impl Session {
    pub fn new(duration_minutes: f64) -> Result<Self> {
        let total_seconds = seconds_from_minutes(duration_minutes)?;
        Ok(Self {
            total_seconds,
            remaining_seconds: total_seconds,
            start_ms: None,
            state: SessionState::Idle,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn start_ms(&self) -> Option<u64> {
        self.start_ms
    }

    pub fn end_ms(&self) -> Option<u64> {
        self.start_ms.map(|start| start + self.total_ms())
    }

    fn total_ms(&self) -> u64 {
        self.total_seconds * 1_000
    }

    /// Replaces the duration. Only an idle session can be reconfigured, and an
    /// invalid duration leaves the current one untouched.
    pub fn configure(&mut self, duration_minutes: f64) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(KenshoError::SessionActive);
        }
        let total_seconds = seconds_from_minutes(duration_minutes)?;
        self.total_seconds = total_seconds;
        self.remaining_seconds = total_seconds;
        Ok(())
    }

    /// Idle → Running. Returns `false` without touching anything when the
    /// session is not idle.
    pub fn begin(&mut self, now_ms: u64) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.start_ms = Some(now_ms);
        self.remaining_seconds = self.total_seconds;
        self.state = SessionState::Running;
        true
    }

    /// Recomputes the whole seconds left. Returns the new value only when it
    /// differs from the last observation.
    pub fn observe(&mut self, now_ms: u64) -> Option<u64> {
        if self.state != SessionState::Running {
            return None;
        }
        let end_ms = self.end_ms()?;
        let left_ms = end_ms.saturating_sub(now_ms);
        let left = left_ms.div_ceil(1_000).min(self.total_seconds);
        if left == self.remaining_seconds {
            None
        } else {
            self.remaining_seconds = left;
            Some(left)
        }
    }

    /// Fraction of the session elapsed at `now_ms`, clamped to [0, 1].
    pub fn progress(&self, now_ms: u64) -> f64 {
        match (self.state, self.start_ms) {
            (SessionState::Complete, _) => 1.0,
            (SessionState::Running, Some(start)) => {
                let elapsed = now_ms.saturating_sub(start) as f64;
                (elapsed / self.total_ms() as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.state == SessionState::Running
            && self.end_ms().map(|end| now_ms >= end).unwrap_or(false)
    }

    /// Running → Complete. Returns `false` when the session was not running.
    pub fn finish(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.remaining_seconds = 0;
        self.state = SessionState::Complete;
        true
    }

    /// Any state → Idle with the full duration restored.
    pub fn rewind(&mut self) {
        self.remaining_seconds = self.total_seconds;
        self.start_ms = None;
        self.state = SessionState::Idle;
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

/// Converts a minute count into whole seconds, rejecting anything that is not
/// a positive finite duration of at least one second.
pub fn seconds_from_minutes(duration_minutes: f64) -> Result<u64> {
    if !duration_minutes.is_finite() || duration_minutes <= 0.0 {
        return Err(KenshoError::InvalidDuration(duration_minutes));
    }
    let seconds = (duration_minutes * 60.0).round();
    if seconds < 1.0 || seconds > u32::MAX as f64 {
        return Err(KenshoError::InvalidDuration(duration_minutes));
    }
    Ok(seconds as u64)
}

/// Format seconds as "MM:SS". Minutes keep counting past 99.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
