//! Loop state: the poll cursor and the Polling/Recovering phase

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::ReviewNotifierError;

/// Seconds since the Unix epoch; the server returns everything updated after it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PollCursor(i64);

impl PollCursor {
    pub fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn now() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(seconds as i64)
    }

    pub fn seconds(&self) -> i64 {
        self.0
    }

    /// Overwrite with the server-reported value. Server monotonicity is not
    /// assumed, so a smaller value is taken as-is.
    pub fn advance(&mut self, next: Option<i64>) -> bool {
        match next {
            Some(next) if next != self.0 => {
                self.0 = next;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for PollCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phase of the supervisor's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Polling,
    Recovering { consecutive_failures: u32 },
}

/// Mutable state owned by the supervisor
#[derive(Debug)]
pub struct LoopState {
    pub cursor: PollCursor,
    pub phase: LoopPhase,
    /// Text of the last failure reported to the chat, to avoid repeats
    pub last_reported_error: Option<String>,
}

impl LoopState {
    pub fn new(cursor: PollCursor) -> Self {
        Self {
            cursor,
            phase: LoopPhase::Polling,
            last_reported_error: None,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        match self.phase {
            LoopPhase::Polling => 0,
            LoopPhase::Recovering {
                consecutive_failures,
            } => consecutive_failures,
        }
    }

    pub fn record_success(&mut self) {
        self.phase = LoopPhase::Polling;
        self.last_reported_error = None;
    }

    pub fn record_failure(&mut self) -> u32 {
        let consecutive_failures = self.consecutive_failures().saturating_add(1);
        self.phase = LoopPhase::Recovering {
            consecutive_failures,
        };
        consecutive_failures
    }

    /// Returns true when `error` differs from the last reported failure, and
    /// remembers it as reported.
    pub fn should_report(&mut self, error: &ReviewNotifierError) -> bool {
        let text = error.to_string();
        if self.last_reported_error.as_deref() == Some(text.as_str()) {
            return false;
        }
        self.last_reported_error = Some(text);
        true
    }
}

/// Pause before the next cycle.
///
/// After a success this is `interval`. After `n` consecutive failures it is
/// `retry_interval * 2^(n-1)`, capped at `max_backoff`.
pub fn next_delay(
    phase: LoopPhase,
    interval: Duration,
    retry_interval: Duration,
    max_backoff: Duration,
) -> Duration {
    match phase {
        LoopPhase::Polling => interval,
        LoopPhase::Recovering {
            consecutive_failures,
        } => {
            let exponent = consecutive_failures.saturating_sub(1).min(31);
            retry_interval
                .checked_mul(1u32 << exponent)
                .unwrap_or(max_backoff)
                .min(max_backoff)
        }
    }
}
