//! Bounded polling primitive.
//!
//! "Wait up to `timeout` for a predicate to hold" is the only suspension
//! point in a scenario run. A timeout is an expected, reportable outcome
//! ([`WaitOutcome::TimedOut`], never an error), and the loop is guaranteed to
//! return within `timeout + poll_interval` of being invoked. Dropping the
//! future cancels the wait.

use std::time::Duration;

use tokio::time::Instant;

/// Fixed polling cadence used by every wait-type step.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Matched(T),
    TimedOut,
}

impl<T> WaitOutcome<T> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Matched(v) => Some(v),
            Self::TimedOut => None,
        }
    }
}

/// Poll `probe` at [`DEFAULT_POLL_INTERVAL`] until it yields a value or
/// `timeout` elapses.
pub async fn wait_for<T, F>(timeout: Duration, probe: F) -> WaitOutcome<T>
where
    F: FnMut() -> Option<T>,
{
    wait_for_every(timeout, DEFAULT_POLL_INTERVAL, probe).await
}

/// [`wait_for`] with an explicit poll interval.
///
/// The probe runs once immediately; the deadline is checked before each
/// sleep, so the worst-case return is one poll interval past the timeout.
pub async fn wait_for_every<T, F>(
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> WaitOutcome<T>
where
    F: FnMut() -> Option<T>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(value) = probe() {
            return WaitOutcome::Matched(value);
        }
        if Instant::now() >= deadline {
            return WaitOutcome::TimedOut;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
