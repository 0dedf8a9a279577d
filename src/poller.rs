// Poller Module - The single pending-poll timer
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Delay before the first poll after start-up.
    pub bootstrap: Duration,
    /// Delay between polls afterwards.
    pub steady: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        PollIntervals {
            bootstrap: Duration::from_millis(1000),
            steady: Duration::from_millis(5000),
        }
    }
}

/// At most one scheduled poll. Scheduling replaces whatever was pending.
#[derive(Debug, Default)]
pub struct PollTimer {
    deadline: Option<Instant>,
}

impl PollTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    /// Drop the pending poll. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// Resolve when `deadline` passes; never resolves for `None`.
///
/// Takes the deadline by value so the caller can keep mutating the timer's
/// owner inside other `select!` branches.
pub async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
