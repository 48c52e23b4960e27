//! Bounded polling for asynchronously starting external services.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::SetupError;

/// Attempt budget and spacing for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of probe calls.
    pub attempts: u32,
    /// Sleep before each probe call.
    pub interval: Duration,
}

impl Default for PollPolicy {
    /// 120 attempts, 5 seconds apart: a ten minute budget.
    fn default() -> Self {
        Self {
            attempts: 120,
            interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    #[must_use]
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// The fatal error for `subsystem` exhausting this budget.
    #[must_use]
    pub fn timeout(&self, subsystem: &'static str) -> SetupError {
        SetupError::Timeout {
            subsystem,
            attempts: self.attempts,
            interval_secs: self.interval.as_secs(),
        }
    }
}

/// Sleep one interval, call `probe`, and stop at the first `Some`.
///
/// Returns `None` once `policy.attempts` probes came back empty; the probe
/// is never called more often than that. Probes must only observe.
pub async fn wait_for<T, F, Fut>(policy: &PollPolicy, what: &str, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=policy.attempts {
        tokio::time::sleep(policy.interval).await;
        if let Some(value) = probe().await {
            info!(target: "audit", what, attempt, "ready");
            return Some(value);
        }
        debug!(what, attempt, max_attempts = policy.attempts, "not ready yet");
    }
    warn!(target: "audit", what, attempts = policy.attempts, "gave up waiting");
    None
}

/// `Some(s)` unless `s` is empty or whitespace.
#[must_use]
pub fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
