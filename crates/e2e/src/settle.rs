//! Bounded waiting for effects to become observable

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

/// How long to keep re-checking an expectation, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlePolicy {
    pub timeout_ms: u64,
    pub interval_ms: u64,
    /// How long persisted state must stay unchanged after a drive action
    pub quiet_ms: u64,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            interval_ms: 100,
            quiet_ms: 500,
        }
    }
}

impl SettlePolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            interval_ms: interval.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn with_quiet(mut self, quiet: Duration) -> Self {
        self.quiet_ms = quiet.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        // A zero interval would spin without yielding to the subject.
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn quiet(&self) -> Duration {
        Duration::from_millis(self.quiet_ms)
    }
}

/// Outcome of a single look at the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The expectation holds
    Matched,
    /// A value is there, but it is the wrong one
    Mismatch(String),
    /// Nothing to compare against yet
    Absent,
}

impl Probe {
    pub fn compare<T: PartialEq + std::fmt::Debug>(expected: &T, actual: &T) -> Self {
        if expected == actual {
            Probe::Matched
        } else {
            Probe::Mismatch(format!("{:?}", actual))
        }
    }
}

/// Re-run `probe` until it matches or the policy's timeout expires.
///
/// The probe always runs at least once. Errors from the probe end the wait
/// immediately. On expiry the result is `AssertionFailed` carrying the last
/// observed value, or `SettleTimeout` when no value was ever observed.
pub async fn poll_until<F, Fut>(
    policy: &SettlePolicy,
    subject: &str,
    expected: &str,
    mut probe: F,
) -> HarnessResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Probe>>,
{
    let start = Instant::now();
    let mut last_seen: Option<String> = None;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match probe().await? {
            Probe::Matched => {
                if attempts > 1 {
                    debug!("{} settled after {} checks", subject, attempts);
                }
                return Ok(());
            }
            Probe::Mismatch(actual) => last_seen = Some(actual),
            Probe::Absent => {}
        }

        if start.elapsed() >= policy.timeout() {
            break;
        }
        sleep(policy.interval()).await;
    }

    let waited_ms = start.elapsed().as_millis() as u64;
    match last_seen {
        Some(actual) => Err(HarnessError::AssertionFailed {
            subject: subject.to_string(),
            expected: expected.to_string(),
            actual,
        }),
        None => Err(HarnessError::SettleTimeout {
            subject: subject.to_string(),
            expected: expected.to_string(),
            waited_ms,
        }),
    }
}

/// Re-read a value until it has stayed the same for the policy's quiet window.
///
/// Debounced writes land some time after the action that caused them, so a
/// single read cannot tell "done" from "not yet". Returns the settled value.
/// Fails with `SettleTimeout` when the value is still changing after
/// `timeout + quiet`.
pub async fn wait_for_quiet<T, F, Fut>(
    policy: &SettlePolicy,
    subject: &str,
    mut read: F,
) -> HarnessResult<T>
where
    T: PartialEq,
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<T>>,
{
    let start = Instant::now();
    let deadline = policy.timeout() + policy.quiet();
    let mut last = read().await?;
    let mut changed_at = start;
    let mut changes = 0u32;

    loop {
        if changed_at.elapsed() >= policy.quiet() {
            if changes > 0 {
                debug!("{} went quiet after {} change(s)", subject, changes);
            }
            return Ok(last);
        }
        if start.elapsed() >= deadline {
            return Err(HarnessError::SettleTimeout {
                subject: subject.to_string(),
                expected: format!("no change for {} ms", policy.quiet_ms),
                waited_ms: start.elapsed().as_millis() as u64,
            });
        }

        sleep(policy.interval()).await;
        let current = read().await?;
        if current != last {
            last = current;
            changed_at = Instant::now();
            changes += 1;
        }
    }
}
