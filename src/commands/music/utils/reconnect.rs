//! Bounded retry schedule for voice connections.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use super::voice::ConnectError;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(5),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStep {
    Wait(Duration),
    GiveUp(ConnectError),
}

/// Attempt counter walking the policy's delay schedule.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    policy: RetryPolicy,
    attempt: u32,
}

impl ReconnectState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// 1-based number of the attempt about to run.
    pub fn attempt(&self) -> u32 {
        self.attempt + 1
    }

    /// Delay after failed attempt `n` (0-based) is `base * 2^n`.
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        self.policy
            .base_delay
            .saturating_mul(2u32.saturating_pow(failed_attempt))
    }

    /// Records a failure. Non-transient errors and the last attempt end the run.
    pub fn on_failure(&mut self, err: ConnectError) -> RetryStep {
        let failed = self.attempt;
        self.attempt += 1;

        if !err.is_transient() || self.attempt >= self.policy.max_attempts {
            return RetryStep::GiveUp(err);
        }

        RetryStep::Wait(self.delay_for(failed))
    }
}

/// Runs `op` under `policy`, sleeping between transient failures.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, ConnectError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ConnectError>>,
{
    let mut state = ReconnectState::new(policy);

    loop {
        let attempt = state.attempt();
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    what, attempt, policy.max_attempts, err
                );
                match state.on_failure(err) {
                    RetryStep::Wait(delay) => tokio::time::sleep(delay).await,
                    RetryStep::GiveUp(err) => {
                        error!("{} gave up after attempt {}: {}", what, attempt, err);
                        return Err(err);
                    }
                }
            }
        }
    }
}
