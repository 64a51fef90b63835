use std::thread;
use std::time::Duration;

use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::ssh::Remote;

/// Fixed-interval polling: `attempts` tries, `interval` apart. No
/// backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Run `probe` until it returns `true`. Returns the attempt that
    /// succeeded, or `None` once attempts are exhausted. No sleep
    /// follows the last attempt.
    pub fn poll(&self, mut probe: impl FnMut(u32) -> bool) -> Option<u32> {
        for attempt in 1..=self.attempts {
            if probe(attempt) {
                return Some(attempt);
            }
            if attempt < self.attempts {
                thread::sleep(self.interval);
            }
        }
        None
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(5))
    }
}

/// Remote command probing the application on the host loopback.
#[must_use]
pub fn probe_command(port: u16) -> String {
    format!("curl -fsS -o /dev/null http://localhost:{port}")
}

/// Poll the application's HTTP port from the remote host until it
/// answers.
pub fn wait_for_http(
    remote: &dyn Remote,
    name: &str,
    port: u16,
    policy: &RetryPolicy,
) -> DeployResult<u32> {
    info!("Waiting for {name} to answer on port {port}...");
    let probe = probe_command(port);

    policy
        .poll(|attempt| {
            let ok = remote.exec(&probe).is_ok();
            info!(
                "  Health check ({attempt}/{}): {}",
                policy.attempts,
                if ok { "up" } else { "not yet" }
            );
            ok
        })
        .ok_or_else(|| DeployError::HealthcheckTimeout(name.to_string(), policy.attempts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_stops_at_first_success() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;

        let hit = policy.poll(|attempt| {
            calls += 1;
            attempt == 3
        });

        assert_eq!(hit, Some(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn poll_gives_up_after_attempts() {
        let policy = RetryPolicy::new(4, Duration::ZERO);
        let mut calls = 0;

        let hit = policy.poll(|_| {
            calls += 1;
            false
        });

        assert_eq!(hit, None);
        assert_eq!(calls, 4);
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 10);
        assert_eq!(policy.interval, Duration::from_secs(5));
    }
}
