//! One-way readiness latch and the bounded polling loop that trips it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::core::platform::{Platform, PlatformError};

/// Flag that only ever goes from false to true.
#[derive(Debug, Default)]
pub struct ReadinessLatch(AtomicBool);

impl ReadinessLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReadyPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: 20,
        }
    }
}

#[derive(Debug)]
pub enum Readiness {
    Ready,
    Failed(PlatformError),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Check the platform at a fixed interval until it answers or the attempt
/// budget runs out. At least one attempt is always made.
pub async fn wait_until_ready(platform: &dyn Platform, policy: ReadyPolicy) -> Readiness {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match platform.connect().await {
            Ok(()) => {
                debug!(attempt, "platform is ready");
                return Readiness::Ready;
            }
            Err(err) => {
                debug!(attempt, error = %err, "platform not ready yet");
                last_error = Some(err);
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    let detail = last_error
        .map(|err| err.to_string())
        .unwrap_or_else(|| "no attempts made".to_string());
    Readiness::Failed(PlatformError::NotReady(format!(
        "gave up after {attempts} attempts: {detail}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::FakePlatform;

    fn quick_policy(max_attempts: u32) -> ReadyPolicy {
        ReadyPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[test]
    fn latch_is_one_way() {
        let latch = ReadinessLatch::new();
        assert!(!latch.is_set());
        latch.set();
        latch.set();
        assert!(latch.is_set());
    }

    #[tokio::test]
    async fn ready_after_transient_failures() {
        let platform = FakePlatform::new().unavailable_for(2);
        let readiness = wait_until_ready(&platform, quick_policy(5)).await;
        assert!(readiness.is_ready());
        assert_eq!(platform.connect_calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempt_budget() {
        let platform = FakePlatform::new().unavailable_for(10);
        let readiness = wait_until_ready(&platform, quick_policy(3)).await;
        assert!(matches!(readiness, Readiness::Failed(PlatformError::NotReady(_))));
        assert_eq!(platform.connect_calls(), 3);
    }
}
