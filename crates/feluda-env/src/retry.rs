//! Bounded-timeout fetching with exponential backoff.

use std::time::Duration;

use feluda_config::FetchConfig;
use feluda_core::entities::{AnalysisWindow, EnvironmentalSnapshot};
use feluda_core::geo::GeoPoint;

use crate::{EnvironmentalSource, error::EnvError};

/// Longest we honour a provider's `Retry-After`.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.base_backoff_ms),
        }
    }
}

/// Fetch a snapshot, retrying transient failures.
///
/// Each attempt is bounded by `policy.timeout`. Non-transient errors stop
/// immediately. Returns [`EnvError::Exhausted`] once every attempt failed.
///
/// # Errors
///
/// Returns [`EnvError::Exhausted`] with the last underlying error message.
pub async fn fetch_with_retry<S: EnvironmentalSource>(
    source: &S,
    location: GeoPoint,
    window: AnalysisWindow,
    policy: &RetryPolicy,
) -> Result<EnvironmentalSnapshot, EnvError> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let outcome = tokio::time::timeout(policy.timeout, source.fetch_snapshot(location, window))
            .await
            .unwrap_or_else(|_| {
                Err(EnvError::Timeout {
                    timeout_ms: policy.timeout.as_millis(),
                })
            });

        let err = match outcome {
            Ok(snapshot) if snapshot.is_empty() => EnvError::Empty,
            Ok(snapshot) => {
                if attempts > 1 {
                    tracing::info!(provider = source.name(), attempts, "environmental fetch recovered");
                }
                return Ok(snapshot);
            }
            Err(err) => err,
        };

        let retry = attempts - 1;
        if !err.is_transient() || retry >= policy.max_retries {
            tracing::warn!(provider = source.name(), attempts, %err, "environmental data unavailable");
            return Err(EnvError::Exhausted {
                attempts,
                last: err.to_string(),
            });
        }

        let mut delay = policy.backoff(retry);
        if let EnvError::RateLimited { retry_after_secs } = err {
            delay = delay.max(Duration::from_secs(retry_after_secs).min(MAX_RETRY_AFTER));
        }
        tracing::debug!(provider = source.name(), attempts, ?delay, %err, "retrying environmental fetch");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::{TimeZone, Utc};
    use feluda_core::entities::EnvSample;

    /// Fails with a transient error until `succeed_on` attempts have been made.
    struct FlakySource {
        calls: AtomicU32,
        succeed_on: u32,
    }

    impl EnvironmentalSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch_snapshot(
            &self,
            _location: GeoPoint,
            window: AnalysisWindow,
        ) -> Result<EnvironmentalSnapshot, EnvError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call < self.succeed_on {
                return Err(EnvError::Api {
                    status: 503,
                    message: "busy".into(),
                });
            }
            Ok(EnvironmentalSnapshot {
                samples: vec![EnvSample::empty(window.start)],
                ..EnvironmentalSnapshot::default()
            })
        }
    }

    struct SlowSource;

    impl EnvironmentalSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch_snapshot(
            &self,
            _location: GeoPoint,
            _window: AnalysisWindow,
        ) -> Result<EnvironmentalSnapshot, EnvError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(EnvError::Empty)
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(20),
            max_retries,
            base_backoff: Duration::from_millis(1),
        }
    }

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let source = FlakySource { calls: AtomicU32::new(0), succeed_on: 3 };
        let snap = fetch_with_retry(&source, GeoPoint::new(0.0, 0.0), window(), &fast_policy(2))
            .await
            .unwrap();
        assert_eq!(snap.samples.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_retries_plus_one_attempts() {
        let source = FlakySource { calls: AtomicU32::new(0), succeed_on: 10 };
        let err = fetch_with_retry(&source, GeoPoint::new(0.0, 0.0), window(), &fast_policy(2))
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::Exhausted { attempts: 3, .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_error_stops_immediately() {
        let err = fetch_with_retry(&crate::UnavailableSource, GeoPoint::new(0.0, 0.0), window(), &fast_policy(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::Exhausted { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let err = fetch_with_retry(&SlowSource, GeoPoint::new(0.0, 0.0), window(), &fast_policy(1))
            .await
            .unwrap_err();
        match err {
            EnvError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(last.contains("timed out"), "{last}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.timeout, Duration::from_secs(10));
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
    }
}
