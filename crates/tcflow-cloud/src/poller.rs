//! Waiting for remote objects to reach a target status

use crate::error::{CloudError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Polls a describe call until every tracked identifier reports a target status
#[derive(Debug, Clone)]
pub struct StatusPoller {
    /// Deadline for the whole wait
    pub timeout: Duration,

    /// Delay between two describe calls
    pub interval: Duration,
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            interval: Duration::from_secs(3),
        }
    }
}

impl StatusPoller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Block until all of `ids` report one of `targets`.
    ///
    /// `describe` returns the current status per identifier; identifiers it
    /// does not mention yet are treated like any other non-target status.
    /// Returns the final identifier → status mapping. On timeout the partial
    /// mapping is dropped and [`CloudError::Timeout`] names what was pending.
    pub async fn wait_for<F, Fut>(
        &self,
        ids: &[String],
        targets: &[&str],
        mut describe: F,
    ) -> Result<HashMap<String, String>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HashMap<String, String>>>,
    {
        let start = Instant::now();

        loop {
            let observed = describe().await?;

            let statuses: HashMap<String, String> = ids
                .iter()
                .filter_map(|id| observed.get(id).map(|s| (id.clone(), s.clone())))
                .collect();

            let pending: Vec<String> = ids
                .iter()
                .filter(|id| {
                    !statuses
                        .get(*id)
                        .is_some_and(|s| targets.contains(&s.as_str()))
                })
                .map(|id| match statuses.get(id) {
                    Some(status) => format!("{}={}", id, status),
                    None => format!("{}=<absent>", id),
                })
                .collect();

            if pending.is_empty() {
                return Ok(statuses);
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Err(CloudError::timeout(
                    format!("waiting for {} to reach {}", ids.join(","), targets.join("|")),
                    format!("still pending: {}", pending.join(", ")),
                ));
            }

            tracing::debug!(
                "Waiting for {} (elapsed {:?})",
                pending.join(", "),
                elapsed
            );
            sleep(self.interval.min(self.timeout - elapsed)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn statuses(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_mapping_once_all_reach_target() {
        let calls = AtomicU32::new(0);
        let poller = StatusPoller::new(Duration::from_secs(60), Duration::from_secs(2));
        let tracked = ids(&["ins-1", "ins-2"]);

        let result = poller
            .wait_for(&tracked, &["RUNNING"], || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(match n {
                        0 => statuses(&[("ins-1", "PENDING")]),
                        1 => statuses(&[("ins-1", "RUNNING"), ("ins-2", "PENDING")]),
                        _ => statuses(&[
                            ("ins-1", "RUNNING"),
                            ("ins-2", "RUNNING"),
                            ("ins-other", "STOPPED"),
                        ]),
                    })
                }
            })
            .await
            .unwrap();

        assert_eq!(result, statuses(&[("ins-1", "RUNNING"), ("ins-2", "RUNNING")]));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_target_status_is_accepted() {
        let poller = StatusPoller::new(Duration::from_secs(10), Duration::from_secs(1));
        let tracked = ids(&["ins-1", "ins-2"]);

        let result = poller
            .wait_for(&tracked, &["STOPPED", "RUNNING"], || async {
                Ok(statuses(&[("ins-1", "STOPPED"), ("ins-2", "RUNNING")]))
            })
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_one_never_arrives() {
        let poller = StatusPoller::new(Duration::from_secs(9), Duration::from_secs(3));
        let tracked = ids(&["ins-1", "ins-2"]);
        let start = Instant::now();

        let err = poller
            .wait_for(&tracked, &["RUNNING"], || async {
                Ok(statuses(&[("ins-1", "RUNNING"), ("ins-2", "LAUNCH_FAILED")]))
            })
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("ins-2=LAUNCH_FAILED"));
        assert!(!err.to_string().contains("ins-1=RUNNING"));
        assert!(start.elapsed() >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_failure_propagates() {
        let poller = StatusPoller::default();
        let tracked = ids(&["vpc-1"]);

        let err = poller
            .wait_for(&tracked, &["AVAILABLE"], || async {
                Err(CloudError::Transport("dns failure".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Transport(_)));
    }
}
