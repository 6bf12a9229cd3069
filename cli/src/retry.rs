//! Retries for relayer and disclosure round-trips
//!
//! Only transient failures are retried: transport errors, 5xx responses and
//! messages that point at the relayer or network. Ledger rejections are final.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::client::ClientError;
use scribe_config::RelayerConfig;

const TRANSIENT_MARKERS: &[&str] = &[
    "relayer",
    "backend",
    "connection",
    "task has stopped",
    "network",
    "timeout",
];

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RelayerConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay_ms: config.retry_base_ms,
        }
    }

    /// Wait after the `attempt`-th failure (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

pub fn is_transient(err: &ClientError) -> bool {
    match err {
        ClientError::Http(e) => {
            e.is_connect()
                || e.is_timeout()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        ClientError::Rejected { status, message, .. } => {
            if *status >= 500 {
                return true;
            }
            let message = message.to_lowercase();
            TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
        }
        ClientError::Decode(_) => false,
    }
}

/// Run `op` until it succeeds, fails terminally, or attempts run out
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_transient(&e) => {
                let delay = policy.delay(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label, attempt, policy.max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rejected(status: u16, message: &str) -> ClientError {
        ClientError::Rejected {
            status,
            code: "X".into(),
            message: message.into(),
        }
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1000,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(1000));
        assert_eq!(policy.delay(2), Duration::from_millis(2000));
        assert_eq!(policy.delay(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&rejected(503, "ledger service unavailable")));
        assert!(is_transient(&rejected(400, "Relayer not ready")));
        assert!(is_transient(&rejected(400, "network hiccup")));
        assert!(!is_transient(&rejected(409, "already submitted")));
        assert!(!is_transient(&rejected(403, "caller is not the owner")));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast(3), "encrypt", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(rejected(503, "backend busy"))
            } else {
                Ok(7u32)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast(3), "decrypt", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(rejected(503, "backend busy"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&fast(3), "prepare", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(rejected(409, "paper has no scores yet"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
