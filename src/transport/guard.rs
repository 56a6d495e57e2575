//! Deadline and cancellation bounds around one physical attempt.
//!
//! [`bounded`] races a request future against an optional per-attempt
//! timeout and an optional external [`CancellationToken`], and reports
//! which bound fired through distinct error variants:
//! [`DiffioError::Timeout`] for the deadline, [`DiffioError::Cancelled`]
//! for the token. The timer and the token listener are plain futures
//! dropped on every exit path, so repeated polling calls leak nothing.

use crate::error::{DiffioError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Message carried by an attempt-level timeout.
pub(crate) const ATTEMPT_TIMEOUT_MSG: &str = "request timed out";

/// Run `fut` to completion unless the timeout elapses or the token is
/// cancelled first. With neither bound supplied the future runs
/// unbounded.
pub(crate) async fn bounded<T, F>(
    timeout: Option<Duration>,
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = fut => result,
        _ = deadline => Err(DiffioError::Timeout(ATTEMPT_TIMEOUT_MSG.to_string())),
        _ = cancelled => Err(DiffioError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unbounded_passes_value_through() {
        let result = bounded(None, None, async { Ok(7) }).await.unwrap();
        assert_eq!(result, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_as_timeout_error() {
        let result: Result<()> = bounded(Some(Duration::from_millis(50)), None, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(DiffioError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_cancellation_fires_as_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<()> = bounded(None, Some(&token), async {
            std::future::pending::<Result<()>>().await
        })
        .await;
        assert!(matches!(result, Err(DiffioError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_future_beats_pending_bounds() {
        let token = CancellationToken::new();
        let result = bounded(Some(Duration::from_secs(60)), Some(&token), async { Ok("done") })
            .await
            .unwrap();
        assert_eq!(result, "done");
    }
}
