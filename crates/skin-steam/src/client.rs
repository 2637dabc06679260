//! HTTP clients used by the Steam source.

use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    RetryTransientMiddleware, Retryable, RetryableStrategy, policies::ExponentialBackoff,
};
use std::time::Duration;

/// Statuses the live quote endpoint is retried on.
pub const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Default number of attempts for a live quote.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Returns true if a response status should be retried.
#[must_use]
pub fn is_transient(status: StatusCode) -> bool {
    TRANSIENT_STATUSES.contains(&status.as_u16())
}

/// Retries on [`TRANSIENT_STATUSES`] only.
///
/// Connection errors and every other status are final.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientStatusStrategy;

impl RetryableStrategy for TransientStatusStrategy {
    fn handle(
        &self,
        res: &Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        match res {
            Ok(response) if is_transient(response.status()) => Some(Retryable::Transient),
            Ok(_) => None,
            Err(_) => Some(Retryable::Fatal),
        }
    }
}

/// Builds the plain client used for pages and listings.
pub(crate) fn plain_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Builds the retrying client used for live quotes.
///
/// Exponential backoff, at most `max_attempts` requests in total.
pub(crate) fn retrying_client(timeout: Duration, max_attempts: u32) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(500), Duration::from_secs(4))
        .build_with_max_retries(max_attempts.saturating_sub(1));

    ClientBuilder::new(plain_client(timeout))
        .with(RetryTransientMiddleware::new_with_policy_and_strategy(
            retry_policy,
            TransientStatusStrategy,
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `status` to every request and counts the requests.
    async fn serve(status: u16) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let response = format!(
                    "HTTP/1.1 {status} Status\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/market/priceoverview/"), hits)
    }

    async fn attempts(status: u16, max_attempts: u32) -> usize {
        let (url, hits) = serve(status).await;
        let client = retrying_client(Duration::from_secs(5), max_attempts);
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status().as_u16(), status);
        hits.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_transient_statuses_use_every_attempt() {
        assert_eq!(attempts(503, 3).await, 3);
        assert_eq!(attempts(429, 3).await, 3);
    }

    #[tokio::test]
    async fn test_final_statuses_are_not_retried() {
        assert_eq!(attempts(200, 3).await, 1);
        assert_eq!(attempts(404, 3).await, 1);
        assert_eq!(attempts(501, 3).await, 1);
    }

    #[tokio::test]
    async fn test_single_attempt_never_retries() {
        assert_eq!(attempts(500, 1).await, 1);
    }

    #[test]
    fn test_transient_statuses() {
        for code in TRANSIENT_STATUSES {
            assert!(is_transient(StatusCode::from_u16(code).unwrap()));
        }
        assert!(!is_transient(StatusCode::OK));
        assert!(!is_transient(StatusCode::NOT_FOUND));
        assert!(!is_transient(StatusCode::FORBIDDEN));
        assert!(!is_transient(StatusCode::from_u16(501).unwrap()));
    }
}
