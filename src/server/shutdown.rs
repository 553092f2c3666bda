// Graceful shutdown module
// Waits for in-flight connections after the listener is closed

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::logger;

/// Interval between checks of the active connection counter
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until every active connection has finished or `timeout` elapses.
///
/// Returns the number of connections still open when the wait ended;
/// those are dropped when the runtime shuts down.
///
/// # Arguments
///
/// * `conn_counter` - Active connection counter
/// * `timeout` - Upper bound on the wait
pub async fn drain_connections(conn_counter: &AtomicUsize, timeout: Duration) -> usize {
    let active = conn_counter.load(Ordering::SeqCst);
    logger::log_shutdown_started(active);

    let deadline = tokio::time::Instant::now() + timeout;
    let mut remaining = active;

    while remaining > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(POLL_INTERVAL).await;
        remaining = conn_counter.load(Ordering::SeqCst);
    }

    logger::log_shutdown_complete(remaining);
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_returns_immediately_when_idle() {
        let counter = AtomicUsize::new(0);
        let remaining = drain_connections(&counter, Duration::from_secs(5)).await;
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_waits_for_connections_to_finish() {
        let counter = Arc::new(AtomicUsize::new(2));
        let worker = Arc::clone(&counter);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            worker.fetch_sub(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            worker.fetch_sub(1, Ordering::SeqCst);
        });

        let remaining = drain_connections(&counter, Duration::from_secs(5)).await;
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_timeout() {
        let counter = AtomicUsize::new(1);
        let remaining = drain_connections(&counter, Duration::from_millis(100)).await;
        assert_eq!(remaining, 1);
    }
}
