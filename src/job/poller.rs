//! Fixed-interval status polling bound to a cancellation token.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Issues one check per interval until a check breaks or the token fires.
///
/// The first check runs one interval after [`run`](Self::run) starts.
/// Checks are awaited one at a time, so two never overlap; there is no
/// backoff.
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    token: CancellationToken,
}

impl Poller {
    /// Creates a poller.
    #[must_use]
    pub fn new(interval: Duration, token: CancellationToken) -> Self {
        Self { interval, token }
    }

    /// Runs `check` until it returns [`ControlFlow::Break`].
    ///
    /// Returns `None` when the token fires first; no check starts after that.
    pub async fn run<T, F, Fut>(&self, mut check: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ControlFlow<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => return None,
                () = tokio::time::sleep(self.interval) => {}
            }
            attempt += 1;
            trace!(attempt, "polling");
            match check().await {
                ControlFlow::Break(value) => return Some(value),
                ControlFlow::Continue(()) => {}
            }
            if self.token.is_cancelled() {
                return None;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_first_check_after_one_interval() {
        let poller = Poller::new(Duration::from_secs(2), CancellationToken::new());
        let started = Instant::now();
        let at = poller
            .run(|| async { ControlFlow::Break(Instant::now()) })
            .await
            .unwrap();
        assert_eq!(at - started, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_break() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = Poller::new(Duration::from_secs(2), CancellationToken::new());
        let started = Instant::now();
        let counter = Arc::clone(&calls);
        let value = poller
            .run(move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 3 { ControlFlow::Break(n) } else { ControlFlow::Continue(()) }
                }
            })
            .await;
        assert_eq!(value, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let poller = Poller::new(Duration::from_secs(2), token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let counter = Arc::clone(&calls);
        let value: Option<()> = poller
            .run(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ControlFlow::Continue(())
                }
            })
            .await;
        assert_eq!(value, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_never_checks() {
        let token = CancellationToken::new();
        token.cancel();
        let poller = Poller::new(Duration::from_millis(10), token);
        let value = poller
            .run(|| async { ControlFlow::Break(1) })
            .await;
        assert_eq!(value, None);
    }
}
