//! Shared cancellation signal.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// One-shot cancellation flag shared by the scan and every fetch worker.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    state: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    /// Returns whether the signal has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Completes once the signal has fired.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Drives `future` to completion unless the signal fires first.
    ///
    /// Returns `None` when cancelled.
    pub async fn run<F>(&self, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.cancelled() => None,
            output = future => Some(output),
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_signal_is_not_cancelled() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancelSignal::new();
        let clone = signal.clone();

        clone.cancel();

        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();

        let handle = tokio::spawn(async move { waiter.cancelled().await });
        signal.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake up")
            .expect("waiter should not panic");
    }

    #[tokio::test]
    async fn test_run_returns_none_when_already_cancelled() {
        let signal = CancelSignal::new();
        signal.cancel();

        let output = signal.run(std::future::pending::<()>()).await;

        assert!(output.is_none());
    }

    #[tokio::test]
    async fn test_run_returns_output_when_not_cancelled() {
        let signal = CancelSignal::new();

        let output = signal.run(async { 42 }).await;

        assert_eq!(output, Some(42));
    }
}
