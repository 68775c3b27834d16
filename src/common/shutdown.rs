//! One-shot shutdown signal shared between tasks.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

/// A latch that is triggered once and can be awaited by any number of tasks.
///
/// Waiters that start waiting after the latch was triggered resolve immediately.
#[derive(Debug, Default)]
pub struct Shutdown {
    terminated: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the latch and wake every waiter.
    pub fn shutdown(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Returns a future that resolves once `shutdown` has been called.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let terminated = self.terminated.clone();
        let notify = self.notify.clone();
        async move {
            loop {
                let notified = notify.notified();
                tokio::pin!(notified);
                // register before checking the flag so a concurrent shutdown is not lost
                notified.as_mut().enable();
                if terminated.load(Ordering::SeqCst) {
                    return;
                }
                notified.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Shutdown;

    #[tokio::test]
    async fn test_wait_resolves_after_shutdown() {
        let shutdown = Shutdown::new();
        let wait = shutdown.wait();
        assert!(!shutdown.is_terminated());

        shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(1), wait).await.unwrap();
        assert!(shutdown.is_terminated());
    }

    #[tokio::test]
    async fn test_late_waiter_resolves_immediately() {
        let shutdown = Shutdown::new();
        shutdown.shutdown();
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait()).await.unwrap();
    }
}
