use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Latched stop request shared between a signal listener and the loop.
///
/// Once triggered it stays triggered; waiters created afterwards resolve
/// immediately.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            info!("Stop requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`StopSignal::trigger`] has been called.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // Every handle dropped without a trigger: nothing can stop us now.
            if rx.wait_for(|stop| *stop).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_before_wait() {
        let stop = StopSignal::new();
        stop.trigger();
        assert!(stop.is_triggered());
        tokio::time::timeout(Duration::from_secs(1), stop.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_wakes_waiter() {
        let stop = StopSignal::new();
        let waiter = tokio::spawn(stop.wait());
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        stop.clone().trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_without_trigger_never_resolves() {
        let stop = StopSignal::new();
        let wait = stop.wait();
        drop(stop);
        assert!(tokio::time::timeout(Duration::from_millis(50), wait)
            .await
            .is_err());
    }
}
