use tokio::sync::watch;

/// Boolean status flag with two independent wait conditions.
///
/// Observers can block on either the set or the clear transition without
/// racing a plain flag: the underlying watch channel versions every write,
/// so a waiter that subscribes after the transition still observes the
/// current value.
#[derive(Debug, Clone)]
pub struct StatusLatch {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl StatusLatch {
    pub fn new(initial: bool) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: std::sync::Arc::new(tx) }
    }

    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    pub fn clear(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the latch is set, immediately if it already is.
    pub async fn wait_set(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for cannot fail while borrowed.
        let _ = rx.wait_for(|active| *active).await;
    }

    /// Resolves once the latch is clear, immediately if it already is.
    pub async fn wait_clear(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|active| !*active).await;
    }
}

impl Default for StatusLatch {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_latch_transitions() {
        let latch = StatusLatch::new(false);
        assert!(!latch.is_set());
        latch.wait_clear().await;

        latch.set();
        assert!(latch.is_set());
        latch.wait_set().await;

        latch.clear();
        assert!(!latch.is_set());
        latch.wait_clear().await;
    }

    #[tokio::test]
    async fn test_waiter_observes_set_from_other_task() {
        let latch = StatusLatch::new(false);
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait_set().await })
        };
        tokio::task::yield_now().await;
        latch.set();
        waiter.await.unwrap();
    }
}
