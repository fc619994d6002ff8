//! Readiness gate — one-shot signal for the end of the first catch-up scan.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Broadcast-once latch.
///
/// Any number of tasks may [`wait`](ReadinessGate::wait); once
/// [`mark_ready`](ReadinessGate::mark_ready) has been called every current and
/// future waiter returns immediately. The latch never resets.
#[derive(Debug)]
pub struct ReadinessGate {
    ready: AtomicBool,
    sender: watch::Sender<bool>,
    receiver: watch::Receiver<bool>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            ready: AtomicBool::new(false),
            sender,
            receiver,
        }
    }

    /// Open the gate. Returns `true` only for the call that actually opened it.
    pub fn mark_ready(&self) -> bool {
        if self.ready.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.sender.send_replace(true);
        true
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Wait until the gate is open.
    pub async fn wait(&self) {
        let mut rx = self.receiver.clone();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn initially_closed() {
        assert!(!ReadinessGate::new().is_ready());
    }

    #[test]
    fn mark_ready_once() {
        let gate = ReadinessGate::new();
        assert!(gate.mark_ready());
        assert!(!gate.mark_ready());
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn wait_after_ready_returns_immediately() {
        let gate = ReadinessGate::new();
        gate.mark_ready();
        tokio::time::timeout(Duration::from_millis(50), gate.wait())
            .await
            .expect("wait should resolve");
    }

    #[tokio::test]
    async fn all_waiters_released() {
        let gate = Arc::new(ReadinessGate::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();

        tokio::task::yield_now().await;
        gate.mark_ready();

        for w in waiters {
            tokio::time::timeout(Duration::from_secs(1), w)
                .await
                .expect("waiter released")
                .unwrap();
        }
    }
}
