//! Live rate-limit decisions driven by the ledger change feed.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::limiter::{RateLimiter, normalize_identifier};
use super::{ActionKind, RateLimitDecision};

/// Handle to a live subscription. Dropping it stops delivery.
#[derive(Debug)]
pub struct LedgerSubscription {
    task: Option<JoinHandle<()>>,
}

impl LedgerSubscription {
    const fn inert() -> Self {
        Self { task: None }
    }

    /// Whether decisions are still being delivered.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop delivering decisions.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LedgerSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl RateLimiter {
    /// Deliver a fresh decision for `(action, identifier)` now and after
    /// every ledger change for that pair.
    ///
    /// When the ledger cannot be watched the callback gets exactly one
    /// decision and the returned subscription is inert. If the store closes
    /// later, one final decision is delivered and the subscription ends.
    pub async fn subscribe<F>(
        &self,
        action: ActionKind,
        identifier: &str,
        callback: F,
    ) -> LedgerSubscription
    where
        F: Fn(RateLimitDecision) + Send + Sync + 'static,
    {
        let identifier = normalize_identifier(identifier);
        let mut closed = self.db.closed_signal();

        if self.db.is_closed() {
            warn!(action = %action, "Ledger watch unavailable, delivering a single decision");
            callback(self.check(action, &identifier).await);
            return LedgerSubscription::inert();
        }

        let mut changes = self.db.subscribe_ledger();
        callback(self.check(action, &identifier).await);

        let limiter = self.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = closed.changed() => break,
                    received = changes.recv() => match received {
                        Ok(change) => {
                            if change.action == action && change.identifier == identifier {
                                callback(limiter.check(action, &identifier).await);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Ledger subscriber lagged, recomputing");
                            callback(limiter.check(action, &identifier).await);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }

            warn!(action = %action, "Ledger watch ended, delivering a final decision");
            callback(limiter.check(action, &identifier).await);
        });

        LedgerSubscription { task: Some(task) }
    }
}
