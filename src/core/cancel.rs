//! Cooperative cancellation.
//!
//! `CancelToken` is a single-use trigger: it starts unset, `cancel()` transitions it to
//! cancelled exactly once, and every clone (and every `child()`) observes that transition.
//! There is no "uncancel".

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

struct Inner {
    reason: Mutex<Option<String>>,
    notify: Notify,
    parent: Option<Arc<Inner>>,
}

impl Inner {
    fn is_cancelled(&self) -> bool {
        if self.reason.lock().unwrap().is_some() {
            return true;
        }
        self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    fn reason(&self) -> Option<String> {
        if let Some(r) = self.reason.lock().unwrap().clone() {
            return Some(r);
        }
        self.parent.as_ref().and_then(|p| p.reason())
    }

    fn fire(&self, reason: String) {
        let mut slot = self.reason.lock().unwrap();
        if slot.is_none() {
            *slot = Some(reason);
            self.notify.notify_waiters();
        }
    }
}

/// A cooperative cancellation handle, observable from every task that was handed a clone.
///
/// Providers and tool handlers receive the same token for the duration of a single call (or,
/// for the tool-loop engine, for the duration of the whole loop via `child()` tokens per step).
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Create a new, unset token.
    pub fn new() -> Self {
        CancelToken {
            inner: Arc::new(Inner {
                reason: Mutex::new(None),
                notify: Notify::new(),
                parent: None,
            }),
        }
    }

    /// Create a child token that is cancelled whenever either it or `self` is cancelled.
    /// Cancelling the child never cancels the parent.
    pub fn child(&self) -> CancelToken {
        CancelToken {
            inner: Arc::new(Inner {
                reason: Mutex::new(None),
                notify: Notify::new(),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// Cancel this token. Idempotent: only the first call's reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.inner.fire(reason.into());
    }

    /// Whether this token (or an ancestor) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// The reason passed to the `cancel()` call that triggered this token, if any.
    pub fn reason(&self) -> Option<String> {
        self.inner.reason()
    }

    /// Suspend until cancelled. Returns immediately if already cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.notify.notified().await;
    }

    /// Convert the current state into a `Cancelled` error, for suspension points that need to
    /// short-circuit a `Result`-returning operation.
    pub fn check(&self) -> crate::core::error::Result<()> {
        if self.is_cancelled() {
            Err(crate::core::error::Error::cancelled(
                self.reason().unwrap_or_else(|| "cancelled".to_string()),
            ))
        } else {
            Ok(())
        }
    }
}
