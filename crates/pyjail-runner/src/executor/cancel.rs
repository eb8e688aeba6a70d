//! Cooperative cancellation shared between threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Flag that stops a run as soon as the watchdog sees it.
///
/// Tokens form a tree: cancelling a parent cancels every child derived from
/// it, while cancelling a child leaves the parent untouched. The daemon holds
/// one root token for shutdown and derives a child per connection.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<CancelToken>>,
}

impl CancelToken {
    /// A fresh, uncancelled root token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token cancelled together with `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether this token or any ancestor was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn parents_cancel_children_but_not_the_reverse() {
        let root = CancelToken::new();
        let first = root.child();
        let second = root.child();
        first.cancel();
        assert!(!root.is_cancelled());
        assert!(!second.is_cancelled());
        root.cancel();
        assert!(second.is_cancelled());
    }
}
