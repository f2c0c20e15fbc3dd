//! Execution context and cancellation.
//!
//! A [`Context`] carries the single piece of shared mutable state in the
//! whole model: a write-once cancellation token. Composed pipelines inherit
//! the token by cloning the context, so cancelling it halts every stage at
//! its next suspension point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation signal.
///
/// Writes are a one-way transition to cancelled; reads are cheap and may be
/// performed from any number of tasks concurrently.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, unsignaled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Execution context handed to every task invocation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancelToken,
}

impl Context {
    /// A fresh context with its own token.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context sharing an existing token.
    pub fn with_token(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    /// The cancellation token this context threads through the pipeline.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Signal cancellation on the shared token.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once the shared token has been signaled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_token() {
        let ctx = Context::new();
        let other = ctx.clone();
        assert!(!other.is_cancelled());
        ctx.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
