//! Cooperative cancellation for blocking operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{KeepsakeError, Result};

/// A cheaply clonable cancellation flag.
///
/// Callers hand one to every service operation.  It is checked at
/// operation entry and between iterations of per-secret loops; an open
/// transaction that never commits rolls back on drop, so a fired token
/// leaves no partial state behind.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token.  Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(KeepsakeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_checks() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn fired_token_fails_checks_everywhere() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();

        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(KeepsakeError::Cancelled)));
    }
}
