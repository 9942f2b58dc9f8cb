//! Cooperative cancellation of expensive computations.
//!
//! A [`CancelToken`] is passed explicitly to the `try_*` entry points of
//! [`Octagon`][crate::octagon::Octagon] (strong closure, optimization). It is
//! polled at loop heads of the cubic closure and around every simplex call.
//! Once raised, the flag stays raised until the client calls [`CancelToken::reset`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{OctagonError, Result};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    /// A token that can be raised from another thread (e.g. a timeout handler).
    pub fn new() -> Self {
        Self {
            flag: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    /// A token that never fires.
    pub const fn never() -> Self {
        Self { flag: None }
    }

    /// Ask every operation polling this token to stop.
    pub fn abandon(&self) {
        if let Some(flag) = &self.flag {
            flag.store(true, Ordering::Release);
        }
    }

    /// Clear an earlier [`CancelToken::abandon`].
    pub fn reset(&self) {
        if let Some(flag) = &self.flag {
            flag.store(false, Ordering::Release);
        }
    }

    pub fn is_abandoned(&self) -> bool {
        match &self.flag {
            Some(flag) => flag.load(Ordering::Acquire),
            None => false,
        }
    }

    /// Returns `Err(Aborted)` if the computation should stop.
    pub fn check(&self) -> Result<()> {
        if self.is_abandoned() {
            Err(OctagonError::Aborted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_never_fires() {
        let token = CancelToken::never();
        token.abandon();
        assert!(!token.is_abandoned());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_abandon_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        other.abandon();
        assert_eq!(token.check(), Err(OctagonError::Aborted));
        token.reset();
        assert!(!other.is_abandoned());
    }
}
