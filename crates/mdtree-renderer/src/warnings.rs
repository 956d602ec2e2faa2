//! Once-per-key deprecation warnings.
//!
//! The compiler does not keep hidden global state. The caller owns a
//! [`WarningLog`] and passes it to every render call; share one log for the
//! lifetime of a process to warn once per key, or create a fresh one per
//! test.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use mdtree_config::DeprecatedKey;

/// Set of deprecation warnings already issued.
#[derive(Debug, Default)]
pub struct WarningLog {
    issued: Mutex<HashSet<DeprecatedKey>>,
}

impl WarningLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a warning for `key` unless one was already logged.
    ///
    /// Returns whether the warning was logged by this call.
    pub fn warn_once(&self, key: DeprecatedKey) -> bool {
        let first = self
            .issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        if first {
            tracing::warn!(key = key.key(), "Deprecated configuration key: {key}");
        }
        first
    }

    #[must_use]
    pub fn has_warned(&self, key: DeprecatedKey) -> bool {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }

    /// Forget every issued warning.
    pub fn reset(&self) {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warns_once_per_key() {
        let log = WarningLog::new();
        assert!(log.warn_once(DeprecatedKey::EscapeHtml));
        assert!(!log.warn_once(DeprecatedKey::EscapeHtml));
        assert!(log.warn_once(DeprecatedKey::Renderers));
        assert!(log.has_warned(DeprecatedKey::EscapeHtml));
    }

    #[test]
    fn test_reset_allows_warning_again() {
        let log = WarningLog::new();
        log.warn_once(DeprecatedKey::Renderers);
        log.reset();
        assert!(!log.has_warned(DeprecatedKey::Renderers));
        assert!(log.warn_once(DeprecatedKey::Renderers));
    }

    #[test]
    fn test_logs_are_independent() {
        let a = WarningLog::new();
        let b = WarningLog::new();
        a.warn_once(DeprecatedKey::EscapeHtml);
        assert!(!b.has_warned(DeprecatedKey::EscapeHtml));
    }
}
