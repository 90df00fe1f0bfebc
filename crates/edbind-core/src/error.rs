//! Errors raised by subscription producers.
//!
//! Every variant is a pass-through: bindings never retry or suppress them,
//! they surface wherever the host reports render and commit failures.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubscriptionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The factory could not build a descriptor for the editor.
    #[error("subscription factory failed: {reason}")]
    Factory { reason: String },

    /// `read_current` could not produce a snapshot.
    #[error("reading current value failed: {reason}")]
    Read { reason: String },

    /// `subscribe` could not register the listener. The listener is not
    /// attached.
    #[error("attaching listener failed: {reason}")]
    Subscribe { reason: String },
}

impl SubscriptionError {
    #[must_use]
    pub fn factory(reason: impl Into<String>) -> Self {
        Self::Factory {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn read(reason: impl Into<String>) -> Self {
        Self::Read {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn subscribe(reason: impl Into<String>) -> Self {
        Self::Subscribe {
            reason: reason.into(),
        }
    }

    /// Short phase label used in log fields.
    #[must_use]
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Factory { .. } => "factory",
            Self::Read { .. } => "read",
            Self::Subscribe { .. } => "subscribe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = SubscriptionError::read("engine disposed");
        assert_eq!(err.to_string(), "reading current value failed: engine disposed");
        assert_eq!(err.phase(), "read");
    }

    #[test]
    fn constructors_map_to_variants() {
        assert!(matches!(
            SubscriptionError::factory("x"),
            SubscriptionError::Factory { .. }
        ));
        assert!(matches!(
            SubscriptionError::subscribe("x"),
            SubscriptionError::Subscribe { .. }
        ));
    }
}
