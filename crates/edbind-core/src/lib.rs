#![forbid(unsafe_code)]

//! Core: editor handles, subscription descriptors, unsubscribe leases, and
//! value identity.

pub mod editor;
pub mod error;
pub mod identity;
#[cfg(feature = "tracing")]
pub mod logging;
pub mod subscription;

pub use editor::EditorHandle;
pub use error::SubscriptionError;
pub use identity::{ByIdentity, IdentityKey, SameValue};
pub use subscription::{Listener, Subscription, SubscriptionFactory, Unsubscribe};

// No-op logging macros used when the `tracing` feature is disabled. They
// accept the same field syntax as the tracing macros and discard it.

#[cfg(not(feature = "tracing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
