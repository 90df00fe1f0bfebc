//! Host-level errors.

use edbind_core::SubscriptionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HostError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A producer (factory, read, or subscribe) failed.
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    /// A hook was called in a different order, or with a different type,
    /// than on the previous render.
    #[error("hook order changed at slot {index}: expected {expected}")]
    HookOrder { index: usize, expected: &'static str },

    /// `use_context` found no provider for the requested type.
    #[error("no context provided for {type_name}")]
    MissingContext { type_name: &'static str },

    /// State kept changing during commit for too many passes.
    #[error("render loop did not settle after {passes} passes")]
    RenderLoop { passes: usize },

    /// A state setter ran while its own component was rendering.
    #[error("state slot {slot} updated during render")]
    ReentrantUpdate { slot: usize },

    /// The root has been unmounted.
    #[error("root is unmounted")]
    Unmounted,
}

impl HostError {
    #[must_use]
    pub fn missing_context<T: ?Sized>() -> Self {
        Self::MissingContext {
            type_name: std::any::type_name::<T>(),
        }
    }
}
