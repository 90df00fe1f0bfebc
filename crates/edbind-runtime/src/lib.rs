#![forbid(unsafe_code)]

//! Runtime: a small hook host and the subscription binding built on it.
//!
//! [`host`] supplies memo, ref, state, layout effect, and context hooks with
//! a render/commit cycle. [`binding`] uses them to expose editor state as a
//! component value that stays in sync with the editor.

pub mod binding;
pub mod config;
pub mod error;
pub mod host;

pub use binding::{bind, use_editor_subscription};
pub use config::HostConfig;
pub use error::HostError;
pub use host::{Cleanup, Hooks, Host, HostStats, Ref, Root, StateSetter};
