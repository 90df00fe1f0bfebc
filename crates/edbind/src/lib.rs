#![forbid(unsafe_code)]

//! edbind public facade crate.
//!
//! Binds state owned by an imperative editor engine into hook-based
//! components.
//!
//! ```rust
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//!
//! use edbind::prelude::*;
//!
//! #[derive(Default)]
//! struct Engine {
//!     words: Cell<u32>,
//!     listeners: RefCell<Vec<Listener<u32>>>,
//! }
//!
//! let word_count = SubscriptionFactory::new("word_count", |editor: &EditorHandle<Engine>| {
//!     let reader = editor.shared();
//!     let registrar = editor.shared();
//!     Subscription::new(
//!         move || reader.words.get(),
//!         move |listener| {
//!             registrar.listeners.borrow_mut().push(listener);
//!             let owner = Rc::clone(&registrar);
//!             Unsubscribe::new(move || owner.listeners.borrow_mut().clear())
//!         },
//!     )
//! });
//!
//! let host = Host::default();
//! let editor = EditorHandle::new(Engine::default());
//! let mut root = {
//!     let editor = editor.clone();
//!     Root::new(&host, move |hooks| bind(hooks, &editor, &word_count))
//! };
//! assert_eq!(root.flush()?, 0);
//!
//! editor.words.set(3);
//! let listeners: Vec<_> = editor.listeners.borrow().clone();
//! for listener in listeners {
//!     listener(3);
//! }
//! assert_eq!(root.flush()?, 3);
//!
//! root.unmount();
//! assert!(editor.listeners.borrow().is_empty());
//! # Ok::<(), HostError>(())
//! ```

pub use edbind_core as core;
#[cfg(feature = "runtime")]
pub use edbind_runtime as runtime;

pub mod prelude {
    pub use edbind_core::{
        ByIdentity, EditorHandle, Listener, SameValue, Subscription, SubscriptionError,
        SubscriptionFactory, Unsubscribe,
    };
    #[cfg(feature = "runtime")]
    pub use edbind_runtime::{
        Hooks, Host, HostConfig, HostError, Root, bind, use_editor_subscription,
    };
}
