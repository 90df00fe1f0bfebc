#![forbid(unsafe_code)]

//! Subscription descriptors and the leases that release them.
//!
//! # Design
//!
//! A [`Subscription<T>`] describes one subscribable value of an editor
//! engine as a pair of closures:
//!
//! - `read_current`: returns a snapshot of the value right now.
//! - `subscribe`: registers a [`Listener`] and returns an [`Unsubscribe`]
//!   lease for that one registration.
//!
//! A [`SubscriptionFactory`] builds a descriptor from an [`EditorHandle`].
//! Factories are shared behind an `Rc` and compared by pointer, so a factory
//! must be created once and cloned into each render; a factory rebuilt on
//! every render still works but resolves and re-subscribes every time.
//!
//! # Invariants
//!
//! 1. An [`Unsubscribe`] releases its registration at most once: either via
//!    [`Unsubscribe::call`] or when dropped, never both.
//! 2. A descriptor is immutable once constructed.
//!
//! # Failure Modes
//!
//! - **Producer errors**: `read_current`, `subscribe` and the factory return
//!   [`SubscriptionError`]; callers propagate them unchanged.

use std::fmt;
use std::rc::Rc;

use crate::editor::EditorHandle;
use crate::error::Result;
use crate::identity::IdentityKey;

#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

/// Change callback handed to a producer.
pub type Listener<T> = Rc<dyn Fn(T)>;

type ReadFn<T> = dyn Fn() -> Result<T>;
type SubscribeFn<T> = dyn Fn(Listener<T>) -> Result<Unsubscribe>;

/// Lease on exactly one listener registration.
///
/// Dropping an uncalled lease releases the registration, mirroring an RAII
/// guard.
#[must_use = "dropping an Unsubscribe releases the listener immediately"]
pub struct Unsubscribe {
    release: Option<Box<dyn FnOnce()>>,
}

impl Unsubscribe {
    /// Lease that runs `release` when called or dropped.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Lease for a producer that keeps no registration.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Whether this lease still holds a registration.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.release.is_some()
    }

    /// Release the registration now.
    pub fn call(mut self) {
        self.release_once("call");
    }

    fn release_once(&mut self, via: &'static str) {
        if let Some(release) = self.release.take() {
            trace!(message = "unsubscribe.release", via);
            release();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.release_once("drop");
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Descriptor of one subscribable editor value.
pub struct Subscription<T> {
    read_current: Box<ReadFn<T>>,
    subscribe: Box<SubscribeFn<T>>,
}

impl<T: 'static> Subscription<T> {
    /// Descriptor from infallible producer closures.
    pub fn new(
        read_current: impl Fn() -> T + 'static,
        subscribe: impl Fn(Listener<T>) -> Unsubscribe + 'static,
    ) -> Self {
        Self {
            read_current: Box::new(move || Ok(read_current())),
            subscribe: Box::new(move |listener| Ok(subscribe(listener))),
        }
    }

    /// Descriptor from fallible producer closures.
    pub fn try_new(
        read_current: impl Fn() -> Result<T> + 'static,
        subscribe: impl Fn(Listener<T>) -> Result<Unsubscribe> + 'static,
    ) -> Self {
        Self {
            read_current: Box::new(read_current),
            subscribe: Box::new(subscribe),
        }
    }

    /// Snapshot of the value right now.
    ///
    /// # Errors
    ///
    /// Returns whatever the producer's read fails with.
    pub fn read_current(&self) -> Result<T> {
        (self.read_current)()
    }

    /// Register `listener` for change notifications.
    ///
    /// # Errors
    ///
    /// Returns the producer's registration failure; no listener is attached
    /// in that case.
    pub fn subscribe(&self, listener: Listener<T>) -> Result<Unsubscribe> {
        (self.subscribe)(listener)
    }

    /// Derive a descriptor whose values are `map` applied to this one's.
    ///
    /// `map` runs on every read and every notification, so it must be cheap
    /// and must return identity-stable values for unchanged inputs.
    pub fn map<U: 'static>(self, map: impl Fn(T) -> U + 'static) -> Subscription<U> {
        let map: Rc<dyn Fn(T) -> U> = Rc::new(map);
        let source = Rc::new(self);
        let read_source = Rc::clone(&source);
        let read_map = Rc::clone(&map);
        Subscription::try_new(
            move || read_source.read_current().map(|value| read_map(value)),
            move |listener: Listener<U>| {
                let map = Rc::clone(&map);
                source.subscribe(Rc::new(move |value: T| listener(map(value))))
            },
        )
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

type MakeFn<E, T> = dyn Fn(&EditorHandle<E>) -> Result<Subscription<T>>;

/// Identity-stable function from an editor to a descriptor.
///
/// Cloning shares the same function; equality is pointer identity.
pub struct SubscriptionFactory<E: ?Sized, T> {
    name: &'static str,
    make: Rc<MakeFn<E, T>>,
}

impl<E: ?Sized + 'static, T: 'static> SubscriptionFactory<E, T> {
    /// Factory from an infallible constructor. `name` only appears in logs.
    pub fn new(
        name: &'static str,
        make: impl Fn(&EditorHandle<E>) -> Subscription<T> + 'static,
    ) -> Self {
        Self {
            name,
            make: Rc::new(move |editor: &EditorHandle<E>| Ok(make(editor))),
        }
    }

    /// Factory from a fallible constructor.
    pub fn try_new(
        name: &'static str,
        make: impl Fn(&EditorHandle<E>) -> Result<Subscription<T>> + 'static,
    ) -> Self {
        Self {
            name,
            make: Rc::new(make),
        }
    }

    /// Build a descriptor for `editor`.
    ///
    /// # Errors
    ///
    /// Returns the constructor's failure unchanged.
    pub fn resolve(&self, editor: &EditorHandle<E>) -> Result<Subscription<T>> {
        trace!(message = "factory.resolve", factory = self.name);
        (self.make)(editor)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Identity key for logs.
    #[must_use]
    pub fn id(&self) -> IdentityKey {
        IdentityKey::of(&self.make)
    }
}

impl<E: ?Sized, T> Clone for SubscriptionFactory<E, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            make: Rc::clone(&self.make),
        }
    }
}

impl<E: ?Sized, T> PartialEq for SubscriptionFactory<E, T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.make, &other.make)
    }
}

impl<E: ?Sized, T> Eq for SubscriptionFactory<E, T> {}

impl<E: ?Sized, T> fmt::Debug for SubscriptionFactory<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionFactory")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
