#![forbid(unsafe_code)]

//! Stable-identity handle to an editor engine instance.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::identity::{IdentityKey, SameValue};

/// Shared handle to an opaque editor engine.
///
/// Cloning yields another handle to the **same** engine. Equality is pointer
/// identity, so two handles compare equal exactly when they refer to the same
/// engine instance, regardless of the engine's contents.
pub struct EditorHandle<E: ?Sized> {
    engine: Rc<E>,
}

impl<E> EditorHandle<E> {
    /// Wrap a freshly constructed engine.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine: Rc::new(engine),
        }
    }
}

impl<E: ?Sized> EditorHandle<E> {
    /// Wrap an engine that is already shared.
    #[must_use]
    pub fn from_rc(engine: Rc<E>) -> Self {
        Self { engine }
    }

    /// Borrow the engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The shared engine allocation.
    #[must_use]
    pub fn shared(&self) -> Rc<E> {
        Rc::clone(&self.engine)
    }

    /// Identity key for logs.
    #[must_use]
    pub fn id(&self) -> IdentityKey {
        IdentityKey::of(&self.engine)
    }
}

impl<E: ?Sized> Clone for EditorHandle<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Rc::clone(&self.engine),
        }
    }
}

impl<E: ?Sized> PartialEq for EditorHandle<E> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.engine, &other.engine)
    }
}

impl<E: ?Sized> Eq for EditorHandle<E> {}

impl<E: ?Sized> SameValue for EditorHandle<E> {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl<E: ?Sized> Deref for EditorHandle<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.engine
    }
}

impl<E: ?Sized> fmt::Debug for EditorHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorHandle")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}
