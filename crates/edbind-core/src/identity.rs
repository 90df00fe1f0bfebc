#![forbid(unsafe_code)]

//! Identity comparison for bound values and hook dependencies.
//!
//! # Design
//!
//! Bindings decide whether a freshly read value differs from the last
//! delivered one by *identity*, not by structure. [`SameValue`] encodes that
//! rule per type:
//!
//! | Type                         | Comparison            |
//! |------------------------------|-----------------------|
//! | integers, `bool`, `char`     | value                 |
//! | `f32`, `f64`                 | bit pattern           |
//! | `String`, `&'static str`     | value                 |
//! | `Rc<T>`, `Arc<T>`            | pointer               |
//! | `Option<T>`, tuples          | component-wise        |
//!
//! Composite values are expected to be replaced wholesale behind an `Rc` or
//! `Arc`. A producer that returns a structurally equal but freshly allocated
//! value on every read will be seen as changed on every reconciliation; keep
//! references stable for unchanged logical values.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Identity equality used by reconciliation.
pub trait SameValue {
    /// Whether `self` and `other` are the same value by identity.
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_by_eq!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    String,
    &'static str,
);

impl SameValue for f32 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl SameValue for f64 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValue for Arc<T> {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<A: SameValue, B: SameValue> SameValue for (A, B) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1)
    }
}

impl<A: SameValue, B: SameValue, C: SameValue> SameValue for (A, B, C) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1) && self.2.same_value(&other.2)
    }
}

impl<A: SameValue, B: SameValue, C: SameValue, D: SameValue> SameValue for (A, B, C, D) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0)
            && self.1.same_value(&other.1)
            && self.2.same_value(&other.2)
            && self.3.same_value(&other.3)
    }
}

/// Address of a shared allocation, for logs and diagnostics.
///
/// Not suitable as a long-lived cache key on its own: an address can be
/// reused once the allocation is freed. Hold the `Rc` (see [`ByIdentity`])
/// when identity must stay meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey(usize);

impl IdentityKey {
    /// Key of the allocation behind `rc`.
    #[must_use]
    pub fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc).cast::<()>() as usize)
    }

    /// Raw address value.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An `Rc` whose equality is pointer identity.
///
/// Used as a hook dependency so that "same descriptor" means "same
/// allocation", while keeping the allocation alive for as long as the
/// dependency is remembered.
pub struct ByIdentity<T: ?Sized>(Rc<T>);

impl<T: ?Sized> ByIdentity<T> {
    #[must_use]
    pub fn new(rc: Rc<T>) -> Self {
        Self(rc)
    }

    #[must_use]
    pub fn key(&self) -> IdentityKey {
        IdentityKey::of(&self.0)
    }

    #[must_use]
    pub fn into_inner(self) -> Rc<T> {
        self.0
    }
}

impl<T: ?Sized> Clone for ByIdentity<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for ByIdentity<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for ByIdentity<T> {}

impl<T: ?Sized> std::ops::Deref for ByIdentity<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> fmt::Debug for ByIdentity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ByIdentity").field(&self.key()).finish()
    }
}
