//! A reference-counted pointer whose equality and hashing are by reference.

use std::{fmt, hash::Hash, ops::Deref, sync};

/// A wrapper around `std::sync::Arc` that compares and hashes by pointer identity rather than by
/// value.
///
/// The term pool hash conses every term, so a given term is only ever allocated once and two
/// terms are structurally equal exactly when they share an allocation. Under that invariant,
/// comparing pointers is both correct and constant time, while the value-based `PartialEq` of a
/// plain `Arc` would walk the whole DAG on every comparison (and every hash map probe). This
/// wrapper swaps in the pointer-based implementations of `PartialEq` and `Hash`.
///
/// The invariant is only upheld by the pool, which is why terms should be created through
/// `TermPool::add` and not with [`Rc::new`]: a fresh `Rc::new` of a term that already lives in
/// the pool yields a second allocation that will compare as *different* from the first.
///
/// The underlying pointer is an `Arc` (not an `std::rc::Rc`) so that pool clones can be handed
/// to worker threads by the parallel tactic combinators.
///
/// # Examples
///
/// ```
/// # use harrier::ast::Rc;
/// let a = Rc::new(5);
/// let b = Rc::new(5);
/// assert_ne!(a, b); // same value, different allocations
///
/// let c = a.clone();
/// assert_eq!(a, c);
/// ```
#[derive(Eq)]
pub struct Rc<T: ?Sized>(sync::Arc<T>);

// A derived `Clone` would add a spurious `T: Clone` bound (see
// https://github.com/rust-lang/rust/issues/26925), so it is implemented by hand
impl<T: ?Sized> Clone for Rc<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> PartialEq for Rc<T> {
    fn eq(&self, other: &Self) -> bool {
        sync::Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Hash for Rc<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        sync::Arc::as_ptr(&self.0).hash(state);
    }
}

impl<T: ?Sized> Deref for Rc<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

// `Borrow<T>` must NOT be implemented: `Rc<T>` and `T` disagree on `Eq` and `Hash`, which the
// `Borrow` contract forbids
impl<T: ?Sized> AsRef<T> for Rc<T> {
    fn as_ref(&self) -> &T {
        self.0.as_ref()
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Rc<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for Rc<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<T> Rc<T> {
    /// Constructs a new `Rc<T>` with a fresh allocation.
    ///
    /// Outside of the term pool, prefer cloning an existing `Rc`: see the type-level docs for
    /// why a fresh allocation of an already-pooled term breaks equality.
    pub fn new(value: T) -> Self {
        Self(sync::Arc::new(value))
    }

    /// Similar to [`std::sync::Arc::strong_count`].
    pub fn strong_count(this: &Self) -> usize {
        sync::Arc::strong_count(&this.0)
    }

    /// Similar to [`std::sync::Arc::as_ptr`].
    pub fn as_ptr(this: &Self) -> *const T {
        sync::Arc::as_ptr(&this.0)
    }
}
