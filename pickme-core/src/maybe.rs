//! Present-or-absent Values
//!
//! `Maybe<T>` is the value type every lookup in this crate returns. It routes
//! control flow through `map`, `filter` and `or_else` so callers never branch
//! on presence by hand.
//!
//! # Semantics
//!
//! - A `Maybe` is immutable once built; every transformation consumes it and
//!   produces a new one.
//! - `Absent` flows through `map` and `filter` untouched, and the closure is
//!   never called.
//! - `or_else` is the only way to turn an absent value into a present one. Its
//!   fallback runs lazily, at most once, and only on absence.
//!
//! A panic inside a `map` closure is not converted into absence; it unwinds
//! through the caller like any other panic.
//!
//! `Maybe` converts to and from `Option` so that it can cross API boundaries
//! that speak the standard type.

/// A value, or its absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Maybe<T> {
    /// A value is present.
    Present(T),

    /// No value.
    Absent,
}

impl<T> Maybe<T> {
    /// Wrap a value that may be missing.
    pub fn of(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Absent,
        }
    }

    /// Wrap a value that is known to be present.
    pub fn present(value: T) -> Self {
        Self::Present(value)
    }

    /// The absent value.
    pub fn absent() -> Self {
        Self::Absent
    }

    /// Check if no value is wrapped.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Check if a value is wrapped.
    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    /// Transform a present value.
    ///
    /// `f` is not invoked when the value is absent.
    pub fn map<U, F>(self, f: F) -> Maybe<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Present(value) => Maybe::Present(f(value)),
            Self::Absent => Maybe::Absent,
        }
    }

    /// Transform a present value into another `Maybe`, flattening the result.
    pub fn and_then<U, F>(self, f: F) -> Maybe<U>
    where
        F: FnOnce(T) -> Maybe<U>,
    {
        match self {
            Self::Present(value) => f(value),
            Self::Absent => Maybe::Absent,
        }
    }

    /// Keep a present value only if it satisfies `predicate`.
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: FnOnce(&T) -> bool,
    {
        match self {
            Self::Present(value) if predicate(&value) => Self::Present(value),
            _ => Self::Absent,
        }
    }

    /// Substitute a fallback when the value is absent.
    ///
    /// The fallback is evaluated lazily and only on absence.
    pub fn or_else<F>(self, fallback: F) -> Self
    where
        F: FnOnce() -> Maybe<T>,
    {
        match self {
            Self::Present(value) => Self::Present(value),
            Self::Absent => fallback(),
        }
    }

    /// Run a side effect on a present value and pass it through.
    pub fn tap<F>(self, f: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let Self::Present(value) = &self {
            f(value);
        }
        self
    }

    /// Borrow the wrapped value.
    pub fn as_ref(&self) -> Maybe<&T> {
        match self {
            Self::Present(value) => Maybe::Present(value),
            Self::Absent => Maybe::Absent,
        }
    }

    /// Get a reference to the wrapped value, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }

    /// Unwrap into the standard `Option`.
    pub fn into_option(self) -> Option<T> {
        self.into()
    }
}

impl<T> Default for Maybe<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    fn from(value: Option<T>) -> Self {
        Self::of(value)
    }
}

impl<T> From<Maybe<T>> for Option<T> {
    fn from(value: Maybe<T>) -> Self {
        match value {
            Maybe::Present(value) => Some(value),
            Maybe::Absent => None,
        }
    }
}
