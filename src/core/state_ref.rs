use std::{cell::Ref, ops::Deref};

/// Reference to a value obtained from a reactive node.
pub struct StateRef<'a, T: ?Sized>(RawStateRef<'a, T>);

enum RawStateRef<'a, T: ?Sized> {
    Value(&'a T),
    Cell(Ref<'a, T>),
}

impl<'a, T: ?Sized> StateRef<'a, T> {
    /// Makes a new `StateRef` for a component of the referenced value.
    pub fn map<U: ?Sized>(this: Self, f: impl FnOnce(&T) -> &U) -> StateRef<'a, U> {
        match this.0 {
            RawStateRef::Value(value) => StateRef(RawStateRef::Value(f(value))),
            RawStateRef::Cell(cell) => StateRef(RawStateRef::Cell(Ref::map(cell, f))),
        }
    }
}

impl<'a, T: ?Sized> From<&'a T> for StateRef<'a, T> {
    fn from(value: &'a T) -> Self {
        StateRef(RawStateRef::Value(value))
    }
}

impl<'a, T: ?Sized> From<Ref<'a, T>> for StateRef<'a, T> {
    fn from(value: Ref<'a, T>) -> Self {
        StateRef(RawStateRef::Cell(value))
    }
}

impl<T: ?Sized> Deref for StateRef<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match &self.0 {
            RawStateRef::Value(value) => value,
            RawStateRef::Cell(cell) => cell,
        }
    }
}

impl<T: ?Sized + std::fmt::Debug> std::fmt::Debug for StateRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&**self, f)
    }
}
