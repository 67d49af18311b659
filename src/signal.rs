use std::{any::Any, rc::Rc};

use derive_ex::derive_ex;

use crate::{Computed, SignalContext, StateRef};


/// Interface implemented by the nodes a [`Signal`] can point at.
pub trait SignalNode: 'static {
    type Value: ?Sized + 'static;
    fn borrow<'a, 's: 'a>(
        self: Rc<Self>,
        inner: &'a Self,
        sc: &mut SignalContext<'s>,
    ) -> StateRef<'a, Self::Value>;
}

trait DynSignalNode {
    type Value: ?Sized + 'static;
    fn dyn_borrow<'a, 's: 'a>(
        self: Rc<Self>,
        inner: &'a dyn Any,
        sc: &mut SignalContext<'s>,
    ) -> StateRef<'a, Self::Value>;

    fn as_any(&self) -> &dyn Any;
}

impl<S: SignalNode + 'static> DynSignalNode for S {
    type Value = S::Value;

    fn dyn_borrow<'a, 's: 'a>(
        self: Rc<Self>,
        inner: &'a dyn Any,
        sc: &mut SignalContext<'s>,
    ) -> StateRef<'a, Self::Value> {
        self.borrow(inner.downcast_ref().unwrap(), sc)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive_ex(Clone)]
enum RawSignal<T: ?Sized + 'static> {
    StaticRef(&'static T),
    Node(Rc<dyn DynSignalNode<Value = T>>),
}

/// Read-only handle to a reactive value.
///
/// Both state cells and derived cells convert into a `Signal`, so consumers
/// can depend on either without knowing which one they were given.
#[derive_ex(Clone)]
pub struct Signal<T: ?Sized + 'static>(RawSignal<T>);

impl<T: ?Sized + 'static> Signal<T> {
    /// Creates a signal backed by a lazily evaluated, memoized computation.
    pub fn new(f: impl Fn(&mut SignalContext) -> T + 'static) -> Self
    where
        T: Sized,
    {
        Computed::new(f).to_signal()
    }

    pub fn from_value(value: T) -> Self
    where
        T: Sized,
    {
        Self::from_node(Rc::new(ConstantNode { value }))
    }

    pub fn from_static_ref(value: &'static T) -> Self {
        Signal(RawSignal::StaticRef(value))
    }

    pub fn from_node(node: Rc<impl SignalNode<Value = T>>) -> Self {
        Signal(RawSignal::Node(node))
    }

    pub fn borrow<'a, 's: 'a>(&'a self, sc: &mut SignalContext<'s>) -> StateRef<'a, T> {
        match &self.0 {
            RawSignal::StaticRef(value) => StateRef::from(*value),
            RawSignal::Node(node) => node.clone().dyn_borrow(node.as_any(), sc),
        }
    }

    pub fn get(&self, sc: &mut SignalContext) -> <T as ToOwned>::Owned
    where
        T: ToOwned,
    {
        self.borrow(sc).to_owned()
    }
}

/// Conversion into a read-only [`Signal`] handle.
pub trait ToSignal {
    type Value: ?Sized;
    fn to_signal(&self) -> Signal<Self::Value>;
}

impl<T: ?Sized + 'static> ToSignal for Signal<T> {
    type Value = T;
    fn to_signal(&self) -> Signal<Self::Value> {
        self.clone()
    }
}

struct ConstantNode<T> {
    value: T,
}

impl<T: 'static> SignalNode for ConstantNode<T> {
    type Value = T;
    fn borrow<'a, 's: 'a>(
        self: Rc<Self>,
        inner: &'a Self,
        _sc: &mut SignalContext<'s>,
    ) -> StateRef<'a, Self::Value> {
        StateRef::from(&inner.value)
    }
}
