use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use derive_ex::derive_ex;

use crate::{
    core::{run_callback, BindKey, BindSink, BindSource, FlagGuard, SinkBindings, SourceBinder},
    signal::{SignalNode, ToSignal},
    Signal, SignalContext, StateRef,
};


/// Read-only reactive value produced by a function of other reactive values.
///
/// The computation does not run until the value is first read, and a read
/// recomputes only if a value the previous computation read has changed
/// since. An upstream change marks this cell stale and runs its dependents
/// immediately, but the recomputation itself is deferred to the next read.
#[derive_ex(Clone, bound())]
pub struct Computed<T: 'static>(Rc<ComputedNode<T>>);

impl<T: 'static> Computed<T> {
    pub fn new(compute: impl Fn(&mut SignalContext) -> T + 'static) -> Self {
        Self(ComputedNode::new(Box::new(compute)))
    }

    /// Obtains a reference to the current value, recomputing it if stale, and
    /// adds a dependency on this `Computed` to the specified `SignalContext`.
    pub fn borrow<'a>(&'a self, sc: &mut SignalContext) -> StateRef<'a, T> {
        self.0.ensure_fresh();
        self.0.bind(sc);
        StateRef::map(StateRef::from(self.0.data.borrow()), |d| d.cache.value())
    }

    /// Gets the current value, recomputing it if stale, and adds a dependency
    /// on this `Computed` to the specified `SignalContext`.
    pub fn get(&self, sc: &mut SignalContext) -> T
    where
        T: Clone,
    {
        self.borrow(sc).clone()
    }

    /// Gets the current value, recomputing it if stale, without adding a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.0.ensure_fresh();
        self.0.data.borrow().cache.value().clone()
    }

    /// Returns a `Signal` representing this value.
    pub fn to_signal(&self) -> Signal<T> {
        Signal::from_node(self.0.clone())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.data.try_borrow() {
            Ok(d) => match &d.cache {
                Cache::Fresh(value) => std::fmt::Debug::fmt(value, f),
                Cache::Stale => write!(f, "<stale>"),
            },
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}

impl<T> ToSignal for Computed<T> {
    type Value = T;
    fn to_signal(&self) -> Signal<Self::Value> {
        self.to_signal()
    }
}

enum Cache<T> {
    Stale,
    Fresh(T),
}

impl<T> Cache<T> {
    fn is_fresh(&self) -> bool {
        matches!(self, Cache::Fresh(_))
    }
    fn value(&self) -> &T {
        match self {
            Cache::Fresh(value) => value,
            Cache::Stale => unreachable!("cache read while stale"),
        }
    }
}

struct ComputedData<T> {
    compute: Box<dyn Fn(&mut SignalContext) -> T>,
    cache: Cache<T>,
    sb: SourceBinder,
}

struct ComputedNode<T: 'static> {
    sinks: SinkBindings,
    is_computing: Cell<bool>,
    data: RefCell<ComputedData<T>>,
}

impl<T: 'static> ComputedNode<T> {
    fn new(compute: Box<dyn Fn(&mut SignalContext) -> T>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            sinks: SinkBindings::new(),
            is_computing: Cell::new(false),
            data: RefCell::new(ComputedData {
                compute,
                cache: Cache::Stale,
                sb: SourceBinder::new(this),
            }),
        })
    }

    fn bind(self: &Rc<Self>, sc: &mut SignalContext) {
        self.sinks.bind(self.clone(), sc);
    }

    /// Recomputes the cached value if it is stale.
    ///
    /// If the computation unwinds, the cache stays stale and the next read
    /// runs it again.
    fn ensure_fresh(&self) {
        let d = &mut *self.data.borrow_mut();
        if d.cache.is_fresh() {
            return;
        }
        let _computing = FlagGuard::set(&self.is_computing);
        let ComputedData { compute, cache, sb } = d;
        let value = sb.track(|sc| run_callback(|| compute(sc)));
        *cache = Cache::Fresh(value);
    }
}

impl<T: 'static> BindSource for ComputedNode<T> {
    fn unbind(self: Rc<Self>, key: BindKey) {
        self.sinks.unbind(key);
    }
}

impl<T: 'static> BindSink for ComputedNode<T> {
    /// An upstream change marks the cache stale, drops the upstream edges
    /// until the next materialization, and runs this cell's own dependents
    /// without recomputing anything.
    fn notify(self: Rc<Self>) {
        if self.is_computing.get() {
            return;
        }
        {
            let d = &mut *self.data.borrow_mut();
            if !d.cache.is_fresh() {
                return;
            }
            d.cache = Cache::Stale;
            d.sb.clear();
        }
        self.sinks.notify();
    }
}

impl<T: 'static> SignalNode for ComputedNode<T> {
    type Value = T;
    fn borrow<'a, 's: 'a>(
        self: Rc<Self>,
        inner: &'a Self,
        sc: &mut SignalContext<'s>,
    ) -> StateRef<'a, Self::Value> {
        self.ensure_fresh();
        self.bind(sc);
        StateRef::map(StateRef::from(inner.data.borrow()), |d| d.cache.value())
    }
}
