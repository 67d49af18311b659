use std::{
    cell::{Cell, RefCell},
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    rc::{Rc, Weak},
};

use slabmap::SlabMap;

mod state_ref;

pub use state_ref::StateRef;

#[cfg(test)]
mod tests;

/// Identifies one edge in a [`BindSource`]'s subscriber table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BindKey(usize);

/// Consumer side of a dependency edge.
pub trait BindSink: 'static {
    /// Called synchronously when a source this sink reads has changed.
    fn notify(self: Rc<Self>);
}

/// Producer side of a dependency edge.
pub trait BindSource: 'static {
    /// Removes the edge identified by `key`. Unbinding an absent edge is a no-op.
    fn unbind(self: Rc<Self>, key: BindKey);
}

/// Context for retrieving values and tracking dependencies.
///
/// While a consumer is running, its context carries the consumer as the
/// current sink and every read through the context records an edge.
/// A context without a sink reads without recording anything.
pub struct SignalContext<'s> {
    sink: Option<Sink<'s>>,
}

impl<'s> SignalContext<'s> {
    pub(crate) fn untracked() -> Self {
        SignalContext { sink: None }
    }

    /// Call a function with a [`SignalContext`] that does not track dependencies.
    pub fn untrack<T>(&mut self, f: impl FnOnce(&mut SignalContext<'s>) -> T) -> T {
        struct UntrackGuard<'s, 'a> {
            sc: &'a mut SignalContext<'s>,
            sink: Option<Sink<'s>>,
        }
        impl Drop for UntrackGuard<'_, '_> {
            fn drop(&mut self) {
                self.sc.sink = self.sink.take();
            }
        }
        f(UntrackGuard {
            sink: self.sink.take(),
            sc: self,
        }
        .sc)
    }
}

/// Call a function with a root [`SignalContext`] that does not track dependencies.
///
/// This is how reactive values are read from outside any effect.
pub fn untracked<T>(f: impl FnOnce(&mut SignalContext) -> T) -> T {
    f(&mut SignalContext::untracked())
}

struct Sink<'s> {
    sink: Weak<dyn BindSink>,
    sources: &'s mut SourceBindings,
}

struct SinkBinding {
    sink: Weak<dyn BindSink>,
}

/// Subscriber table of a [`BindSource`].
#[derive(Default)]
pub struct SinkBindings(RefCell<SlabMap<SinkBinding>>);

impl SinkBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the context's current sink as a subscriber of `this`.
    ///
    /// Repeated reads of the same source in one run reuse the existing edge
    /// on the subscriber side; the sink's ordered source list records the
    /// duplicate entry anyway.
    pub fn bind(&self, this: Rc<dyn BindSource>, sc: &mut SignalContext) {
        let Some(sink) = &mut sc.sink else {
            return;
        };
        let key = match sink.sources.find(&this) {
            Some(key) => key,
            None => BindKey(self.0.borrow_mut().insert(SinkBinding {
                sink: sink.sink.clone(),
            })),
        };
        sink.sources.0.push(SourceBinding { source: this, key });
    }

    /// Removes the edge identified by `key`. No-op if the edge is already gone.
    pub fn unbind(&self, key: BindKey) {
        self.0.borrow_mut().remove(key.0);
    }

    /// Synchronously invokes every currently subscribed sink.
    ///
    /// The subscriber set is snapshotted before the first invocation, so a
    /// sink that unsubscribes and resubscribes during the pass is invoked
    /// exactly once. A panicking sink aborts the remaining fan-out.
    pub fn notify(&self) {
        let sinks: Vec<Weak<dyn BindSink>> = {
            let mut sinks = self.0.borrow_mut();
            sinks.optimize();
            sinks.values().map(|s| s.sink.clone()).collect()
        };
        for sink in sinks {
            if let Some(sink) = sink.upgrade() {
                sink.notify();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

struct SourceBinding {
    source: Rc<dyn BindSource>,
    key: BindKey,
}

impl SourceBinding {
    fn is_same(&self, source: &Rc<dyn BindSource>) -> bool {
        Rc::ptr_eq(&self.source, source)
    }
    fn unbind(self) {
        self.source.unbind(self.key);
    }
}

/// Ordered list of the dependency edges recorded by one consumer run.
#[derive(Default)]
pub struct SourceBindings(Vec<SourceBinding>);

impl SourceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, source: &Rc<dyn BindSource>) -> Option<BindKey> {
        self.0.iter().find(|b| b.is_same(source)).map(|b| b.key)
    }

    /// Unbinds every recorded edge.
    pub fn clear(&mut self) {
        for b in self.0.drain(..) {
            b.unbind();
        }
    }
}

impl Drop for SourceBindings {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Consumer half of a reactive node: a weak reference to the owning sink
/// plus the edges recorded by its most recent run.
pub struct SourceBinder {
    sink: Weak<dyn BindSink>,
    sources: SourceBindings,
}

impl SourceBinder {
    pub fn new(sink: &Weak<impl BindSink>) -> Self {
        Self {
            sink: sink.clone(),
            sources: SourceBindings::new(),
        }
    }

    /// Tears down the previous edge set, then runs `f` under tracking.
    ///
    /// The recorded edges after the call are exactly the sources `f` read.
    /// If `f` unwinds, the edges recorded up to that point stay in place.
    pub fn track<T>(&mut self, f: impl FnOnce(&mut SignalContext) -> T) -> T {
        self.sources.clear();
        let mut sc = SignalContext {
            sink: Some(Sink {
                sink: self.sink.clone(),
                sources: &mut self.sources,
            }),
        };
        f(&mut sc)
    }

    /// Unbinds from every current source.
    pub fn clear(&mut self) {
        self.sources.clear();
    }
}

/// Sets a flag for the duration of a scope, resetting it on all exit paths.
pub(crate) struct FlagGuard<'a>(&'a Cell<bool>);

impl<'a> FlagGuard<'a> {
    pub fn set(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Runs a user callback, reporting a panic before resuming the unwind.
pub(crate) fn run_callback<T>(f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            tracing::error!("a callback panicked inside the reactive graph");
            resume_unwind(payload)
        }
    }
}
