use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    core::{run_callback, BindSink, FlagGuard, SourceBinder},
    SignalContext, Subscription,
};

#[cfg(test)]
mod tests;

/// Call a function now and again each time a dependency changes.
///
/// The function runs once before `effect` returns. Afterwards, every
/// value-changing write to a reactive value it read reruns it synchronously,
/// on the writer's call stack. The dependencies are rebuilt on every run, so
/// only the values read by the most recent run can trigger the next one.
///
/// If the [`Subscription`] returned from this function is dropped, the
/// function will not be called again.
pub fn effect(f: impl FnMut(&mut SignalContext) + 'static) -> Subscription {
    let node = EffectNode::new(f);
    node.clone().run();
    Subscription::from_rc_fn(node, EffectNode::dispose)
}

struct EffectData<F> {
    f: F,
    sb: SourceBinder,
}

struct EffectNode<F> {
    is_running: Cell<bool>,
    is_active: Cell<bool>,
    data: RefCell<EffectData<F>>,
}

impl<F> EffectNode<F>
where
    F: FnMut(&mut SignalContext) + 'static,
{
    fn new(f: F) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            is_running: Cell::new(false),
            is_active: Cell::new(true),
            data: RefCell::new(EffectData {
                f,
                sb: SourceBinder::new(this),
            }),
        })
    }

    fn run(self: Rc<Self>) {
        // An effect cannot retrigger itself while already executing, and a
        // disposed effect is inert even if a stale edge still invokes it.
        if self.is_running.get() || !self.is_active.get() {
            return;
        }
        let _running = FlagGuard::set(&self.is_running);
        let d = &mut *self.data.borrow_mut();
        let EffectData { f, sb } = d;
        sb.track(|sc| run_callback(|| f(sc)));
    }

    fn dispose(self: Rc<Self>) {
        if !self.is_active.replace(false) {
            return;
        }
        // The borrow only fails when the subscription is dropped from inside
        // its own callback; the edges left behind are inert.
        if let Ok(mut d) = self.data.try_borrow_mut() {
            d.sb.clear();
        }
    }
}

impl<F> BindSink for EffectNode<F>
where
    F: FnMut(&mut SignalContext) + 'static,
{
    fn notify(self: Rc<Self>) {
        self.run();
    }
}
