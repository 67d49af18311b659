use std::{cell::Cell, rc::Rc};

use crate::Subscription;

#[test]
fn from_fn_runs_on_drop() {
    let called = Rc::new(Cell::new(false));
    let c = called.clone();
    let s = Subscription::from_fn(move || c.set(true));
    assert!(!called.get());

    drop(s);
    assert!(called.get());
}

#[test]
fn empty_is_inert() {
    drop(Subscription::empty());
}
