use std::{
    cell::Cell,
    panic::{catch_unwind, AssertUnwindSafe},
    rc::Rc,
};

use assert_call::{call, CallRecorder};

use crate::{effect, State};

#[test]
fn test_effect() {
    let mut cr = CallRecorder::new();
    let s = State::new(10);
    let s0 = s.clone();
    let e = effect(move |sc| call!("{}", s0.get(sc)));
    cr.verify("10"); // runs once before `effect` returns

    s.set(10);
    cr.verify(()); // not called again because the value did not change

    s.set(20);
    cr.verify("20");

    drop(e);
    s.set(30);
    cr.verify(()); // not called again because the effect was dropped
}

#[test]
fn dependencies_rebuilt_each_run() {
    let mut cr = CallRecorder::new();
    let cond = State::new(true);
    let a = State::new("a");
    let b = State::new("b");
    let (cond0, a0, b0) = (cond.clone(), a.clone(), b.clone());
    let _e = effect(move |sc| {
        if cond0.get(sc) {
            call!("a={}", a0.get(sc));
        } else {
            call!("b={}", b0.get(sc));
        }
    });
    cr.verify("a=a");

    cond.set(false);
    cr.verify("b=b");

    // `a` was not read by the most recent run and no longer triggers it
    a.set("a2");
    cr.verify(());

    b.set("b2");
    cr.verify("b=b2");
}

#[test]
fn duplicate_reads_subscribe_once() {
    let mut cr = CallRecorder::new();
    let s = State::new(1);
    let s0 = s.clone();
    let _e = effect(move |sc| {
        call!("{}", s0.get(sc) + s0.get(sc));
    });
    cr.verify("2");

    s.set(2);
    cr.verify("4");
}

#[test]
fn nested_effect_restores_outer_tracking() {
    let mut cr = CallRecorder::new();
    let outer = State::new(1);
    let inner = State::new(10);
    let after = State::new(100);
    let (outer0, inner0, after0) = (outer.clone(), inner.clone(), after.clone());
    let _e = effect(move |sc| {
        call!("outer={}", outer0.get(sc));
        let inner1 = inner0.clone();
        let _ = effect(move |sc| call!("inner={}", inner1.get(sc)));
        call!("after={}", after0.get(sc));
    });
    cr.verify(["outer=1", "inner=10", "after=100"]);

    // the value read after the nested construction still belongs to the outer effect
    after.set(200);
    cr.verify(["outer=1", "inner=10", "after=200"]);
}

#[test]
fn no_reentrant_run_on_self_write() {
    let mut cr = CallRecorder::new();
    let s = State::new(0);
    let s0 = s.clone();
    let _e = effect(move |sc| {
        let v = s0.get(sc);
        call!("{}", v);
        if v < 3 {
            // writing a dependency from inside the run must not re-enter
            s0.set(v + 1);
        }
    });
    cr.verify("0");
    assert_eq!(s.get_untracked(), 1);

    s.set(2);
    cr.verify("2");
    assert_eq!(s.get_untracked(), 3);
}

#[test]
fn panic_propagates_from_creation() {
    let result = catch_unwind(AssertUnwindSafe(|| {
        let _e = effect(|_sc| panic!("boom"));
    }));
    assert!(result.is_err());

    // the tracking machinery survives the failed run
    let mut cr = CallRecorder::new();
    let s = State::new(1);
    let s0 = s.clone();
    let _e = effect(move |sc| call!("{}", s0.get(sc)));
    cr.verify("1");
    s.set(2);
    cr.verify("2");
}

#[test]
fn panic_propagates_from_write() {
    let mut cr = CallRecorder::new();
    let s = State::new(0);
    let armed = Rc::new(Cell::new(false));
    let (s0, armed0) = (s.clone(), armed.clone());
    let _e = effect(move |sc| {
        let v = s0.get(sc);
        if armed0.get() {
            panic!("boom");
        }
        call!("{}", v);
    });
    cr.verify("0");

    armed.set(true);
    let result = catch_unwind(AssertUnwindSafe(|| s.set(1)));
    assert!(result.is_err());
    cr.verify(());

    // the failed run kept the dependencies recorded before the panic
    armed.set(false);
    s.set(2);
    cr.verify("2");
}

#[test]
fn panic_aborts_remaining_fanout() {
    let mut cr = CallRecorder::new();
    let s = State::new(0);
    let armed = Rc::new(Cell::new(false));
    let (s0, armed0) = (s.clone(), armed.clone());
    let _e1 = effect(move |sc| {
        let v = s0.get(sc);
        if armed0.get() {
            panic!("boom");
        }
        call!("first={}", v);
    });
    let s1 = s.clone();
    let _e2 = effect(move |sc| call!("second={}", s1.get(sc)));
    cr.verify(["first=0", "second=0"]);

    armed.set(true);
    assert!(catch_unwind(AssertUnwindSafe(|| s.set(1))).is_err());
    cr.verify(()); // the subscriber after the panicking one never ran
}

#[test]
fn dispose_removes_all_edges() {
    let mut cr = CallRecorder::new();
    let a = State::new(0);
    let b = State::new(0);
    let (a0, b0) = (a.clone(), b.clone());
    let e = effect(move |sc| call!("{}", a0.get(sc) + b0.get(sc)));
    cr.verify("0");

    drop(e);
    a.set(1);
    b.set(1);
    cr.verify(());
}
