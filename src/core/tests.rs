use assert_call::{call, CallRecorder};

use crate::{effect, untracked, State};

#[test]
fn untracked_returns_value() {
    let s = State::new(5);
    assert_eq!(untracked(|sc| s.get(sc)), 5);
}

#[test]
fn untrack_suspends_dependency_recording() {
    let mut cr = CallRecorder::new();
    let a = State::new(1);
    let b = State::new(10);
    let (a0, b0) = (a.clone(), b.clone());
    let _e = effect(move |sc| {
        let a = a0.get(sc);
        let b = sc.untrack(|sc| b0.get(sc));
        call!("{}", a + b);
    });
    cr.verify("11");

    b.set(20);
    cr.verify(()); // the untracked read recorded no edge

    a.set(2);
    cr.verify("22");
}

#[test]
fn untrack_restores_tracking_afterwards() {
    let mut cr = CallRecorder::new();
    let a = State::new(1);
    let b = State::new(10);
    let (a0, b0) = (a.clone(), b.clone());
    let _e = effect(move |sc| {
        sc.untrack(|sc| a0.get(sc));
        call!("{}", b0.get(sc));
    });
    cr.verify("10");

    b.set(20);
    cr.verify("20");
}

#[test]
fn notify_pass_uses_snapshot() {
    // a subscriber that unsubscribes and resubscribes mid-pass runs exactly once
    let mut cr = CallRecorder::new();
    let s = State::new(0);
    let (s0, s1) = (s.clone(), s.clone());
    let _e1 = effect(move |sc| call!("e1={}", s0.get(sc)));
    let _e2 = effect(move |sc| call!("e2={}", s1.get(sc)));
    cr.verify(["e1=0", "e2=0"]);

    s.set(1);
    cr.verify(["e1=1", "e2=1"]);
}
