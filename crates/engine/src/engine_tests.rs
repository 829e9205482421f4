// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nix::sys::eventfd::{EfdFlags, EventFd};
use sdl_core::system::{RealSystem, System};
use std::time::Instant;

fn engine() -> Rc<EventLoop> {
    EventLoop::new(Rc::new(RealSystem))
}

fn readable_eventfd() -> EventFd {
    let fd = EventFd::from_value_and_flags(0, EfdFlags::EFD_NONBLOCK).unwrap();
    nix::unistd::write(fd.as_fd(), &1u64.to_ne_bytes()).unwrap();
    fd
}

#[test]
fn dispatches_readable_fd_to_handler() {
    let engine = engine();
    let event_fd = readable_eventfd();
    let seen = Rc::new(Cell::new(EventMask::default()));

    let seen_in_handler = Rc::clone(&seen);
    engine.add_monitored_fd(
        event_fd.as_fd(),
        EventMask::IN,
        Box::new(move |events| seen_in_handler.set(events)),
    );

    engine.handle_events();

    assert!(seen.get().contains(EventMask::IN));
}

#[test]
fn reports_write_readiness() {
    let engine = engine();
    let event_fd = EventFd::from_value_and_flags(0, EfdFlags::EFD_NONBLOCK).unwrap();
    let seen = Rc::new(Cell::new(EventMask::default()));

    let seen_in_handler = Rc::clone(&seen);
    engine.add_monitored_fd(
        event_fd.as_fd(),
        EventMask::OUT,
        Box::new(move |events| seen_in_handler.set(events)),
    );

    engine.handle_events();

    assert!(seen.get().contains(EventMask::OUT));
    assert!(!seen.get().contains(EventMask::IN));
}

#[test]
#[should_panic(expected = "already been added")]
fn duplicate_registration_aborts() {
    let engine = engine();
    let event_fd = readable_eventfd();
    engine.add_monitored_fd(event_fd.as_fd(), EventMask::IN, Box::new(|_| {}));
    engine.add_monitored_fd(event_fd.as_fd(), EventMask::IN, Box::new(|_| {}));
}

#[test]
#[should_panic(expected = "does not exist")]
fn modifying_unknown_fd_aborts() {
    let engine = engine();
    let event_fd = readable_eventfd();
    engine.modify_monitored_fd(event_fd.as_fd(), EventMask::OUT);
}

#[test]
#[should_panic(expected = "does not exist")]
fn deleting_unknown_fd_aborts() {
    let engine = engine();
    let event_fd = readable_eventfd();
    engine.delete_monitored_fd(event_fd.as_fd());
}

#[test]
fn modify_changes_interest_set() {
    let engine = engine();
    let event_fd = readable_eventfd();
    let calls = Rc::new(Cell::new(0u32));

    let calls_in_handler = Rc::clone(&calls);
    engine.add_monitored_fd(
        event_fd.as_fd(),
        EventMask::IN,
        Box::new(move |_| calls_in_handler.set(calls_in_handler.get() + 1)),
    );
    engine.handle_events();
    assert_eq!(calls.get(), 1);

    // With only OUT interest the armed counter no longer wakes us; an
    // eventfd is always writable though, so the handler fires with OUT.
    engine.modify_monitored_fd(event_fd.as_fd(), EventMask::OUT);
    engine.handle_events();
    assert_eq!(calls.get(), 2);
}

#[test]
fn deleting_sibling_fd_invalidates_its_buffered_event() {
    let engine = engine();
    let first = Rc::new(readable_eventfd());
    let second = Rc::new(readable_eventfd());
    let ran = Rc::new(Cell::new(0u32));

    // Each handler deletes the other registration: whichever runs first
    // must be the only one to run in this round.
    let engine_in_first = Rc::clone(&engine);
    let second_in_first = Rc::clone(&second);
    let ran_in_first = Rc::clone(&ran);
    engine.add_monitored_fd(
        first.as_fd(),
        EventMask::IN,
        Box::new(move |_| {
            ran_in_first.set(ran_in_first.get() + 1);
            engine_in_first.delete_monitored_fd(second_in_first.as_fd());
        }),
    );

    let engine_in_second = Rc::clone(&engine);
    let first_in_second = Rc::clone(&first);
    let ran_in_second = Rc::clone(&ran);
    engine.add_monitored_fd(
        second.as_fd(),
        EventMask::IN,
        Box::new(move |_| {
            ran_in_second.set(ran_in_second.get() + 1);
            engine_in_second.delete_monitored_fd(first_in_second.as_fd());
        }),
    );

    engine.handle_events();

    assert_eq!(ran.get(), 1);
}

#[test]
fn posted_callbacks_run_in_fifo_order() {
    let engine = engine();
    let order = Rc::new(RefCell::new(Vec::new()));

    for tag in 1..=3 {
        let order = Rc::clone(&order);
        engine.post_callback(Box::new(move || order.borrow_mut().push(tag)));
    }
    engine.handle_events();

    assert_eq!(*order.borrow(), vec![1, 2, 3]);
}

#[test]
fn callbacks_posted_during_drain_wait_for_next_drain() {
    let engine = engine();
    let order = Rc::new(RefCell::new(Vec::new()));

    let engine_in_cb = Rc::clone(&engine);
    let order_in_cb = Rc::clone(&order);
    engine.post_callback(Box::new(move || {
        order_in_cb.borrow_mut().push("first");
        let order_nested = Rc::clone(&order_in_cb);
        engine_in_cb.post_callback(Box::new(move || order_nested.borrow_mut().push("nested")));
    }));

    engine.handle_events();
    assert_eq!(*order.borrow(), vec!["first"]);

    engine.handle_events();
    assert_eq!(*order.borrow(), vec!["first", "nested"]);
}

#[test]
fn stop_unblocks_run() {
    let engine = engine();
    let engine_in_cb = Rc::clone(&engine);
    engine.post_callback(Box::new(move || engine_in_cb.stop()));

    let started = Instant::now();
    engine.run();
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn run_executes_timers_in_deadline_order() {
    let engine = engine();
    let order = Rc::new(RefCell::new(Vec::new()));

    for (tag, delay_ms) in [("slow", 60u64), ("fast", 10), ("middle", 30)] {
        let order = Rc::clone(&order);
        engine.arm_timer(
            Duration::from_millis(delay_ms),
            Weak::new(),
            Box::new(move || order.borrow_mut().push(tag)),
        );
    }
    let engine_in_cb = Rc::clone(&engine);
    engine.arm_timer(
        Duration::from_millis(90),
        Weak::new(),
        Box::new(move || engine_in_cb.stop()),
    );

    engine.run();

    assert_eq!(*order.borrow(), vec!["fast", "middle", "slow"]);
}

#[test]
fn engine_fd_polls_readable_when_events_pending() {
    let engine = engine();
    let system = RealSystem;
    let event_fd = readable_eventfd();
    engine.add_monitored_fd(event_fd.as_fd(), EventMask::IN, Box::new(|_| {}));

    assert!(system
        .poll_readable(engine.fd(), Some(Duration::from_secs(1)))
        .unwrap());
}

#[test]
fn event_mask_combines_and_queries() {
    let both = EventMask::IN | EventMask::OUT;
    assert!(both.contains(EventMask::IN));
    assert!(both.contains(EventMask::OUT));
    assert!(!EventMask::IN.contains(EventMask::OUT));
    assert!(EventMask::default().is_empty());
}
