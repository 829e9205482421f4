// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event loop: fd monitoring, timers, and the callback inbox.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::BitOr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use nix::sys::eventfd::{EfdFlags, EventFd};
use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{
    ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags,
};
use sdl_core::sdl_abort;
use sdl_core::system::System;

use crate::wakeup::{SharedInbox, Wakeup};

/// Interest/readiness mask, private mapping to the OS constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventMask(u8);

impl EventMask {
    pub const IN: EventMask = EventMask(0b01);
    pub const OUT: EventMask = EventMask(0b10);

    pub fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

/// Handler invoked with the readiness mask each time a monitored fd
/// reports events.
pub type EventHandler = Box<dyn FnMut(EventMask)>;

/// Callback queued with [`Engine::post_callback`]; runs once on the
/// engine thread before the next wait.
pub type PostedCallback = Box<dyn FnOnce()>;

/// One-shot timer callback.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Position of an armed timer in the queue. Ordered by deadline, ties
/// broken by arm order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerKey {
    deadline: Duration,
    seq: u64,
}

/// Back-reference from the queue to a [`crate::Timer`]'s armed state,
/// cleared just before the callback runs.
pub type TimerSlot = Weak<Cell<Option<TimerKey>>>;

/// The event loop interface consumed by the rest of the runtime.
///
/// All methods must be called from the engine thread; the cross-thread
/// entry point is the handle returned by [`Engine::wakeup`].
pub trait Engine {
    /// OS-visible readiness fd, pollable by a sync wrapper: readable
    /// whenever the loop has work to dispatch.
    fn fd(&self) -> BorrowedFd<'_>;

    /// Non-blocking single drain of ready events.
    fn handle_events(&self);

    /// Register a monitored fd. Registering an already-monitored fd is a
    /// programmer error and aborts.
    fn add_monitored_fd(&self, fd: BorrowedFd<'_>, events: EventMask, handler: EventHandler);

    /// Change the interest set of a monitored fd; absent fd aborts.
    fn modify_monitored_fd(&self, fd: BorrowedFd<'_>, events: EventMask);

    /// Stop monitoring an fd; absent fd aborts. Any ready event still
    /// buffered for the fd in the current dispatch round is invalidated.
    fn delete_monitored_fd(&self, fd: BorrowedFd<'_>);

    /// Queue a callback to run once on the engine thread before the next
    /// wait. Engine-thread callers only; other threads use
    /// [`Engine::wakeup`].
    fn post_callback(&self, callback: PostedCallback);

    /// Cross-thread post handle.
    fn wakeup(&self) -> Wakeup;

    /// Arm a one-shot timer at now + `delay`. Used via [`crate::Timer`].
    fn arm_timer(&self, delay: Duration, slot: TimerSlot, callback: TimerCallback) -> TimerKey;

    /// Remove a queued timer; unknown keys are ignored (the timer
    /// already fired).
    fn disarm_timer(&self, key: TimerKey);

    /// Block dispatching events until [`Engine::stop`].
    fn run(&self);

    /// Post a stop request; `run` returns after the current drain.
    fn stop(&self);
}

struct TimerEntry {
    slot: TimerSlot,
    callback: TimerCallback,
}

#[derive(Clone, Copy)]
struct ReadyEvent {
    fd: RawFd,
    events: EventMask,
}

const INVALIDATED_FD: RawFd = -1;

/// Production [`Engine`] over epoll, timerfd, and eventfd.
pub struct EventLoop {
    system: Rc<dyn System>,
    epoll: Epoll,
    timer_fd: TimerFd,
    event_fd: EventFd,
    handlers: RefCell<HashMap<RawFd, Rc<RefCell<EventHandler>>>>,
    /// Ready batch of the in-progress dispatch round; deletion marks
    /// entries with [`INVALIDATED_FD`] so their handlers are skipped.
    ready: RefCell<Vec<ReadyEvent>>,
    timers: RefCell<BTreeMap<TimerKey, TimerEntry>>,
    timer_seq: Cell<u64>,
    local_queue: RefCell<VecDeque<PostedCallback>>,
    shared: Arc<SharedInbox>,
    stop_flag: Arc<AtomicBool>,
}

impl EventLoop {
    pub fn new(system: Rc<dyn System>) -> Rc<Self> {
        let epoll = match Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC) {
            Ok(epoll) => epoll,
            Err(errno) => sdl_abort!("epoll_create failed: {errno}"),
        };
        let timer_fd = match TimerFd::new(
            ClockId::CLOCK_MONOTONIC,
            TimerFlags::TFD_NONBLOCK | TimerFlags::TFD_CLOEXEC,
        ) {
            Ok(fd) => fd,
            Err(errno) => sdl_abort!("timerfd_create failed: {errno}"),
        };
        let event_fd = match EventFd::from_value_and_flags(
            0,
            EfdFlags::EFD_NONBLOCK | EfdFlags::EFD_CLOEXEC,
        ) {
            Ok(fd) => fd,
            Err(errno) => sdl_abort!("eventfd create failed: {errno}"),
        };
        let shared = match SharedInbox::new(event_fd.as_fd()) {
            Ok(shared) => Arc::new(shared),
            Err(err) => sdl_abort!("eventfd dup failed: {err}"),
        };

        let engine = Rc::new(Self {
            system,
            epoll,
            timer_fd,
            event_fd,
            handlers: RefCell::new(HashMap::new()),
            ready: RefCell::new(Vec::new()),
            timers: RefCell::new(BTreeMap::new()),
            timer_seq: Cell::new(0),
            local_queue: RefCell::new(VecDeque::new()),
            shared,
            stop_flag: Arc::new(AtomicBool::new(false)),
        });

        let timer_loop = Rc::downgrade(&engine);
        engine.add_monitored_fd(
            engine.timer_fd.as_fd(),
            EventMask::IN,
            Box::new(move |_| {
                if let Some(engine) = timer_loop.upgrade() {
                    engine.on_timer_readable();
                }
            }),
        );
        let inbox_loop = Rc::downgrade(&engine);
        engine.add_monitored_fd(
            engine.event_fd.as_fd(),
            EventMask::IN,
            Box::new(move |_| {
                if let Some(engine) = inbox_loop.upgrade() {
                    engine.on_wakeup_readable();
                }
            }),
        );
        engine
    }

    fn wait_and_dispatch(&self, timeout: EpollTimeout) {
        let capacity = self.handlers.borrow().len();
        if capacity == 0 {
            return;
        }
        let mut buffer = vec![EpollEvent::empty(); capacity];
        let count = match self.epoll.wait(&mut buffer, timeout) {
            Ok(count) => count,
            Err(Errno::EINTR) => return,
            Err(errno) => sdl_abort!("epoll_wait failed: {errno}"),
        };
        if count == 0 {
            return;
        }
        {
            let mut ready = self.ready.borrow_mut();
            ready.clear();
            ready.extend(buffer[..count].iter().map(|event| ReadyEvent {
                fd: event.data() as RawFd,
                events: from_epoll_flags(event.events()),
            }));
        }
        let mut index = 0;
        loop {
            let event = {
                let ready = self.ready.borrow();
                match ready.get(index) {
                    Some(event) => *event,
                    None => break,
                }
            };
            index += 1;
            if event.fd == INVALIDATED_FD {
                continue;
            }
            let handler = self.handlers.borrow().get(&event.fd).cloned();
            if let Some(handler) = handler {
                (handler.borrow_mut())(event.events);
            }
        }
        self.ready.borrow_mut().clear();
    }

    fn on_timer_readable(&self) {
        let mut count = [0u8; 8];
        // Coalesced expiration counter; EAGAIN just means an earlier drain
        // already consumed it.
        let _ = nix::unistd::read(self.timer_fd.as_fd().as_raw_fd(), &mut count);
        self.run_expired_timers();
    }

    fn run_expired_timers(&self) {
        let now = self.system.time_since_epoch();
        loop {
            let expired = {
                let mut timers = self.timers.borrow_mut();
                match timers.first_key_value() {
                    Some((key, _)) if key.deadline <= now => {
                        let key = *key;
                        timers.remove(&key).map(|entry| (key, entry))
                    }
                    _ => None,
                }
            };
            let Some((key, entry)) = expired else {
                break;
            };
            if let Some(slot) = entry.slot.upgrade() {
                if slot.get() == Some(key) {
                    slot.set(None);
                }
            }
            (entry.callback)();
        }
        let next = self.timers.borrow().first_key_value().map(|(key, _)| key.deadline);
        self.set_timer_fd(next);
    }

    fn on_wakeup_readable(&self) {
        let mut counter = [0u8; 8];
        let _ = nix::unistd::read(self.event_fd.as_raw_fd(), &mut counter);
        // Swap queues out whole: callbacks posted by a running callback
        // land in the next drain.
        let local = std::mem::take(&mut *self.local_queue.borrow_mut());
        for callback in local {
            callback();
        }
        for callback in self.shared.drain() {
            callback();
        }
    }

    fn set_timer_fd(&self, deadline: Option<Duration>) {
        let result = match deadline {
            Some(deadline) => self.timer_fd.set(
                Expiration::OneShot(TimeSpec::from_duration(deadline)),
                TimerSetTimeFlags::TFD_TIMER_ABSTIME,
            ),
            None => self.timer_fd.unset(),
        };
        if let Err(errno) = result {
            sdl_abort!("timerfd_settime failed: {errno}");
        }
    }
}

impl Engine for EventLoop {
    fn fd(&self) -> BorrowedFd<'_> {
        self.epoll.0.as_fd()
    }

    fn handle_events(&self) {
        self.wait_and_dispatch(EpollTimeout::ZERO);
    }

    fn add_monitored_fd(&self, fd: BorrowedFd<'_>, events: EventMask, handler: EventHandler) {
        let raw = fd.as_raw_fd();
        if self.handlers.borrow().contains_key(&raw) {
            sdl_abort!("monitored fd {raw} has already been added");
        }
        let event = EpollEvent::new(to_epoll_flags(events), raw as u64);
        if let Err(errno) = self.epoll.add(fd, event) {
            sdl_abort!("epoll_ctl add failed for fd {raw}: {errno}");
        }
        self.handlers
            .borrow_mut()
            .insert(raw, Rc::new(RefCell::new(handler)));
    }

    fn modify_monitored_fd(&self, fd: BorrowedFd<'_>, events: EventMask) {
        let raw = fd.as_raw_fd();
        if !self.handlers.borrow().contains_key(&raw) {
            sdl_abort!("modified monitored fd {raw} does not exist");
        }
        let mut event = EpollEvent::new(to_epoll_flags(events), raw as u64);
        if let Err(errno) = self.epoll.modify(fd, &mut event) {
            sdl_abort!("epoll_ctl mod failed for fd {raw}: {errno}");
        }
    }

    fn delete_monitored_fd(&self, fd: BorrowedFd<'_>) {
        let raw = fd.as_raw_fd();
        if self.handlers.borrow_mut().remove(&raw).is_none() {
            sdl_abort!("monitored (to be deleted) fd {raw} does not exist");
        }
        for slot in self.ready.borrow_mut().iter_mut() {
            if slot.fd == raw {
                slot.fd = INVALIDATED_FD;
                break;
            }
        }
        if let Err(errno) = self.epoll.delete(fd) {
            sdl_abort!("epoll_ctl del failed for fd {raw}: {errno}");
        }
    }

    fn post_callback(&self, callback: PostedCallback) {
        self.local_queue.borrow_mut().push_back(callback);
        self.shared.signal();
    }

    fn wakeup(&self) -> Wakeup {
        Wakeup::new(Arc::clone(&self.shared))
    }

    fn arm_timer(&self, delay: Duration, slot: TimerSlot, callback: TimerCallback) -> TimerKey {
        let deadline = self.system.time_since_epoch() + delay;
        let seq = self.timer_seq.get();
        self.timer_seq.set(seq + 1);
        let key = TimerKey { deadline, seq };
        let is_new_minimum = {
            let mut timers = self.timers.borrow_mut();
            timers.insert(key, TimerEntry { slot, callback });
            timers.first_key_value().map(|(first, _)| *first) == Some(key)
        };
        if is_new_minimum {
            self.set_timer_fd(Some(deadline));
        }
        key
    }

    fn disarm_timer(&self, key: TimerKey) {
        let rearm = {
            let mut timers = self.timers.borrow_mut();
            let was_minimum =
                timers.first_key_value().map(|(first, _)| *first) == Some(key);
            let removed = timers.remove(&key).is_some();
            if removed && was_minimum {
                Some(timers.first_key_value().map(|(first, _)| first.deadline))
            } else {
                None
            }
        };
        if let Some(next) = rearm {
            self.set_timer_fd(next);
        }
    }

    fn run(&self) {
        while !self.stop_flag.load(Ordering::Relaxed) {
            self.wait_and_dispatch(EpollTimeout::NONE);
        }
        self.stop_flag.store(false, Ordering::Relaxed);
    }

    fn stop(&self) {
        let flag = Arc::clone(&self.stop_flag);
        self.post_callback(Box::new(move || flag.store(true, Ordering::Relaxed)));
    }
}

fn to_epoll_flags(events: EventMask) -> EpollFlags {
    let mut flags = EpollFlags::empty();
    if events.contains(EventMask::IN) {
        flags |= EpollFlags::EPOLLIN;
    }
    if events.contains(EventMask::OUT) {
        flags |= EpollFlags::EPOLLOUT;
    }
    flags
}

fn from_epoll_flags(flags: EpollFlags) -> EventMask {
    let mut events = EventMask::default();
    if flags.contains(EpollFlags::EPOLLIN) {
        events = events | EventMask::IN;
    }
    if flags.contains(EpollFlags::EPOLLOUT) {
        events = events | EventMask::OUT;
    }
    events
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
