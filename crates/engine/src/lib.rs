// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sdl-engine: the single-threaded event loop.
//!
//! One [`EventLoop`] instance belongs to one thread. It multiplexes file
//! descriptors through epoll, runs an ordered one-shot timer queue over a
//! single timerfd, and drains a callback inbox fed through an eventfd.
//! The only operation reaching the loop from other threads is
//! [`Wakeup::post`]; everything else is engine-thread-only by
//! construction (`Rc`-based handles are not `Send`).

pub mod engine;
pub mod fd;
pub mod timer;
pub mod wakeup;

pub use engine::{
    Engine, EventHandler, EventLoop, EventMask, PostedCallback, TimerCallback, TimerKey, TimerSlot,
};
pub use fd::FileDescriptor;
pub use timer::Timer;
pub use wakeup::{RemoteCallback, Wakeup};
