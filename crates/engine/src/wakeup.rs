// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-thread callback posting.
//!
//! The inbox pairs a mutex-guarded deque with a duplicated handle to the
//! engine's eventfd. Posting appends and bumps the eventfd counter; the
//! engine drains the deque when the eventfd becomes readable. [`Wakeup`]
//! is the only `Send + Sync` surface of the engine.

use std::collections::VecDeque;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use parking_lot::Mutex;
use std::sync::Arc;

/// Callback posted from an arbitrary thread; runs once on the engine
/// thread.
pub type RemoteCallback = Box<dyn FnOnce() + Send>;

pub(crate) struct SharedInbox {
    queue: Mutex<VecDeque<RemoteCallback>>,
    wake_fd: OwnedFd,
}

impl SharedInbox {
    pub(crate) fn new(event_fd: BorrowedFd<'_>) -> io::Result<Self> {
        Ok(Self {
            queue: Mutex::new(VecDeque::new()),
            wake_fd: event_fd.try_clone_to_owned()?,
        })
    }

    /// Bump the eventfd counter so the engine's wait returns.
    ///
    /// A full counter (EAGAIN) already guarantees a pending wakeup, so
    /// the write result is ignored.
    pub(crate) fn signal(&self) {
        let _ = nix::unistd::write(self.wake_fd.as_fd(), &1u64.to_ne_bytes());
    }

    pub(crate) fn push(&self, callback: RemoteCallback) {
        self.queue.lock().push_back(callback);
        self.signal();
    }

    /// Swap out everything queued so far; later posts land in the next
    /// drain.
    pub(crate) fn drain(&self) -> VecDeque<RemoteCallback> {
        std::mem::take(&mut *self.queue.lock())
    }
}

/// Cloneable cross-thread handle to an engine's callback inbox.
///
/// Outlives the engine safely: posts after the engine is gone are
/// silently retained and never run.
#[derive(Clone)]
pub struct Wakeup {
    shared: Arc<SharedInbox>,
}

impl Wakeup {
    pub(crate) fn new(shared: Arc<SharedInbox>) -> Self {
        Self { shared }
    }

    /// Queue `callback` to run once on the engine thread before its next
    /// wait.
    pub fn post(&self, callback: RemoteCallback) {
        self.shared.push(callback);
    }
}

#[cfg(test)]
#[path = "wakeup_tests.rs"]
mod tests;
