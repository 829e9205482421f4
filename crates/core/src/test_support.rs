// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes shared by tests across the workspace.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::os::fd::BorrowedFd;
use std::time::Duration;

use crate::system::{System, SystemError};

/// Deterministic [`System`] with a scripted environment and a virtual
/// clock.
///
/// `poll_readable` never reports readiness; instead it advances the
/// virtual clock by the requested timeout, so timeout paths that would
/// take wall-clock seconds run instantly. Tests that need real fd
/// readiness use [`crate::RealSystem`] with real fds.
pub struct FakeSystem {
    env: RefCell<HashMap<String, String>>,
    now: Cell<Duration>,
    poll_calls: Cell<u32>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self {
            env: RefCell::new(HashMap::new()),
            now: Cell::new(Duration::from_secs(1)),
            poll_calls: Cell::new(0),
        }
    }

    pub fn set_env(&self, name: impl Into<String>, value: impl Into<String>) {
        self.env.borrow_mut().insert(name.into(), value.into());
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of `poll_readable` calls made so far.
    pub fn poll_calls(&self) -> u32 {
        self.poll_calls.get()
    }
}

impl Default for FakeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for FakeSystem {
    fn time_since_epoch(&self) -> Duration {
        self.now.get()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.env.borrow().get(name).cloned()
    }

    fn poll_readable(
        &self,
        _fd: BorrowedFd<'_>,
        timeout: Option<Duration>,
    ) -> Result<bool, SystemError> {
        self.poll_calls.set(self.poll_calls.get() + 1);
        // A blocking wait in a test would hang forever; advance by a
        // nominal slice instead so elapsed-time bookkeeping still moves.
        self.advance(timeout.unwrap_or(Duration::from_millis(10)));
        Ok(false)
    }
}
