// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking facade over the asynchronous storage.
//!
//! Each call drains already-pending events, waits for backend readiness
//! within the operation timeout, submits the asynchronous operation, and
//! blocks polling the storage fd until its single completion arrives.
//! There is no built-in retry; transient failures surface to the caller.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use sdl_core::system::{RealSystem, System};
use sdl_core::{Data, DataMap, Error, Keys};
use tracing::warn;

use crate::api::AsyncStorage;

/// Poll granularity while waiting for readiness: a tenth of the
/// operation timeout.
const READINESS_POLL_DIVISOR: u32 = 10;

pub struct SyncStorage {
    storage: Rc<dyn AsyncStorage>,
    system: Rc<dyn System>,
    /// Zero disables the timeout.
    operation_timeout: Cell<Duration>,
}

impl SyncStorage {
    pub fn new(storage: Rc<dyn AsyncStorage>) -> Self {
        Self::with_system(storage, Rc::new(RealSystem))
    }

    pub fn with_system(storage: Rc<dyn AsyncStorage>, system: Rc<dyn System>) -> Self {
        Self { storage, system, operation_timeout: Cell::new(Duration::ZERO) }
    }

    /// Bound every subsequent operation's readiness wait by `timeout`;
    /// zero waits indefinitely.
    pub fn set_operation_timeout(&self, timeout: Duration) {
        self.operation_timeout.set(timeout);
    }

    /// Block until the backend serving `ns` is ready, or `timeout`
    /// expires (zero blocks indefinitely).
    pub fn wait_ready(&self, ns: &str, timeout: Duration) -> Result<(), Error> {
        match self.wait_sdl_ready(ns, timeout) {
            Some(result) => result,
            None => Err(readiness_timeout_error(ns)),
        }
    }

    pub fn set(&self, ns: &str, data_map: DataMap) -> Result<(), Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage.set(ns, data_map, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    pub fn set_if(
        &self,
        ns: &str,
        key: &str,
        old_data: Data,
        new_data: Data,
    ) -> Result<bool, Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage
            .set_if(ns, key, old_data, new_data, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    pub fn set_if_not_exists(&self, ns: &str, key: &str, data: Data) -> Result<bool, Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage
            .set_if_not_exists(ns, key, data, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    pub fn get(&self, ns: &str, keys: Keys) -> Result<DataMap, Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage.get(ns, keys, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    pub fn remove(&self, ns: &str, keys: Keys) -> Result<(), Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage.remove(ns, keys, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    pub fn remove_if(&self, ns: &str, key: &str, data: Data) -> Result<bool, Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage.remove_if(ns, key, data, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    pub fn find_keys(&self, ns: &str, key_prefix: &str) -> Result<Keys, Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage.find_keys(ns, key_prefix, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    pub fn list_keys(&self, ns: &str, pattern: &str) -> Result<Keys, Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage.list_keys(ns, pattern, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    pub fn remove_all(&self, ns: &str) -> Result<(), Error> {
        self.ready_check(ns)?;
        let slot = completion_slot();
        self.storage.remove_all(ns, completion_ack(&slot));
        self.wait_operation(&slot)
    }

    /// Pre-operation step: drain buffered events, then require readiness
    /// within the configured operation timeout.
    fn ready_check(&self, ns: &str) -> Result<(), Error> {
        self.handle_pending_events();
        match self.wait_sdl_ready(ns, self.operation_timeout.get()) {
            Some(result) => result,
            None => Err(readiness_timeout_error(ns)),
        }
    }

    /// `None` means the wait timed out before the readiness ack arrived.
    fn wait_sdl_ready(&self, ns: &str, timeout: Duration) -> Option<Result<(), Error>> {
        let slot = completion_slot();
        self.storage.wait_ready(ns, completion_ack(&slot));

        if timeout.is_zero() {
            loop {
                if let Some(result) = slot.borrow_mut().take() {
                    return Some(result);
                }
                self.poll_and_handle(None);
            }
        }

        let poll_timeout = timeout / READINESS_POLL_DIVISOR;
        let start = self.system.time_since_epoch();
        loop {
            if let Some(result) = slot.borrow_mut().take() {
                return Some(result);
            }
            if self.system.time_since_epoch() - start >= timeout {
                return None;
            }
            self.poll_and_handle(Some(poll_timeout));
        }
    }

    fn wait_operation<T>(&self, slot: &CompletionSlot<T>) -> Result<T, Error> {
        loop {
            if let Some(result) = slot.borrow_mut().take() {
                return result;
            }
            self.poll_and_handle(None);
        }
    }

    fn handle_pending_events(&self) {
        while let Ok(true) = self
            .system
            .poll_readable(self.storage.fd(), Some(Duration::ZERO))
        {
            self.storage.handle_events();
        }
    }

    fn poll_and_handle(&self, timeout: Option<Duration>) {
        match self.system.poll_readable(self.storage.fd(), timeout) {
            Ok(true) => self.storage.handle_events(),
            Ok(false) => {}
            Err(error) => warn!("poll on storage fd failed: {error}"),
        }
    }
}

type CompletionSlot<T> = Rc<RefCell<Option<Result<T, Error>>>>;

fn completion_slot<T>() -> CompletionSlot<T> {
    Rc::new(RefCell::new(None))
}

fn completion_ack<T: 'static>(slot: &CompletionSlot<T>) -> Box<dyn FnOnce(Result<T, Error>)> {
    let slot = Rc::clone(slot);
    Box::new(move |result| *slot.borrow_mut() = Some(result))
}

fn readiness_timeout_error(ns: &str) -> Error {
    Error::RejectedBySdl(format!("timeout, SDL service not ready for the '{ns}' namespace"))
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
