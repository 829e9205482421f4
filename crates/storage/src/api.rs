// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous storage API.

use std::os::fd::BorrowedFd;

use sdl_core::{Data, DataMap, Error, Keys};

/// Completion of a readiness check.
pub type ReadyAck = Box<dyn FnOnce(Result<(), Error>)>;

/// Completion of a modifying operation.
pub type ModifyAck = Box<dyn FnOnce(Result<(), Error>)>;

/// Completion of a conditional modification; the boolean tells whether
/// the condition held and the modification was applied.
pub type ModifyIfAck = Box<dyn FnOnce(Result<bool, Error>)>;

/// Completion of a read; contains only the keys that exist.
pub type GetAck = Box<dyn FnOnce(Result<DataMap, Error>)>;

/// Completion of a key search.
pub type FindKeysAck = Box<dyn FnOnce(Result<Keys, Error>)>;

/// Namespaced key/value storage, fully asynchronous.
///
/// Every operation invokes its completion callback exactly once, on the
/// engine thread, unless the storage is dropped with the operation still
/// in flight. All calls must come from the engine thread.
pub trait AsyncStorage {
    /// Readiness fd for external polling: readable whenever
    /// [`AsyncStorage::handle_events`] has work to do.
    fn fd(&self) -> BorrowedFd<'_>;

    /// Non-blocking drain of pending events and completions.
    fn handle_events(&self);

    /// Completes ok once the backend serving `ns` has a published
    /// endpoint and an established connection.
    fn wait_ready(&self, ns: &str, ack: ReadyAck);

    /// Write every pair in `data_map`. No atomicity across keys.
    fn set(&self, ns: &str, data_map: DataMap, ack: ModifyAck);

    /// Write `new_data` under `key` iff the stored value equals
    /// `old_data`.
    fn set_if(&self, ns: &str, key: &str, old_data: Data, new_data: Data, ack: ModifyIfAck);

    /// Write `data` under `key` iff the key does not exist.
    fn set_if_not_exists(&self, ns: &str, key: &str, data: Data, ack: ModifyIfAck);

    /// Read the given keys; absent keys are simply missing from the
    /// result.
    fn get(&self, ns: &str, keys: Keys, ack: GetAck);

    /// Delete the given keys; absent keys are not an error.
    fn remove(&self, ns: &str, keys: Keys, ack: ModifyAck);

    /// Delete `key` iff the stored value equals `data`.
    fn remove_if(&self, ns: &str, key: &str, data: Data, ack: ModifyIfAck);

    /// Find every key in `ns` whose name starts with `key_prefix`
    /// (treated literally).
    fn find_keys(&self, ns: &str, key_prefix: &str, ack: FindKeysAck);

    /// Find every key in `ns` matching the glob `pattern`.
    fn list_keys(&self, ns: &str, pattern: &str, ack: FindKeysAck);

    /// Delete every key in `ns`.
    fn remove_all(&self, ns: &str, ack: ModifyAck);
}
