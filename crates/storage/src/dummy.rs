// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op handler for namespaces with the backend disabled.
//!
//! Every operation completes successfully with an empty result, still
//! asynchronously through the engine loop so callers cannot tell the
//! difference in control flow.

use std::os::fd::BorrowedFd;
use std::rc::Rc;

use sdl_core::{Data, DataMap, Keys};
use sdl_engine::Engine;

use crate::api::{AsyncStorage, FindKeysAck, GetAck, ModifyAck, ModifyIfAck, ReadyAck};

pub struct DummyStorage {
    engine: Rc<dyn Engine>,
}

impl DummyStorage {
    pub fn new(engine: Rc<dyn Engine>) -> Self {
        Self { engine }
    }

    fn post(&self, callback: impl FnOnce() + 'static) {
        self.engine.post_callback(Box::new(callback));
    }
}

impl AsyncStorage for DummyStorage {
    fn fd(&self) -> BorrowedFd<'_> {
        self.engine.fd()
    }

    fn handle_events(&self) {
        self.engine.handle_events();
    }

    fn wait_ready(&self, _ns: &str, ack: ReadyAck) {
        self.post(move || ack(Ok(())));
    }

    fn set(&self, _ns: &str, _data_map: DataMap, ack: ModifyAck) {
        self.post(move || ack(Ok(())));
    }

    fn set_if(&self, _ns: &str, _key: &str, _old: Data, _new: Data, ack: ModifyIfAck) {
        self.post(move || ack(Ok(true)));
    }

    fn set_if_not_exists(&self, _ns: &str, _key: &str, _data: Data, ack: ModifyIfAck) {
        self.post(move || ack(Ok(true)));
    }

    fn get(&self, _ns: &str, _keys: Keys, ack: GetAck) {
        self.post(move || ack(Ok(DataMap::new())));
    }

    fn remove(&self, _ns: &str, _keys: Keys, ack: ModifyAck) {
        self.post(move || ack(Ok(())));
    }

    fn remove_if(&self, _ns: &str, _key: &str, _data: Data, ack: ModifyIfAck) {
        self.post(move || ack(Ok(true)));
    }

    fn find_keys(&self, _ns: &str, _key_prefix: &str, ack: FindKeysAck) {
        self.post(move || ack(Ok(Keys::new())));
    }

    fn list_keys(&self, _ns: &str, _pattern: &str, ack: FindKeysAck) {
        self.post(move || ack(Ok(Keys::new())));
    }

    fn remove_all(&self, _ns: &str, ack: ModifyAck) {
        self.post(move || ack(Ok(())));
    }
}

#[cfg(test)]
#[path = "dummy_tests.rs"]
mod tests;
