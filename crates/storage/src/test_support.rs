// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher fakes shared by tests across the workspace.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use sdl_engine::Engine;

use crate::dispatcher::{
    AsyncCommandDispatcher, CommandCallback, CommandContents, ConnectedCallback,
    DisconnectCallback, DispatcherError, DispatcherFactory, DispatcherSetup, Reply,
};

/// Records dispatched commands and lets the test complete them
/// explicitly, in any order. Completion callbacks run inline.
pub struct RecordingDispatcher {
    permanent_command_callbacks: Cell<bool>,
    connected: Cell<bool>,
    pending_connected: RefCell<Vec<ConnectedCallback>>,
    disconnect_cb: RefCell<Option<DisconnectCallback>>,
    dispatched: RefCell<Vec<(String, CommandContents)>>,
    callbacks: RefCell<Vec<CommandCallback>>,
}

impl RecordingDispatcher {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            permanent_command_callbacks: Cell::new(false),
            connected: Cell::new(true),
            pending_connected: RefCell::new(Vec::new()),
            disconnect_cb: RefCell::new(None),
            dispatched: RefCell::new(Vec::new()),
            callbacks: RefCell::new(Vec::new()),
        })
    }

    /// Construct disconnected; [`RecordingDispatcher::signal_connected`]
    /// releases queued `wait_connected` callbacks.
    pub fn disconnected() -> Rc<Self> {
        let dispatcher = Self::new();
        dispatcher.connected.set(false);
        dispatcher
    }

    pub fn signal_connected(&self) {
        self.connected.set(true);
        let pending: Vec<ConnectedCallback> =
            self.pending_connected.borrow_mut().drain(..).collect();
        for callback in pending {
            callback();
        }
    }

    pub fn trigger_disconnect(&self) {
        let mut callback = self.disconnect_cb.borrow_mut().take();
        if let Some(callback) = callback.as_mut() {
            callback();
        }
        if let Some(callback) = callback {
            let mut slot = self.disconnect_cb.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched.borrow().len()
    }

    pub fn command(&self, index: usize) -> CommandContents {
        self.dispatched.borrow()[index].1.clone()
    }

    pub fn namespace(&self, index: usize) -> String {
        self.dispatched.borrow()[index].0.clone()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.dispatched
            .borrow()
            .iter()
            .map(|(_, contents)| contents.command_name().unwrap_or("<binary>").to_string())
            .collect()
    }

    /// Complete the command at `index`. The callback is taken out for
    /// the call (so it may dispatch again) and, on dispatchers created
    /// with permanent command callbacks, restored afterwards.
    pub fn complete(&self, index: usize, result: Result<Reply, DispatcherError>) {
        let mut callback = {
            let mut callbacks = self.callbacks.borrow_mut();
            std::mem::replace(&mut callbacks[index], Box::new(|_| {}) as CommandCallback)
        };
        callback(result);
        if self.permanent_command_callbacks.get() {
            self.callbacks.borrow_mut()[index] = callback;
        }
    }

    /// Complete the most recently dispatched command.
    pub fn complete_last(&self, result: Result<Reply, DispatcherError>) {
        let index = self.dispatched_count().saturating_sub(1);
        self.complete(index, result);
    }
}

impl AsyncCommandDispatcher for RecordingDispatcher {
    fn wait_connected(&self, callback: ConnectedCallback) {
        if self.connected.get() {
            callback();
        } else {
            self.pending_connected.borrow_mut().push(callback);
        }
    }

    fn register_disconnect_cb(&self, callback: DisconnectCallback) {
        *self.disconnect_cb.borrow_mut() = Some(callback);
    }

    fn dispatch(&self, ns: &str, contents: CommandContents, callback: CommandCallback) {
        self.dispatched.borrow_mut().push((ns.to_string(), contents));
        self.callbacks.borrow_mut().push(callback);
    }
}

/// Factory handing out the given dispatchers in construction order; the
/// `permanent_command_callbacks` flag of each setup is recorded on the
/// dispatcher it receives.
pub fn recording_factory(dispatchers: Vec<Rc<RecordingDispatcher>>) -> DispatcherFactory {
    let queue = RefCell::new(dispatchers);
    Rc::new(move |setup: DispatcherSetup| {
        let dispatcher = queue.borrow_mut().remove(0);
        dispatcher
            .permanent_command_callbacks
            .set(setup.permanent_command_callbacks);
        dispatcher as Rc<dyn AsyncCommandDispatcher>
    })
}

/// Key/value store shared between an [`InMemoryDispatcher`] and the
/// test asserting on it. Keys are full backend keys (`"{ns},key"`).
pub type SharedStore = Rc<RefCell<HashMap<String, Vec<u8>>>>;

pub fn shared_store() -> SharedStore {
    Rc::new(RefCell::new(HashMap::new()))
}

/// Dispatcher executing the storage command vocabulary against an
/// in-memory map, completing through the engine loop like a real one.
pub struct InMemoryDispatcher {
    engine: Rc<dyn Engine>,
    store: SharedStore,
}

/// Factory building [`InMemoryDispatcher`]s over one shared store.
pub fn in_memory_factory(store: SharedStore) -> DispatcherFactory {
    Rc::new(move |setup: DispatcherSetup| {
        Rc::new(InMemoryDispatcher {
            engine: setup.engine,
            store: Rc::clone(&store),
        }) as Rc<dyn AsyncCommandDispatcher>
    })
}

impl AsyncCommandDispatcher for InMemoryDispatcher {
    fn wait_connected(&self, callback: ConnectedCallback) {
        self.engine.post_callback(callback);
    }

    fn register_disconnect_cb(&self, _callback: DisconnectCallback) {}

    fn dispatch(&self, _ns: &str, contents: CommandContents, mut callback: CommandCallback) {
        let store = Rc::clone(&self.store);
        self.engine.post_callback(Box::new(move || {
            callback(execute(&store, &contents));
        }));
    }
}

fn execute(store: &SharedStore, contents: &CommandContents) -> Result<Reply, DispatcherError> {
    let name = contents.command_name().ok_or(DispatcherError::ProtocolError)?;
    // The …PUB variants carry a trailing channel + message pair.
    let has_publish_suffix = name.ends_with("PUB");
    let args = contents.parts();
    let payload_end = if has_publish_suffix {
        args.len().saturating_sub(2)
    } else {
        args.len()
    };
    let payload = &args[1..payload_end];
    let mut store = store.borrow_mut();

    match name.trim_end_matches("PUB") {
        "MSET" => {
            for pair in payload.chunks(2) {
                let [key, value] = pair else {
                    return Err(DispatcherError::ProtocolError);
                };
                store.insert(utf8(key)?, value.clone());
            }
            Ok(Reply::Status("OK".to_string()))
        }
        "MGET" => Ok(Reply::Array(
            payload
                .iter()
                .map(|key| match utf8(key).ok().and_then(|key| store.get(&key)) {
                    Some(value) => Reply::Data(value.clone()),
                    None => Reply::Nil,
                })
                .collect(),
        )),
        "SETNX" => {
            let [key, value] = payload else {
                return Err(DispatcherError::ProtocolError);
            };
            let key = utf8(key)?;
            if store.contains_key(&key) {
                Ok(Reply::Integer(0))
            } else {
                store.insert(key, value.clone());
                Ok(Reply::Integer(1))
            }
        }
        "SETIE" => {
            let [key, new_value, old_value] = payload else {
                return Err(DispatcherError::ProtocolError);
            };
            let key = utf8(key)?;
            if store.get(&key) == Some(old_value) {
                store.insert(key, new_value.clone());
                Ok(Reply::Status("OK".to_string()))
            } else {
                Ok(Reply::Nil)
            }
        }
        "DEL" => {
            let mut removed = 0;
            for key in payload {
                if store.remove(&utf8(key)?).is_some() {
                    removed += 1;
                }
            }
            Ok(Reply::Integer(removed))
        }
        "DELIE" => {
            let [key, value] = payload else {
                return Err(DispatcherError::ProtocolError);
            };
            let key = utf8(key)?;
            if store.get(&key) == Some(value) {
                store.remove(&key);
                Ok(Reply::Integer(1))
            } else {
                Ok(Reply::Integer(0))
            }
        }
        "KEYS" => {
            let [pattern] = payload else {
                return Err(DispatcherError::ProtocolError);
            };
            let pattern = utf8(pattern)?;
            let mut matches: Vec<Reply> = store
                .keys()
                .filter(|key| glob_match(&pattern, key))
                .map(|key| Reply::Data(key.as_bytes().to_vec()))
                .collect();
            matches.sort_by(|a, b| a.as_data().cmp(&b.as_data()));
            Ok(Reply::Array(matches))
        }
        _ => Err(DispatcherError::ProtocolError),
    }
}

fn utf8(bytes: &[u8]) -> Result<String, DispatcherError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| DispatcherError::ProtocolError)
}

/// Minimal glob: `*`, `?`, and backslash escapes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    match_bytes(pattern.as_bytes(), text.as_bytes())
}

fn match_bytes(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => {
            (0..=text.len()).any(|skip| match_bytes(rest, &text[skip..]))
        }
        Some((b'?', rest)) => match text.split_first() {
            Some((_, text_rest)) => match_bytes(rest, text_rest),
            None => false,
        },
        Some((b'\\', rest)) => match (rest.split_first(), text.split_first()) {
            (Some((escaped, pattern_rest)), Some((ch, text_rest))) => {
                escaped == ch && match_bytes(pattern_rest, text_rest)
            }
            _ => false,
        },
        Some((ch, rest)) => match text.split_first() {
            Some((text_ch, text_rest)) => ch == text_ch && match_bytes(rest, text_rest),
            None => false,
        },
    }
}
