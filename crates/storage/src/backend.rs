// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend handler for one shard.
//!
//! Waits for its discovery to publish an endpoint, builds its dispatcher
//! through the factory, and from then on translates storage operations
//! into backend commands. Keys are wrapped as `"{<ns>},<key>"`; the
//! braces pin every key of a namespace to one cluster hash slot.

use std::cell::RefCell;
use std::os::fd::BorrowedFd;
use std::rc::Rc;

use sdl_config::NamespaceConfigurations;
use sdl_core::{is_valid_namespace, Data, DataMap, Error, Keys, PublisherId};
use sdl_engine::Engine;
use tracing::debug;

use crate::api::{AsyncStorage, FindKeysAck, GetAck, ModifyAck, ModifyIfAck, ReadyAck};
use crate::database_info::DatabaseInfo;
use crate::discovery::DatabaseDiscovery;
use crate::dispatcher::{
    to_storage_error, AsyncCommandDispatcher, CommandContents, DispatcherFactory,
    DispatcherSetup, Reply,
};

const NO_PUBLISHER: &str = "no-publisher";

pub struct BackendStorage {
    inner: Rc<Inner>,
}

struct Inner {
    engine: Rc<dyn Engine>,
    discovery: Rc<dyn DatabaseDiscovery>,
    publisher_id: Option<PublisherId>,
    namespace_configurations: Rc<NamespaceConfigurations>,
    dispatcher_factory: DispatcherFactory,
    dispatcher: RefCell<Option<Rc<dyn AsyncCommandDispatcher>>>,
    ready_acks: RefCell<Vec<ReadyAck>>,
}

impl BackendStorage {
    pub fn new(
        engine: Rc<dyn Engine>,
        discovery: Rc<dyn DatabaseDiscovery>,
        publisher_id: Option<PublisherId>,
        namespace_configurations: Rc<NamespaceConfigurations>,
        dispatcher_factory: DispatcherFactory,
    ) -> Rc<Self> {
        let inner = Rc::new(Inner {
            engine,
            discovery,
            publisher_id,
            namespace_configurations,
            dispatcher_factory,
            dispatcher: RefCell::new(None),
            ready_acks: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&inner);
        inner
            .discovery
            .set_state_changed_cb(Box::new(move |info| {
                if let Some(inner) = weak.upgrade() {
                    on_state_changed(&inner, info);
                }
            }));

        Rc::new(Self { inner })
    }
}

impl Drop for BackendStorage {
    fn drop(&mut self) {
        self.inner.discovery.clear_state_changed_cb();
    }
}

fn on_state_changed(inner: &Rc<Inner>, info: DatabaseInfo) {
    debug!("backend endpoint published: {:?}", info.hosts);
    if inner.dispatcher.borrow().is_none() {
        let dispatcher = (inner.dispatcher_factory)(DispatcherSetup {
            engine: Rc::clone(&inner.engine),
            database_info: info,
            permanent_command_callbacks: false,
        });
        *inner.dispatcher.borrow_mut() = Some(dispatcher);
    }

    if !inner.ready_acks.borrow().is_empty() {
        let dispatcher = inner.dispatcher.borrow().clone();
        if let Some(dispatcher) = dispatcher {
            let weak = Rc::downgrade(inner);
            dispatcher.wait_connected(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    flush_ready_acks(&inner);
                }
            }));
        }
    }
}

fn flush_ready_acks(inner: &Inner) {
    let acks: Vec<ReadyAck> = inner.ready_acks.borrow_mut().drain(..).collect();
    for ack in acks {
        ack(Ok(()));
    }
}

impl Inner {
    /// Client-side gate every command goes through.
    fn operation_gate(&self, ns: &str) -> Result<Rc<dyn AsyncCommandDispatcher>, Error> {
        if !is_valid_namespace(ns) {
            return Err(Error::invalid_namespace(ns));
        }
        self.dispatcher
            .borrow()
            .clone()
            .ok_or_else(|| Error::NotConnected("backend not yet discovered".to_string()))
    }

    fn notifications_enabled(&self, ns: &str) -> bool {
        self.namespace_configurations.are_notifications_enabled(ns)
    }

    fn publish_message(&self) -> String {
        self.publisher_id
            .clone()
            .unwrap_or_else(|| NO_PUBLISHER.to_string())
    }

    /// Immediate completions still arrive through the loop, keeping the
    /// exactly-once, engine-thread callback contract.
    fn post_completion(&self, callback: impl FnOnce() + 'static) {
        self.engine.post_callback(Box::new(callback));
    }
}

pub(crate) fn to_backend_key(ns: &str, key: &str) -> String {
    format!("{{{ns}}},{key}")
}

fn backend_key_prefix(ns: &str) -> String {
    format!("{{{ns}}},")
}

fn strip_backend_prefix(ns: &str, backend_key: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(backend_key).ok()?;
    text.strip_prefix(&backend_key_prefix(ns)).map(str::to_string)
}

/// Pattern matching every key of the namespace whose name starts with
/// `key_prefix`; glob metacharacters in the prefix are escaped so it
/// matches literally.
pub(crate) fn key_prefix_search_pattern(ns: &str, key_prefix: &str) -> String {
    format!("{}{}*", backend_key_prefix(ns), escape_glob(key_prefix))
}

/// Pattern for a caller-supplied glob, scoped to the namespace.
pub(crate) fn namespace_key_search_pattern(ns: &str, pattern: &str) -> String {
    format!("{}{}", backend_key_prefix(ns), pattern)
}

fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '?' | '[' | ']' | '^' | '-') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn condition_held(reply: &Reply) -> bool {
    match reply {
        Reply::Status(_) => true,
        Reply::Integer(count) => *count > 0,
        _ => false,
    }
}

/// Adapt a single-shot ack to the dispatcher's re-invocable callback
/// shape.
fn once<T: 'static>(
    ack: Box<dyn FnOnce(Result<T, Error>)>,
    translate: impl Fn(Reply) -> Result<T, Error> + 'static,
) -> crate::dispatcher::CommandCallback {
    let mut ack = Some(ack);
    Box::new(move |result| {
        if let Some(ack) = ack.take() {
            ack(match result {
                Ok(reply) => translate(reply),
                Err(error) => Err(to_storage_error(error)),
            });
        }
    })
}

impl AsyncStorage for BackendStorage {
    fn fd(&self) -> BorrowedFd<'_> {
        self.inner.engine.fd()
    }

    fn handle_events(&self) {
        self.inner.engine.handle_events();
    }

    fn wait_ready(&self, _ns: &str, ack: ReadyAck) {
        let dispatcher = self.inner.dispatcher.borrow().clone();
        match dispatcher {
            Some(dispatcher) => {
                let mut ack = Some(ack);
                dispatcher.wait_connected(Box::new(move || {
                    if let Some(ack) = ack.take() {
                        ack(Ok(()));
                    }
                }));
            }
            None => self.inner.ready_acks.borrow_mut().push(ack),
        }
    }

    fn set(&self, ns: &str, data_map: DataMap, ack: ModifyAck) {
        let dispatcher = match self.inner.operation_gate(ns) {
            Ok(dispatcher) => dispatcher,
            Err(error) => return self.inner.post_completion(move || ack(Err(error))),
        };
        if data_map.is_empty() {
            return self.inner.post_completion(move || ack(Ok(())));
        }

        let notify = self.inner.notifications_enabled(ns);
        let mut contents = CommandContents::command(if notify { "MSETPUB" } else { "MSET" });
        for (key, value) in data_map {
            contents = contents.arg(to_backend_key(ns, &key)).arg(value);
        }
        if notify {
            contents = contents
                .arg(event_channel(ns))
                .arg(self.inner.publish_message());
        }
        dispatcher.dispatch(ns, contents, once(ack, |_| Ok(())));
    }

    fn set_if(&self, ns: &str, key: &str, old_data: Data, new_data: Data, ack: ModifyIfAck) {
        let dispatcher = match self.inner.operation_gate(ns) {
            Ok(dispatcher) => dispatcher,
            Err(error) => return self.inner.post_completion(move || ack(Err(error))),
        };

        let notify = self.inner.notifications_enabled(ns);
        let mut contents = CommandContents::command(if notify { "SETIEPUB" } else { "SETIE" })
            .arg(to_backend_key(ns, key))
            .arg(new_data)
            .arg(old_data);
        if notify {
            contents = contents
                .arg(event_channel(ns))
                .arg(self.inner.publish_message());
        }
        dispatcher.dispatch(ns, contents, once(ack, |reply| Ok(condition_held(&reply))));
    }

    fn set_if_not_exists(&self, ns: &str, key: &str, data: Data, ack: ModifyIfAck) {
        let dispatcher = match self.inner.operation_gate(ns) {
            Ok(dispatcher) => dispatcher,
            Err(error) => return self.inner.post_completion(move || ack(Err(error))),
        };

        let notify = self.inner.notifications_enabled(ns);
        let mut contents = CommandContents::command(if notify { "SETNXPUB" } else { "SETNX" })
            .arg(to_backend_key(ns, key))
            .arg(data);
        if notify {
            contents = contents
                .arg(event_channel(ns))
                .arg(self.inner.publish_message());
        }
        dispatcher.dispatch(ns, contents, once(ack, |reply| Ok(condition_held(&reply))));
    }

    fn get(&self, ns: &str, keys: Keys, ack: GetAck) {
        let dispatcher = match self.inner.operation_gate(ns) {
            Ok(dispatcher) => dispatcher,
            Err(error) => return self.inner.post_completion(move || ack(Err(error))),
        };
        if keys.is_empty() {
            return self.inner.post_completion(move || ack(Ok(DataMap::new())));
        }

        let ordered: Vec<String> = keys.into_iter().collect();
        let mut contents = CommandContents::command("MGET");
        for key in &ordered {
            contents = contents.arg(to_backend_key(ns, key));
        }
        dispatcher.dispatch(
            ns,
            contents,
            once(ack, move |reply| {
                let Reply::Array(items) = reply else {
                    return Err(Error::RejectedByBackend(
                        "unexpected reply to read command".to_string(),
                    ));
                };
                let mut found = DataMap::new();
                for (key, item) in ordered.iter().zip(items) {
                    if let Reply::Data(value) = item {
                        found.insert(key.clone(), value);
                    }
                }
                Ok(found)
            }),
        );
    }

    fn remove(&self, ns: &str, keys: Keys, ack: ModifyAck) {
        let dispatcher = match self.inner.operation_gate(ns) {
            Ok(dispatcher) => dispatcher,
            Err(error) => return self.inner.post_completion(move || ack(Err(error))),
        };
        if keys.is_empty() {
            return self.inner.post_completion(move || ack(Ok(())));
        }

        let notify = self.inner.notifications_enabled(ns);
        let mut contents = CommandContents::command(if notify { "DELPUB" } else { "DEL" });
        for key in keys {
            contents = contents.arg(to_backend_key(ns, &key));
        }
        if notify {
            contents = contents
                .arg(event_channel(ns))
                .arg(self.inner.publish_message());
        }
        dispatcher.dispatch(ns, contents, once(ack, |_| Ok(())));
    }

    fn remove_if(&self, ns: &str, key: &str, data: Data, ack: ModifyIfAck) {
        let dispatcher = match self.inner.operation_gate(ns) {
            Ok(dispatcher) => dispatcher,
            Err(error) => return self.inner.post_completion(move || ack(Err(error))),
        };

        let notify = self.inner.notifications_enabled(ns);
        let mut contents = CommandContents::command(if notify { "DELIEPUB" } else { "DELIE" })
            .arg(to_backend_key(ns, key))
            .arg(data);
        if notify {
            contents = contents
                .arg(event_channel(ns))
                .arg(self.inner.publish_message());
        }
        dispatcher.dispatch(ns, contents, once(ack, |reply| Ok(condition_held(&reply))));
    }

    fn find_keys(&self, ns: &str, key_prefix: &str, ack: FindKeysAck) {
        self.search_keys(ns, key_prefix_search_pattern(ns, key_prefix), ack);
    }

    fn list_keys(&self, ns: &str, pattern: &str, ack: FindKeysAck) {
        self.search_keys(ns, namespace_key_search_pattern(ns, pattern), ack);
    }

    fn remove_all(&self, ns: &str, ack: ModifyAck) {
        let dispatcher = match self.inner.operation_gate(ns) {
            Ok(dispatcher) => dispatcher,
            Err(error) => return self.inner.post_completion(move || ack(Err(error))),
        };

        let notify = self.inner.notifications_enabled(ns);
        let channel_and_message = notify
            .then(|| (event_channel(ns), self.inner.publish_message()));
        let contents =
            CommandContents::command("KEYS").arg(namespace_key_search_pattern(ns, "*"));
        let ns_owned = ns.to_string();
        let chained = Rc::clone(&dispatcher);
        let mut ack = Some(ack);
        dispatcher.dispatch(
            ns,
            contents,
            Box::new(move |result| {
                let Some(ack) = ack.take() else {
                    return;
                };
                let items = match result {
                    Ok(Reply::Array(items)) => items,
                    Ok(_) => {
                        return ack(Err(Error::RejectedByBackend(
                            "unexpected reply to key search".to_string(),
                        )))
                    }
                    Err(error) => return ack(Err(to_storage_error(error))),
                };
                if items.is_empty() {
                    return ack(Ok(()));
                }
                let mut contents = CommandContents::command(
                    if channel_and_message.is_some() { "DELPUB" } else { "DEL" },
                );
                for item in items {
                    if let Reply::Data(backend_key) = item {
                        contents = contents.arg(backend_key);
                    }
                }
                if let Some((channel, message)) = channel_and_message.clone() {
                    contents = contents.arg(channel).arg(message);
                }
                chained.dispatch(&ns_owned, contents, once(ack, |_| Ok(())));
            }),
        );
    }
}

impl BackendStorage {
    fn search_keys(&self, ns: &str, pattern: String, ack: FindKeysAck) {
        let dispatcher = match self.inner.operation_gate(ns) {
            Ok(dispatcher) => dispatcher,
            Err(error) => return self.inner.post_completion(move || ack(Err(error))),
        };

        let ns_owned = ns.to_string();
        let contents = CommandContents::command("KEYS").arg(pattern);
        dispatcher.dispatch(
            ns,
            contents,
            once(ack, move |reply| {
                let Reply::Array(items) = reply else {
                    return Err(Error::RejectedByBackend(
                        "unexpected reply to key search".to_string(),
                    ));
                };
                let mut keys = Keys::new();
                for item in items {
                    if let Some(stripped) = item
                        .as_data()
                        .and_then(|backend_key| strip_backend_prefix(&ns_owned, backend_key))
                    {
                        keys.insert(stripped);
                    }
                }
                Ok(keys)
            }),
        );
    }
}

fn event_channel(ns: &str) -> String {
    format!("{{{ns}}},sdl-events")
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
