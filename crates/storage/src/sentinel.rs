// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sentinel-based master discovery.
//!
//! Two dispatchers against the sentinel endpoint: a subscriber holding a
//! `SUBSCRIBE +switch-master` channel open, and a requester issuing
//! `SENTINEL get-master-addr-by-name`. The machine walks
//! SUBSCRIBING → SUBSCRIBED_INQUIRING → READY, re-inquiring on every
//! master switch notification and retrying each step on a fixed backoff.
//! It runs for the life of the discovery object; there is no terminal
//! state.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use sdl_core::hostport::HostAndPort;
use sdl_core::Namespace;
use sdl_engine::{Engine, Timer};
use tracing::{debug, info, warn};

use crate::database_info::{DatabaseInfo, DatabaseType, DiscoveryMethod};
use crate::discovery::{DatabaseDiscovery, StateChangedCb};
use crate::dispatcher::{
    AsyncCommandDispatcher, CommandContents, DispatcherError, DispatcherFactory, DispatcherSetup,
    Reply,
};

const SWITCH_MASTER_CHANNEL: &str = "+switch-master";
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Subscribing,
    SubscribedInquiring,
    Ready,
}

pub struct SentinelDiscovery {
    inner: Rc<Inner>,
}

struct Inner {
    engine: Rc<dyn Engine>,
    ns: Option<Namespace>,
    master_name: String,
    subscriber: Rc<dyn AsyncCommandDispatcher>,
    requester: Rc<dyn AsyncCommandDispatcher>,
    state: Cell<State>,
    state_cb: RefCell<Option<StateChangedCb>>,
    published: RefCell<Option<DatabaseInfo>>,
    subscribe_retry_timer: Timer,
    inquiry_retry_timer: Timer,
    retry_interval: Duration,
}

impl SentinelDiscovery {
    pub fn new(
        engine: Rc<dyn Engine>,
        ns: Option<Namespace>,
        sentinel_address: HostAndPort,
        master_name: String,
        dispatcher_factory: DispatcherFactory,
    ) -> Rc<Self> {
        Self::with_retry_interval(
            engine,
            ns,
            sentinel_address,
            master_name,
            dispatcher_factory,
            DEFAULT_RETRY_INTERVAL,
        )
    }

    pub fn with_retry_interval(
        engine: Rc<dyn Engine>,
        ns: Option<Namespace>,
        sentinel_address: HostAndPort,
        master_name: String,
        dispatcher_factory: DispatcherFactory,
        retry_interval: Duration,
    ) -> Rc<Self> {
        let sentinel_info = DatabaseInfo {
            database_type: DatabaseType::Single,
            discovery: DiscoveryMethod::Sentinel,
            hosts: vec![sentinel_address],
            ns: ns.clone(),
        };
        let subscriber = dispatcher_factory(DispatcherSetup {
            engine: Rc::clone(&engine),
            database_info: sentinel_info.clone(),
            permanent_command_callbacks: true,
        });
        let requester = dispatcher_factory(DispatcherSetup {
            engine: Rc::clone(&engine),
            database_info: sentinel_info,
            permanent_command_callbacks: false,
        });

        let inner = Rc::new(Inner {
            subscribe_retry_timer: Timer::new(Rc::clone(&engine)),
            inquiry_retry_timer: Timer::new(Rc::clone(&engine)),
            engine,
            ns,
            master_name,
            subscriber,
            requester,
            state: Cell::new(State::Init),
            state_cb: RefCell::new(None),
            published: RefCell::new(None),
            retry_interval,
        });

        let weak = Rc::downgrade(&inner);
        inner.subscriber.register_disconnect_cb(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                warn!("sentinel subscriber disconnected, re-subscribing");
                subscribe(&inner);
            }
        }));

        subscribe(&inner);
        Rc::new(Self { inner })
    }
}

impl DatabaseDiscovery for SentinelDiscovery {
    fn set_state_changed_cb(&self, callback: StateChangedCb) {
        *self.inner.state_cb.borrow_mut() = Some(callback);

        // A subscriber installed after discovery completed still gets the
        // current snapshot, delivered through the loop rather than inline.
        if self.inner.published.borrow().is_some() {
            let weak = Rc::downgrade(&self.inner);
            self.inner.engine.post_callback(Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let current = inner.published.borrow().clone();
                if let Some(info) = current {
                    if let Some(callback) = inner.state_cb.borrow_mut().as_mut() {
                        callback(info);
                    }
                }
            }));
        }
    }

    fn clear_state_changed_cb(&self) {
        *self.inner.state_cb.borrow_mut() = None;
    }
}

fn subscribe(inner: &Rc<Inner>) {
    inner.state.set(State::Subscribing);
    let weak = Rc::downgrade(inner);
    let contents = CommandContents::command("SUBSCRIBE").arg(SWITCH_MASTER_CHANNEL);
    inner.subscriber.dispatch(
        inner.ns.as_deref().unwrap_or(""),
        contents,
        Box::new(move |result| {
            if let Some(inner) = weak.upgrade() {
                on_subscribe_reply(&inner, result);
            }
        }),
    );
}

fn on_subscribe_reply(inner: &Rc<Inner>, result: Result<Reply, DispatcherError>) {
    match result {
        Ok(reply) if is_notification(&reply) => {
            debug!("{SWITCH_MASTER_CHANNEL} notification received");
            // Re-inquire without touching the standing subscription. An
            // inquiry already in flight will observe the new master on
            // its own.
            if inner.state.get() == State::Ready {
                inner.state.set(State::SubscribedInquiring);
                send_master_inquiry(inner);
            }
        }
        Ok(_) => {
            if inner.state.get() == State::Subscribing {
                debug!("subscribed to {SWITCH_MASTER_CHANNEL}");
                inner.state.set(State::SubscribedInquiring);
                send_master_inquiry(inner);
            }
        }
        Err(error) => {
            warn!("sentinel subscribe failed: {error}, retrying");
            let weak = Rc::downgrade(inner);
            inner.subscribe_retry_timer.arm(
                inner.retry_interval,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        subscribe(&inner);
                    }
                }),
            );
        }
    }
}

fn send_master_inquiry(inner: &Rc<Inner>) {
    let weak = Rc::downgrade(inner);
    let contents = CommandContents::command("SENTINEL")
        .arg("get-master-addr-by-name")
        .arg(inner.master_name.as_str());
    inner.requester.dispatch(
        inner.ns.as_deref().unwrap_or(""),
        contents,
        Box::new(move |result| {
            if let Some(inner) = weak.upgrade() {
                on_master_inquiry_reply(&inner, result);
            }
        }),
    );
}

fn on_master_inquiry_reply(inner: &Rc<Inner>, result: Result<Reply, DispatcherError>) {
    match parse_master_address(result) {
        Ok(address) => {
            inner.state.set(State::Ready);
            publish(
                inner,
                DatabaseInfo {
                    database_type: DatabaseType::Redundant,
                    discovery: DiscoveryMethod::Sentinel,
                    hosts: vec![address],
                    ns: inner.ns.clone(),
                },
            );
        }
        Err(reason) => {
            warn!("sentinel master inquiry failed: {reason}, retrying");
            let weak = Rc::downgrade(inner);
            inner.inquiry_retry_timer.arm(
                inner.retry_interval,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        send_master_inquiry(&inner);
                    }
                }),
            );
        }
    }
}

fn publish(inner: &Inner, info: DatabaseInfo) {
    if inner.published.borrow().as_ref() == Some(&info) {
        debug!("database info unchanged, suppressing publication");
        return;
    }
    info!("sentinel discovery publishing master {:?}", info.hosts);
    *inner.published.borrow_mut() = Some(info.clone());
    if let Some(callback) = inner.state_cb.borrow_mut().as_mut() {
        callback(info);
    }
}

fn is_notification(reply: &Reply) -> bool {
    match reply {
        Reply::Array(items) => items
            .first()
            .and_then(Reply::as_data)
            .is_some_and(|kind| kind == b"message"),
        _ => false,
    }
}

fn parse_master_address(result: Result<Reply, DispatcherError>) -> Result<HostAndPort, String> {
    let reply = result.map_err(|error| error.to_string())?;
    let Reply::Array(items) = reply else {
        return Err("unexpected master inquiry reply".to_string());
    };
    let (Some(host), Some(port)) = (
        items.first().and_then(Reply::as_data),
        items.get(1).and_then(Reply::as_data),
    ) else {
        return Err("master inquiry reply is missing host or port".to_string());
    };
    let host = std::str::from_utf8(host)
        .map_err(|_| "master host is not valid UTF-8".to_string())?;
    let port: u16 = std::str::from_utf8(port)
        .ok()
        .and_then(|port| port.parse().ok())
        .ok_or_else(|| "master port is not a number".to_string())?;
    Ok(HostAndPort::new(host, port))
}

#[cfg(test)]
#[path = "sentinel_tests.rs"]
mod tests;
