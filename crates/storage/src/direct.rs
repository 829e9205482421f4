// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct discovery over a static address list.

use std::cell::RefCell;
use std::rc::Rc;

use sdl_core::hostport::HostAndPort;
use sdl_core::Namespace;
use sdl_engine::Engine;
use tracing::debug;

use crate::database_info::{DatabaseInfo, DatabaseType, DiscoveryMethod};
use crate::discovery::{DatabaseDiscovery, StateChangedCb};

/// Trivial discovery: the configured addresses are the topology.
///
/// Publishes one snapshot per installed callback and never again;
/// topology changes are not tracked, so re-publication cannot occur.
pub struct DirectDiscovery {
    engine: Rc<dyn Engine>,
    info: DatabaseInfo,
    state_cb: Rc<RefCell<Option<StateChangedCb>>>,
}

impl DirectDiscovery {
    pub fn new(
        engine: Rc<dyn Engine>,
        ns: Option<Namespace>,
        database_type: DatabaseType,
        hosts: Vec<HostAndPort>,
    ) -> Self {
        Self {
            engine,
            info: DatabaseInfo {
                database_type,
                discovery: DiscoveryMethod::Direct,
                hosts,
                ns,
            },
            state_cb: Rc::new(RefCell::new(None)),
        }
    }
}

impl DatabaseDiscovery for DirectDiscovery {
    fn set_state_changed_cb(&self, callback: StateChangedCb) {
        *self.state_cb.borrow_mut() = Some(callback);

        debug!("publishing static database info: {:?}", self.info);
        let slot = Rc::downgrade(&self.state_cb);
        let info = self.info.clone();
        self.engine.post_callback(Box::new(move || {
            if let Some(slot) = slot.upgrade() {
                if let Some(callback) = slot.borrow_mut().as_mut() {
                    callback(info);
                }
            }
        }));
    }

    fn clear_state_changed_cb(&self) {
        *self.state_cb.borrow_mut() = None;
    }
}

#[cfg(test)]
#[path = "direct_tests.rs"]
mod tests;
