// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery interface and topology-driven construction.

use std::rc::Rc;

use sdl_config::{DatabaseConfiguration, DbType};
use sdl_core::{sdl_abort, Namespace};
use sdl_engine::Engine;

use crate::database_info::{DatabaseInfo, DatabaseType};
use crate::direct::DirectDiscovery;
use crate::dispatcher::DispatcherFactory;
use crate::sentinel::SentinelDiscovery;

/// Subscriber callback, invoked with each newly published
/// [`DatabaseInfo`]. Consecutive identical snapshots are suppressed.
pub type StateChangedCb = Box<dyn FnMut(DatabaseInfo)>;

/// Maintains current knowledge of live backend endpoints.
pub trait DatabaseDiscovery {
    /// Install the subscriber callback. If a snapshot is already known
    /// it is delivered through the engine loop, never inline.
    fn set_state_changed_cb(&self, callback: StateChangedCb);

    fn clear_state_changed_cb(&self);
}

/// Build the discovery variant matching the configured topology.
///
/// `address_index` narrows the static address list to a single shard for
/// the sdl-managed cluster topologies.
pub fn create_discovery(
    engine: Rc<dyn Engine>,
    ns: Option<Namespace>,
    configuration: &DatabaseConfiguration,
    address_index: Option<usize>,
    dispatcher_factory: &DispatcherFactory,
) -> Rc<dyn DatabaseDiscovery> {
    let mut addresses = configuration.addresses_for_shard(address_index);
    if addresses.is_empty() {
        addresses = DatabaseConfiguration::default_server_addresses();
    }

    let db_type = configuration.db_type();
    if db_type.uses_sentinel() {
        let Some(sentinel_address) = configuration.sentinel_address(address_index) else {
            sdl_abort!("sentinel address not configured");
        };
        let master_name = configuration.sentinel_master_name(address_index);
        return SentinelDiscovery::new(
            engine,
            ns,
            sentinel_address,
            master_name,
            dispatcher_factory.clone(),
        );
    }

    let database_type = match db_type {
        DbType::Cluster => DatabaseType::Cluster,
        _ => DatabaseType::Single,
    };
    Rc::new(DirectDiscovery::new(engine, ns, database_type, addresses))
}
