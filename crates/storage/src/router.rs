// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace router: the production [`AsyncStorage`].
//!
//! Chooses the handler for each namespace (backend or no-op per the
//! feature table) and, for sdl-managed cluster topologies, shards
//! namespaces over one backend handler per configured host.

use std::cell::RefCell;
use std::os::fd::BorrowedFd;
use std::rc::Rc;

use sdl_config::{
    ConfigurationError, ConfigurationReader, DatabaseConfiguration, NamespaceConfigurations,
};
use sdl_core::system::System;
use sdl_core::{Data, DataMap, Keys, Namespace, PublisherId};
use sdl_engine::Engine;
use tracing::{debug, info};

use crate::api::{AsyncStorage, FindKeysAck, GetAck, ModifyAck, ModifyIfAck, ReadyAck};
use crate::backend::BackendStorage;
use crate::discovery::create_discovery;
use crate::dispatcher::DispatcherFactory;
use crate::dummy::DummyStorage;

/// Shard selection: IEEE CRC-32 of the namespace, modulo the shard
/// count. Stable across runs and implementations.
pub fn shard_index(ns: &str, shard_count: usize) -> usize {
    (crc32fast::hash(ns.as_bytes()) as usize) % shard_count.max(1)
}

pub struct StorageRouter {
    engine: Rc<dyn Engine>,
    database_configuration: DatabaseConfiguration,
    namespace_configurations: Rc<NamespaceConfigurations>,
    publisher_id: Option<PublisherId>,
    dispatcher_factory: DispatcherFactory,
    shards: RefCell<Vec<Rc<BackendStorage>>>,
    dummy: Rc<DummyStorage>,
}

impl StorageRouter {
    /// Resolve configuration from the environment and default
    /// directories, then build the router. Configuration failures are
    /// fatal for the whole client instance.
    pub fn new(
        engine: Rc<dyn Engine>,
        system: &dyn System,
        dispatcher_factory: DispatcherFactory,
        publisher_id: Option<PublisherId>,
    ) -> Result<Rc<Self>, ConfigurationError> {
        let reader = ConfigurationReader::new(system)?;
        let database_configuration = reader.read_database_configuration()?;
        let namespace_configurations = reader.read_namespace_configurations()?;
        Ok(Self::with_configuration(
            engine,
            database_configuration,
            namespace_configurations,
            publisher_id,
            dispatcher_factory,
        ))
    }

    /// Build from prebuilt configuration containers.
    pub fn with_configuration(
        engine: Rc<dyn Engine>,
        database_configuration: DatabaseConfiguration,
        namespace_configurations: NamespaceConfigurations,
        publisher_id: Option<PublisherId>,
        dispatcher_factory: DispatcherFactory,
    ) -> Rc<Self> {
        info!(
            "storage router for {} with {} configured server(s)",
            database_configuration.db_type(),
            database_configuration.server_addresses().len()
        );
        Rc::new(Self {
            dummy: Rc::new(DummyStorage::new(Rc::clone(&engine))),
            engine,
            database_configuration,
            namespace_configurations: Rc::new(namespace_configurations),
            publisher_id,
            dispatcher_factory,
            shards: RefCell::new(Vec::new()),
        })
    }

    fn handler(&self, ns: &str) -> Rc<dyn AsyncStorage> {
        if self.namespace_configurations.is_db_backend_enabled(ns) {
            self.backend_handler(ns)
        } else {
            debug!(
                "backend disabled for namespace ({})",
                self.namespace_configurations.description(ns)
            );
            Rc::clone(&self.dummy) as Rc<dyn AsyncStorage>
        }
    }

    fn backend_handler(&self, ns: &str) -> Rc<dyn AsyncStorage> {
        self.build_shards_once(ns);
        let shards = self.shards.borrow();
        let index = if self.database_configuration.db_type().is_sharded() {
            shard_index(ns, shards.len())
        } else {
            0
        };
        Rc::clone(&shards[index]) as Rc<dyn AsyncStorage>
    }

    /// Shard handlers are built on first backend use; each owns an
    /// independent discovery and dispatcher.
    fn build_shards_once(&self, ns: &str) {
        if !self.shards.borrow().is_empty() {
            return;
        }
        let count = self.database_configuration.shard_count();
        let sharded = self.database_configuration.db_type().is_sharded();
        let mut shards = Vec::with_capacity(count);
        for index in 0..count {
            let address_index = sharded.then_some(index);
            let discovery = create_discovery(
                Rc::clone(&self.engine),
                Some(Namespace::from(ns)),
                &self.database_configuration,
                address_index,
                &self.dispatcher_factory,
            );
            shards.push(BackendStorage::new(
                Rc::clone(&self.engine),
                discovery,
                self.publisher_id.clone(),
                Rc::clone(&self.namespace_configurations),
                self.dispatcher_factory.clone(),
            ));
        }
        *self.shards.borrow_mut() = shards;
    }
}

impl AsyncStorage for StorageRouter {
    fn fd(&self) -> BorrowedFd<'_> {
        self.engine.fd()
    }

    fn handle_events(&self) {
        self.engine.handle_events();
    }

    fn wait_ready(&self, ns: &str, ack: ReadyAck) {
        self.handler(ns).wait_ready(ns, ack);
    }

    fn set(&self, ns: &str, data_map: DataMap, ack: ModifyAck) {
        self.handler(ns).set(ns, data_map, ack);
    }

    fn set_if(&self, ns: &str, key: &str, old_data: Data, new_data: Data, ack: ModifyIfAck) {
        self.handler(ns).set_if(ns, key, old_data, new_data, ack);
    }

    fn set_if_not_exists(&self, ns: &str, key: &str, data: Data, ack: ModifyIfAck) {
        self.handler(ns).set_if_not_exists(ns, key, data, ack);
    }

    fn get(&self, ns: &str, keys: Keys, ack: GetAck) {
        self.handler(ns).get(ns, keys, ack);
    }

    fn remove(&self, ns: &str, keys: Keys, ack: ModifyAck) {
        self.handler(ns).remove(ns, keys, ack);
    }

    fn remove_if(&self, ns: &str, key: &str, data: Data, ack: ModifyIfAck) {
        self.handler(ns).remove_if(ns, key, data, ack);
    }

    fn find_keys(&self, ns: &str, key_prefix: &str, ack: FindKeysAck) {
        self.handler(ns).find_keys(ns, key_prefix, ack);
    }

    fn list_keys(&self, ns: &str, pattern: &str, ack: FindKeysAck) {
        self.handler(ns).list_keys(ns, pattern, ack);
    }

    fn remove_all(&self, ns: &str, ack: ModifyAck) {
        self.handler(ns).remove_all(ns, ack);
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
