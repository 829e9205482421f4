// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the spec suite.

pub use std::rc::Rc;
pub use std::time::Duration;

pub use sdl_config::{DatabaseConfiguration, DbType, NamespaceConfigurations};
pub use sdl_core::hostport::HostAndPort;
pub use sdl_core::test_support::FakeSystem;
pub use sdl_core::{DataMap, Error, Keys};
pub use sdl_engine::{Engine, EventLoop};
pub use sdl_storage::test_support::{in_memory_factory, shared_store, SharedStore};
pub use sdl_storage::{AsyncStorage, StorageRouter, SyncStorage};

use sdl_core::system::RealSystem;

/// Blocking facade over a default standalone stack backed by the
/// in-memory dispatcher; the store handle lets specs peek underneath.
pub fn sync_stack() -> (SyncStorage, SharedStore) {
    sync_stack_with(NamespaceConfigurations::new())
}

pub fn sync_stack_with(
    namespace_configurations: NamespaceConfigurations,
) -> (SyncStorage, SharedStore) {
    let store = shared_store();
    let engine = EventLoop::new(Rc::new(RealSystem));
    let router = StorageRouter::with_configuration(
        engine as Rc<dyn Engine>,
        DatabaseConfiguration::new(
            DbType::Standalone,
            vec![HostAndPort::new("db.local", 6379)],
        ),
        namespace_configurations,
        Some("spec-publisher".to_string()),
        in_memory_factory(Rc::clone(&store)),
    );
    (SyncStorage::new(router as Rc<dyn AsyncStorage>), store)
}

pub fn map(entries: &[(&str, &[u8])]) -> DataMap {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_vec()))
        .collect()
}

pub fn keys(names: &[&str]) -> Keys {
    names.iter().map(|name| name.to_string()).collect()
}
