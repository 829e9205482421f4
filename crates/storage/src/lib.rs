// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sdl-storage: namespaced key/value storage over a discovered backend.
//!
//! The [`AsyncStorage`] trait is the top-level asynchronous API. Its
//! production implementation, [`StorageRouter`], matches each namespace
//! against the configured feature table, shards namespaces over backend
//! handlers for sdl-managed cluster topologies, and falls back to a no-op
//! handler where the backend is disabled. [`SyncStorage`] wraps any
//! [`AsyncStorage`] into a blocking API with per-operation timeouts.
//!
//! Commands are executed by an [`AsyncCommandDispatcher`] supplied by the
//! embedder through a [`DispatcherFactory`]; this crate contains no wire
//! protocol code.

pub mod api;
pub mod backend;
pub mod database_info;
pub mod direct;
pub mod discovery;
pub mod dispatcher;
pub mod dummy;
pub mod router;
pub mod sentinel;
pub mod sync;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use api::{AsyncStorage, FindKeysAck, GetAck, ModifyAck, ModifyIfAck, ReadyAck};
pub use backend::BackendStorage;
pub use database_info::{DatabaseInfo, DatabaseType, DiscoveryMethod};
pub use direct::DirectDiscovery;
pub use discovery::{create_discovery, DatabaseDiscovery, StateChangedCb};
pub use dispatcher::{
    to_storage_error, AsyncCommandDispatcher, CommandCallback, CommandContents,
    ConnectedCallback, DisconnectCallback, DispatcherError, DispatcherFactory, DispatcherSetup,
    Reply,
};
pub use dummy::DummyStorage;
pub use router::StorageRouter;
pub use sentinel::SentinelDiscovery;
pub use sync::SyncStorage;
