// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sdl-config: configuration resolution for the SDL client runtime.
//!
//! Merges environment variables, on-disk JSON files, and defaults into an
//! immutable database topology description plus a namespace feature
//! table. Environment configuration is authoritative for the database
//! topology whenever `DBAAS_SERVICE_HOST` is set.

pub mod database;
pub mod namespaces;
pub mod reader;

pub use database::{DatabaseConfiguration, DbType};
pub use namespaces::{NamespaceConfiguration, NamespaceConfigurations};
pub use reader::{
    ConfigurationError, ConfigurationErrorKind, ConfigurationReader, DB_CLUSTER_ADDR_LIST_ENV_VAR,
    DB_HOST_ENV_VAR, DB_PORT_ENV_VAR, SENTINEL_MASTER_NAME_ENV_VAR, SENTINEL_PORT_ENV_VAR,
};
