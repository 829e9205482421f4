// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable database topology description.

use std::fmt;

use sdl_core::hostport::{HostAndPort, DEFAULT_PORT, DEFAULT_SENTINEL_PORT};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_SENTINEL_MASTER_GROUP_NAME: &str = "dbaasmaster";

/// Deployment topology of the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbType {
    #[default]
    Unknown,
    Standalone,
    Cluster,
    Sentinel,
    StandaloneCluster,
    SentinelCluster,
}

impl DbType {
    /// Parse the JSON `database.type` string.
    pub fn parse(value: &str) -> Option<DbType> {
        match value {
            "redis-standalone" => Some(DbType::Standalone),
            "redis-cluster" => Some(DbType::Cluster),
            "redis-sentinel" => Some(DbType::Sentinel),
            "sdl-standalone-cluster" => Some(DbType::StandaloneCluster),
            "sdl-sentinel-cluster" => Some(DbType::SentinelCluster),
            _ => None,
        }
    }

    /// Topologies where SDL itself shards namespaces over the configured
    /// hosts.
    pub fn is_sharded(self) -> bool {
        matches!(self, DbType::StandaloneCluster | DbType::SentinelCluster)
    }

    /// Topologies tracked through sentinel leader discovery.
    pub fn uses_sentinel(self) -> bool {
        matches!(self, DbType::Sentinel | DbType::SentinelCluster)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DbType::Unknown => "unknown",
            DbType::Standalone => "redis-standalone",
            DbType::Cluster => "redis-cluster",
            DbType::Sentinel => "redis-sentinel",
            DbType::StandaloneCluster => "sdl-standalone-cluster",
            DbType::SentinelCluster => "sdl-sentinel-cluster",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database topology as resolved at startup. Built once by the
/// configuration reader, then immutable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatabaseConfiguration {
    db_type: DbType,
    server_addresses: Vec<HostAndPort>,
    sentinel_ports: Vec<u16>,
    sentinel_master_names: Vec<String>,
}

impl DatabaseConfiguration {
    pub fn new(db_type: DbType, server_addresses: Vec<HostAndPort>) -> Self {
        Self {
            db_type,
            server_addresses,
            sentinel_ports: Vec::new(),
            sentinel_master_names: Vec::new(),
        }
    }

    pub fn with_sentinels(mut self, ports: Vec<u16>, master_names: Vec<String>) -> Self {
        self.sentinel_ports = ports;
        self.sentinel_master_names = master_names;
        self
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    pub fn server_addresses(&self) -> &[HostAndPort] {
        &self.server_addresses
    }

    pub fn is_empty(&self) -> bool {
        self.server_addresses.is_empty()
    }

    /// Fallback when nothing is configured.
    pub fn default_server_addresses() -> Vec<HostAndPort> {
        vec![HostAndPort::new(DEFAULT_HOST, DEFAULT_PORT)]
    }

    /// Static addresses for one shard, or all of them.
    pub fn addresses_for_shard(&self, address_index: Option<usize>) -> Vec<HostAndPort> {
        match address_index {
            Some(index) => self
                .server_addresses
                .get(index)
                .cloned()
                .into_iter()
                .collect(),
            None => self.server_addresses.clone(),
        }
    }

    /// Number of independent backend handlers the router needs.
    pub fn shard_count(&self) -> usize {
        if self.db_type.is_sharded() {
            self.server_addresses.len().max(1)
        } else {
            1
        }
    }

    /// Sentinel endpoint for the given shard: the shard's host paired
    /// with the shard's sentinel port (26379 when not configured).
    pub fn sentinel_address(&self, address_index: Option<usize>) -> Option<HostAndPort> {
        let index = address_index.unwrap_or(0);
        let address = self.server_addresses.get(index)?;
        let port = self
            .sentinel_ports
            .get(index)
            .copied()
            .unwrap_or(DEFAULT_SENTINEL_PORT);
        Some(address.with_port(port))
    }

    /// Sentinel master group name for the given shard.
    pub fn sentinel_master_name(&self, address_index: Option<usize>) -> String {
        let index = address_index.unwrap_or(0);
        self.sentinel_master_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SENTINEL_MASTER_GROUP_NAME.to_string())
    }
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod tests;
