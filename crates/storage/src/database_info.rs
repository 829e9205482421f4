// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery output: a snapshot of live backend endpoints.

use sdl_core::hostport::HostAndPort;
use sdl_core::Namespace;

/// Redundancy shape of the discovered database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Single,
    Redundant,
    Cluster,
}

/// How the endpoints were discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMethod {
    Direct,
    Sentinel,
}

/// Snapshot published by a discovery to its subscriber.
#[derive(Debug, Clone, Eq)]
pub struct DatabaseInfo {
    pub database_type: DatabaseType,
    pub discovery: DiscoveryMethod,
    pub hosts: Vec<HostAndPort>,
    pub ns: Option<Namespace>,
}

/// Equality ignores host ordering (and the discovery method, which is a
/// property of the observer rather than of the topology).
impl PartialEq for DatabaseInfo {
    fn eq(&self, other: &Self) -> bool {
        let mut mine = self.hosts.clone();
        let mut theirs = other.hosts.clone();
        mine.sort();
        theirs.sort();
        mine == theirs && self.database_type == other.database_type && self.ns == other.ns
    }
}

#[cfg(test)]
#[path = "database_info_tests.rs"]
mod tests;
