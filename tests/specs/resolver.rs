// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration resolution specs.

use crate::prelude::*;
use sdl_config::ConfigurationReader;

#[test]
fn standalone_environment_yields_one_default_port_address() {
    let system = FakeSystem::new();
    system.set_env("DBAAS_SERVICE_HOST", "server.local");

    let reader = ConfigurationReader::from_env(&system);
    let configuration = reader.read_database_configuration().unwrap();

    assert_eq!(configuration.db_type(), DbType::Standalone);
    assert_eq!(
        configuration.server_addresses(),
        &[HostAndPort::new("server.local", 6379)]
    );
}

#[test]
fn sentinel_cluster_environment_yields_three_sentinels_and_masters() {
    let system = FakeSystem::new();
    system.set_env("DBAAS_SERVICE_HOST", "a-0");
    system.set_env("DBAAS_SERVICE_SENTINEL_PORT", "2222,2223,2224");
    system.set_env("DBAAS_MASTER_NAME", "m-0,m-1,m-2");
    system.set_env("DBAAS_CLUSTER_ADDR_LIST", "a-0,a-1,a-2");

    let reader = ConfigurationReader::from_env(&system);
    let configuration = reader.read_database_configuration().unwrap();

    assert_eq!(configuration.db_type(), DbType::SentinelCluster);
    assert_eq!(
        [
            configuration.sentinel_address(Some(0)).unwrap(),
            configuration.sentinel_address(Some(1)).unwrap(),
            configuration.sentinel_address(Some(2)).unwrap(),
        ],
        [
            HostAndPort::new("a-0", 2222),
            HostAndPort::new("a-1", 2223),
            HostAndPort::new("a-2", 2224),
        ]
    );
    assert_eq!(
        (0..3).map(|i| configuration.sentinel_master_name(Some(i))).collect::<Vec<_>>(),
        vec!["m-0", "m-1", "m-2"]
    );
}

#[test]
fn configuration_files_feed_the_full_stack() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("sdl.json"),
        r#"{
            "database": {
                "type": "redis-standalone",
                "servers": [ { "address": "db.local:6379" } ]
            },
            "sharedDataLayer": [
                { "namespacePrefix": "volatile",
                  "useDbBackend": false,
                  "enableNotifications": false }
            ]
        }"#,
    )
    .unwrap();

    let system = FakeSystem::new();
    let reader =
        ConfigurationReader::from_directories(&system, &[dir.path().to_path_buf()]).unwrap();
    let configuration = reader.read_database_configuration().unwrap();
    let namespaces = reader.read_namespace_configurations().unwrap();

    assert_eq!(configuration.db_type(), DbType::Standalone);
    assert!(!namespaces.is_db_backend_enabled("volatileCounters"));
    assert!(namespaces.is_db_backend_enabled("durableState"));
}

#[test]
fn no_configuration_at_all_still_yields_a_working_default() {
    let system = FakeSystem::new();
    let reader = ConfigurationReader::from_env(&system);
    let configuration = reader.read_database_configuration().unwrap();

    assert_eq!(configuration.db_type(), DbType::Standalone);
    assert_eq!(
        configuration.server_addresses(),
        &[HostAndPort::new("localhost", 6379)]
    );
}
