// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace matching and shard routing specs.

use crate::prelude::*;
use sdl_config::NamespaceConfiguration;
use sdl_storage::router::shard_index;

fn entry(prefix: &str, notifications: bool) -> NamespaceConfiguration {
    NamespaceConfiguration {
        namespace_prefix: prefix.to_string(),
        use_db_backend: true,
        enable_notifications: notifications,
        source_name: "spec.json".to_string(),
    }
}

#[test]
fn longest_prefix_selects_the_namespace_entry() {
    let mut table = NamespaceConfigurations::new();
    table.add(entry("some", false));
    table.add(entry("someKnownPrefix", true));
    table.add(entry("someKnownPrefixs", false));

    assert!(table.are_notifications_enabled("someKnownPrefixValue123"));
    assert!(table
        .description("someKnownPrefixValue123")
        .contains("prefix: someKnownPrefix,"));
}

#[test]
fn shard_selection_follows_crc32_modulo_shard_count() {
    assert_eq!(crc32fast::hash(b"throughput_ue"), 0xEE76_F3A4);
    assert_eq!(shard_index("throughput_ue", 3), 2);
}

#[test]
fn disabled_namespaces_accept_writes_that_never_reach_the_store() {
    let mut table = NamespaceConfigurations::new();
    table.add(NamespaceConfiguration {
        namespace_prefix: "volatile".to_string(),
        use_db_backend: false,
        enable_notifications: false,
        source_name: "spec.json".to_string(),
    });
    let (storage, store) = sync_stack_with(table);

    storage.set("volatileCounters", map(&[("k", &[1])])).unwrap();

    assert!(store.borrow().is_empty());
    assert!(storage.get("volatileCounters", keys(&["k"])).unwrap().is_empty());
}

#[test]
fn backend_keys_carry_the_hash_slot_tag() {
    let (storage, store) = sync_stack();
    storage.set("ueData", map(&[("k", &[1])])).unwrap();

    assert!(store.borrow().contains_key("{ueData},k"));
}
