// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking API specs: round-trips, conditional writes, timeouts.

use crate::prelude::*;

#[test]
fn written_data_reads_back_identically() {
    let (storage, _store) = sync_stack();
    storage.set("ueData", map(&[("k", &[0xA, 0xB, 0xC])])).unwrap();

    assert_eq!(
        storage.get("ueData", keys(&["k"])).unwrap(),
        map(&[("k", &[0xA, 0xB, 0xC])])
    );
}

#[test]
fn conditional_set_with_stale_expectation_changes_nothing() {
    let (storage, _store) = sync_stack();
    storage.set("ueData", map(&[("k", &[0xA, 0xB, 0xC])])).unwrap();

    let applied = storage
        .set_if("ueData", "k", vec![0xA, 0xB], vec![0xD])
        .unwrap();

    assert!(!applied);
    assert_eq!(
        storage.get("ueData", keys(&["k"])).unwrap(),
        map(&[("k", &[0xA, 0xB, 0xC])])
    );
}

#[test]
fn conditional_remove_succeeds_exactly_once() {
    let (storage, _store) = sync_stack();
    storage.set("ueData", map(&[("k", &[1])])).unwrap();

    assert!(storage.remove_if("ueData", "k", vec![1]).unwrap());
    assert!(!storage.remove_if("ueData", "k", vec![1]).unwrap());
}

#[test]
fn set_if_not_exists_claims_a_key_exactly_once() {
    let (storage, _store) = sync_stack();

    assert!(storage.set_if_not_exists("ueData", "lock", vec![1]).unwrap());
    assert!(!storage.set_if_not_exists("ueData", "lock", vec![2]).unwrap());
    assert_eq!(
        storage.get("ueData", keys(&["lock"])).unwrap(),
        map(&[("lock", &[1])])
    );
}

#[test]
fn key_searches_cover_prefix_and_glob_forms() {
    let (storage, _store) = sync_stack();
    storage
        .set(
            "ueData",
            map(&[("cell-1", &[1]), ("cell-2", &[2]), ("core", &[3])]),
        )
        .unwrap();

    assert_eq!(
        storage.find_keys("ueData", "cell-").unwrap(),
        keys(&["cell-1", "cell-2"])
    );
    assert_eq!(storage.list_keys("ueData", "c*e").unwrap(), keys(&["core"]));
}

#[test]
fn prefixes_with_range_characters_match_literally() {
    let (storage, _store) = sync_stack();
    storage
        .set("ueData", map(&[("probe-^7", &[1]), ("probeX7", &[2])]))
        .unwrap();

    assert_eq!(
        storage.find_keys("ueData", "probe-^").unwrap(),
        keys(&["probe-^7"])
    );
}

#[test]
fn remove_all_clears_the_namespace() {
    let (storage, store) = sync_stack();
    storage.set("ueData", map(&[("a", &[1]), ("b", &[2])])).unwrap();

    storage.remove_all("ueData").unwrap();

    assert!(store.borrow().is_empty());
}

#[test]
fn operations_without_readiness_time_out_rejected_by_sdl() {
    // A stack whose discovery can never publish: readiness stays pending
    // and the configured timeout is the only way out.
    let storage = {
        struct Pending;
        use sdl_storage::{
            AsyncCommandDispatcher, CommandCallback, CommandContents, ConnectedCallback,
            DisconnectCallback, DispatcherSetup,
        };
        impl AsyncCommandDispatcher for Pending {
            fn wait_connected(&self, _callback: ConnectedCallback) {}
            fn register_disconnect_cb(&self, _callback: DisconnectCallback) {}
            fn dispatch(&self, _ns: &str, _contents: CommandContents, _callback: CommandCallback) {}
        }

        let system = Rc::new(FakeSystem::new());
        let engine = EventLoop::new(Rc::clone(&system) as Rc<dyn sdl_core::System>);
        let router = StorageRouter::with_configuration(
            engine as Rc<dyn Engine>,
            DatabaseConfiguration::new(
                DbType::Standalone,
                vec![HostAndPort::new("db.local", 6379)],
            ),
            NamespaceConfigurations::new(),
            None,
            Rc::new(|_setup: DispatcherSetup| {
                Rc::new(Pending) as Rc<dyn AsyncCommandDispatcher>
            }),
        );
        let storage =
            SyncStorage::with_system(router as Rc<dyn AsyncStorage>, system as Rc<dyn sdl_core::System>);
        storage.set_operation_timeout(Duration::from_millis(100));
        storage
    };

    let error = storage.set("ueData", map(&[("k", &[1])])).unwrap_err();
    assert!(matches!(error, Error::RejectedBySdl(_)));
    assert!(error.to_string().contains("ueData"));
}
