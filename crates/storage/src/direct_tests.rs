// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::discovery::create_discovery;
use crate::test_support::recording_factory;
use sdl_config::{DatabaseConfiguration, DbType};
use sdl_core::system::RealSystem;
use sdl_engine::EventLoop;

fn engine() -> Rc<sdl_engine::EventLoop> {
    EventLoop::new(Rc::new(RealSystem))
}

fn collected() -> (Rc<RefCell<Vec<DatabaseInfo>>>, StateChangedCb) {
    let seen: Rc<RefCell<Vec<DatabaseInfo>>> = Rc::new(RefCell::new(Vec::new()));
    let seen_in_cb = Rc::clone(&seen);
    (seen, Box::new(move |info| seen_in_cb.borrow_mut().push(info)))
}

#[test]
fn publishes_the_static_topology_once_through_the_loop() {
    let engine = engine();
    let discovery = DirectDiscovery::new(
        engine.clone() as Rc<dyn Engine>,
        Some("ueData".to_string()),
        DatabaseType::Single,
        vec![HostAndPort::new("server.local", 6379)],
    );
    let (seen, callback) = collected();

    discovery.set_state_changed_cb(callback);
    assert!(seen.borrow().is_empty());

    engine.handle_events();
    {
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].database_type, DatabaseType::Single);
        assert_eq!(seen[0].discovery, DiscoveryMethod::Direct);
        assert_eq!(seen[0].hosts, vec![HostAndPort::new("server.local", 6379)]);
        assert_eq!(seen[0].ns.as_deref(), Some("ueData"));
    }

    // Static topology: nothing further is ever published.
    engine.handle_events();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn cleared_callback_receives_nothing() {
    let engine = engine();
    let discovery = DirectDiscovery::new(
        engine.clone() as Rc<dyn Engine>,
        None,
        DatabaseType::Single,
        vec![HostAndPort::new("server.local", 6379)],
    );
    let (seen, callback) = collected();

    discovery.set_state_changed_cb(callback);
    discovery.clear_state_changed_cb();
    engine.handle_events();

    assert!(seen.borrow().is_empty());
}

#[test]
fn publication_does_not_outlive_the_discovery() {
    let engine = engine();
    let (seen, callback) = collected();
    {
        let discovery = DirectDiscovery::new(
            engine.clone() as Rc<dyn Engine>,
            None,
            DatabaseType::Single,
            vec![HostAndPort::new("server.local", 6379)],
        );
        discovery.set_state_changed_cb(callback);
    }
    engine.handle_events();

    assert!(seen.borrow().is_empty());
}

#[test]
fn cluster_topology_is_published_as_cluster() {
    let engine = engine();
    let configuration = DatabaseConfiguration::new(
        DbType::Cluster,
        vec![HostAndPort::new("c-0", 7000), HostAndPort::new("c-1", 7001)],
    );
    let discovery = create_discovery(
        engine.clone() as Rc<dyn Engine>,
        None,
        &configuration,
        None,
        &recording_factory(Vec::new()),
    );
    let (seen, callback) = collected();

    discovery.set_state_changed_cb(callback);
    engine.handle_events();

    let seen = seen.borrow();
    assert_eq!(seen[0].database_type, DatabaseType::Cluster);
    assert_eq!(seen[0].hosts.len(), 2);
}

#[test]
fn empty_configuration_falls_back_to_default_address() {
    let engine = engine();
    let configuration = DatabaseConfiguration::new(DbType::Standalone, Vec::new());
    let discovery = create_discovery(
        engine.clone() as Rc<dyn Engine>,
        None,
        &configuration,
        None,
        &recording_factory(Vec::new()),
    );
    let (seen, callback) = collected();

    discovery.set_state_changed_cb(callback);
    engine.handle_events();

    assert_eq!(seen.borrow()[0].hosts, vec![HostAndPort::new("localhost", 6379)]);
}
