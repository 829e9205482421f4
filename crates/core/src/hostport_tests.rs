// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    host_only = { "server.local", "server.local", DEFAULT_PORT },
    host_and_port = { "server.local:1234", "server.local", 1234 },
    bracketed_v6 = { "[2001:db8::1]", "2001:db8::1", DEFAULT_PORT },
    bracketed_v6_with_port = { "[2001:db8::1]:1234", "2001:db8::1", 1234 },
)]
fn parses_addresses(input: &str, host: &str, port: u16) {
    let parsed = HostAndPort::parse(input, DEFAULT_PORT).unwrap();
    assert_eq!(parsed.host(), host);
    assert_eq!(parsed.port(), port);
}

#[parameterized(
    empty = { "" },
    empty_bracketed = { "[]" },
    port_only = { ":6379" },
)]
fn rejects_empty_hosts(input: &str) {
    assert!(matches!(
        HostAndPort::parse(input, DEFAULT_PORT),
        Err(AddressError::EmptyHost(_))
    ));
}

#[test]
fn rejects_unbracketed_ipv6() {
    assert!(matches!(
        HostAndPort::parse("2001:db8::1", DEFAULT_PORT),
        Err(AddressError::AmbiguousAddress(_))
    ));
}

#[test]
fn rejects_garbage_port() {
    assert!(matches!(
        HostAndPort::parse("host:abc", DEFAULT_PORT),
        Err(AddressError::InvalidPort(_))
    ));
    assert!(matches!(
        HostAndPort::parse("host:65536", DEFAULT_PORT),
        Err(AddressError::InvalidPort(_))
    ));
}

#[test]
fn orders_by_host_then_port() {
    let a = HostAndPort::new("alpha", 2);
    let b = HostAndPort::new("beta", 1);
    assert!(a < b);
    assert!(HostAndPort::new("alpha", 1) < a);
}

#[test]
fn displays_bracketed_ipv6() {
    let addr = HostAndPort::new("2001:db8::1", 6379);
    assert_eq!(addr.to_string(), "[2001:db8::1]:6379");
    assert_eq!(HostAndPort::new("host", 1).to_string(), "host:1");
}
