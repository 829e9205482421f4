// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::FakeSystem;
use std::os::fd::AsFd;

#[test]
fn real_clock_is_monotonic() {
    let system = RealSystem;
    let t1 = system.time_since_epoch();
    let t2 = system.time_since_epoch();
    assert!(t2 >= t1);
}

#[test]
fn real_env_lookup_reports_absent_variables() {
    let system = RealSystem;
    assert_eq!(system.env_var("SDL_SUCH_VARIABLE_DOES_NOT_EXIST"), None);
}

#[test]
fn poll_reports_readable_pipe_end() {
    let system = RealSystem;
    let (read_end, write_end) = nix::unistd::pipe().unwrap();

    assert!(!system
        .poll_readable(read_end.as_fd(), Some(Duration::ZERO))
        .unwrap());

    nix::unistd::write(write_end.as_fd(), b"x").unwrap();
    assert!(system
        .poll_readable(read_end.as_fd(), Some(Duration::from_secs(1)))
        .unwrap());
}

#[test]
fn fake_clock_advances_by_poll_timeout() {
    let system = FakeSystem::new();
    let start = system.time_since_epoch();
    let (read_end, _write_end) = nix::unistd::pipe().unwrap();

    let ready = system
        .poll_readable(read_end.as_fd(), Some(Duration::from_millis(250)))
        .unwrap();

    assert!(!ready);
    assert_eq!(system.time_since_epoch() - start, Duration::from_millis(250));
    assert_eq!(system.poll_calls(), 1);
}

#[test]
fn fake_env_is_scriptable() {
    let system = FakeSystem::new();
    system.set_env("DBAAS_SERVICE_HOST", "server.local");
    assert_eq!(
        system.env_var("DBAAS_SERVICE_HOST").as_deref(),
        Some("server.local")
    );
    assert_eq!(system.env_var("DBAAS_SERVICE_PORT"), None);
}
