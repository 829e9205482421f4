// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System seam for testable time, environment, and fd readiness.
//!
//! Components take `Rc<dyn System>` so tests can substitute a
//! [`crate::test_support::FakeSystem`] with a scripted environment and a
//! virtual clock. Production binds to [`RealSystem`].

use std::io;
use std::os::fd::BorrowedFd;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::time::TimeSpec;
use nix::time::{clock_gettime, ClockId};
use thiserror::Error;

/// A syscall failure, tagged with the call that produced it.
#[derive(Debug, Error)]
#[error("{call} failed: {source}")]
pub struct SystemError {
    pub call: &'static str,
    #[source]
    pub source: io::Error,
}

impl SystemError {
    pub fn new(call: &'static str, errno: Errno) -> Self {
        Self { call, source: io::Error::from_raw_os_error(errno as i32) }
    }
}

/// OS primitives the runtime depends on.
pub trait System {
    /// Monotonic clock reading (CLOCK_MONOTONIC). This is the time base
    /// shared with the engine's timer fd, so timer deadlines and
    /// sync-facade timeout bookkeeping agree.
    fn time_since_epoch(&self) -> Duration;

    /// Environment variable lookup.
    fn env_var(&self, name: &str) -> Option<String>;

    /// Wait for `fd` to become readable. `None` blocks indefinitely.
    ///
    /// Signal interruption is not an error; it reports "not ready" and
    /// the caller retries.
    fn poll_readable(
        &self,
        fd: BorrowedFd<'_>,
        timeout: Option<Duration>,
    ) -> Result<bool, SystemError>;
}

/// Production [`System`] bound to real syscalls.
///
/// Stateless and trivially constructed; one instance per process is
/// plenty but nothing enforces it.
#[derive(Debug, Clone, Default)]
pub struct RealSystem;

impl System for RealSystem {
    fn time_since_epoch(&self) -> Duration {
        match clock_gettime(ClockId::CLOCK_MONOTONIC) {
            Ok(ts) => timespec_to_duration(ts),
            Err(errno) => crate::sdl_abort!("clock_gettime failed: {errno}"),
        }
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn poll_readable(
        &self,
        fd: BorrowedFd<'_>,
        timeout: Option<Duration>,
    ) -> Result<bool, SystemError> {
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        let poll_timeout = match timeout {
            None => PollTimeout::NONE,
            Some(d) => {
                let millis = d.as_millis().min(i32::MAX as u128) as i32;
                PollTimeout::try_from(millis)
                    .map_err(|_| SystemError::new("poll", Errno::EINVAL))?
            }
        };
        match poll(&mut fds, poll_timeout) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(fds[0]
                .revents()
                .map(|revents| revents.contains(PollFlags::POLLIN))
                .unwrap_or(false)),
            Err(Errno::EINTR) => Ok(false),
            Err(errno) => Err(SystemError::new("poll", errno)),
        }
    }
}

pub(crate) fn timespec_to_duration(ts: TimeSpec) -> Duration {
    Duration::new(ts.tv_sec() as u64, ts.tv_nsec() as u32)
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
