// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owning file descriptor wrapper with a pre-close hook.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};

use sdl_core::sdl_abort;

/// Hook invoked with the still-open fd just before it is closed.
pub type AtCloseHook = Box<dyn FnOnce(BorrowedFd<'_>)>;

/// Exclusive owner of a file descriptor.
///
/// The optional pre-close hook lets the owner unhook the fd from the
/// engine's watch set before the descriptor goes away. Ownership moves
/// with the value; an emptied wrapper (after [`FileDescriptor::into_inner`])
/// neither closes nor runs the hook.
pub struct FileDescriptor {
    fd: Option<OwnedFd>,
    at_close: Option<AtCloseHook>,
}

impl FileDescriptor {
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd: Some(fd), at_close: None }
    }

    /// Install (or replace) the pre-close hook.
    pub fn at_close(&mut self, hook: AtCloseHook) {
        self.at_close = Some(hook);
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_ref().map(|fd| fd.as_raw_fd()).unwrap_or(-1)
    }

    /// Release the descriptor without closing it or running the hook.
    pub fn into_inner(mut self) -> Option<OwnedFd> {
        self.at_close = None;
        self.fd.take()
    }
}

impl AsFd for FileDescriptor {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match &self.fd {
            Some(fd) => fd.as_fd(),
            None => sdl_abort!("file descriptor used after release"),
        }
    }
}

impl From<OwnedFd> for FileDescriptor {
    fn from(fd: OwnedFd) -> Self {
        Self::new(fd)
    }
}

impl Drop for FileDescriptor {
    fn drop(&mut self) {
        let Some(fd) = self.fd.take() else {
            return;
        };
        if let Some(hook) = self.at_close.take() {
            hook(fd.as_fd());
        }
        let raw = fd.into_raw_fd();
        if let Err(errno) = nix::unistd::close(raw) {
            sdl_abort!("close failed for fd {raw}: {errno}");
        }
    }
}

#[cfg(test)]
#[path = "fd_tests.rs"]
mod tests;
