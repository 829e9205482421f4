// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-visible error taxonomy.
//!
//! Every storage operation completes with `Ok` or exactly one of these
//! kinds. The kinds are ordered by how actionable they are for the
//! caller: `RejectedBySdl` means the request itself was wrong,
//! `NotConnected` means retry after discovery catches up,
//! `OperationInterrupted` means the outcome is indeterminate (safe to
//! retry for idempotent operations), and the two backend kinds report
//! refusals and failures from the backing store.

use thiserror::Error;

/// Failure of a storage operation, as observed by the application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The request violates a client-side invariant (invalid namespace,
    /// readiness timeout).
    #[error("rejected by SDL: {0}")]
    RejectedBySdl(String),

    /// No backend endpoint is currently known; discovery has not
    /// published or has withdrawn.
    #[error("not connected: {0}")]
    NotConnected(String),

    /// The connection dropped mid-command; the outcome is indeterminate.
    #[error("operation interrupted: {0}")]
    OperationInterrupted(String),

    /// The backend refused the command at the protocol level.
    #[error("rejected by backend: {0}")]
    RejectedByBackend(String),

    /// Any other backend-reported failure.
    #[error("backend error: {0}")]
    BackendError(String),
}

impl Error {
    /// Shorthand for the invalid-namespace rejection used across handlers.
    pub fn invalid_namespace(ns: &str) -> Self {
        Error::RejectedBySdl(format!(
            "invalid namespace \"{ns}\", disallowed characters: {}",
            crate::namespace::disallowed_characters()
        ))
    }
}
