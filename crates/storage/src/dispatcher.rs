// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command dispatcher contract.
//!
//! A dispatcher owns one connection (or cluster pool) to one logical
//! backend endpoint and executes commands against it. The wire protocol
//! lives entirely behind this contract; the embedder supplies a
//! [`DispatcherFactory`] binding it to their protocol library.
//!
//! Command vocabulary the storage layer emits (the conditional and
//! `…PUB` notification variants come with the dbaas server module):
//! `MSET`/`MSETPUB`, `SETIE`/`SETIEPUB` (`<key> <new> <old>`),
//! `SETNX`/`SETNXPUB`, `MGET`, `DEL`/`DELPUB`, `DELIE`/`DELIEPUB`,
//! `KEYS`, `SUBSCRIBE`, `SENTINEL get-master-addr-by-name`. Conditional
//! commands answer with a status or positive integer when the condition
//! held, nil or zero when it did not.

use std::rc::Rc;

use sdl_core::Error;
use sdl_engine::Engine;
use thiserror::Error as ThisError;

use crate::database_info::DatabaseInfo;

/// One command as an ordered sequence of opaque byte-string arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandContents {
    parts: Vec<Vec<u8>>,
}

impl CommandContents {
    pub fn command(name: &str) -> Self {
        Self { parts: vec![name.as_bytes().to_vec()] }
    }

    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.parts.push(arg.into());
        self
    }

    pub fn parts(&self) -> &[Vec<u8>] {
        &self.parts
    }

    pub fn command_name(&self) -> Option<&str> {
        self.parts.first().and_then(|name| std::str::from_utf8(name).ok())
    }
}

/// Parsed backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Integer(i64),
    Status(String),
    Data(Vec<u8>),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Reply::Data(data) => Some(data),
            _ => None,
        }
    }
}

/// Failure reported by a dispatcher for one command. A closed
/// enumeration: protocol libraries fold their specific errors into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum DispatcherError {
    #[error("backend error")]
    Unknown,

    #[error("connection lost")]
    ConnectionLost,

    #[error("protocol error")]
    ProtocolError,

    #[error("backend out of memory")]
    OutOfMemory,

    #[error("dataset still being loaded into memory")]
    DatasetLoading,

    #[error("not connected, operation not started")]
    NotConnected,

    #[error("backend I/O error")]
    IoError,

    #[error("writing to slave")]
    WritingToSlave,
}

/// Map a dispatcher failure onto the user-visible error taxonomy.
pub fn to_storage_error(error: DispatcherError) -> Error {
    let message = error.to_string();
    match error {
        DispatcherError::ConnectionLost => Error::OperationInterrupted(message),
        DispatcherError::ProtocolError => Error::RejectedByBackend(message),
        DispatcherError::DatasetLoading | DispatcherError::NotConnected => {
            Error::NotConnected(message)
        }
        DispatcherError::Unknown
        | DispatcherError::OutOfMemory
        | DispatcherError::IoError
        | DispatcherError::WritingToSlave => Error::BackendError(message),
    }
}

/// Invoked once the dispatcher's connection is established; immediately
/// when it already is.
pub type ConnectedCallback = Box<dyn FnOnce()>;

/// Invoked each time the dispatcher loses its connection.
pub type DisconnectCallback = Box<dyn FnMut()>;

/// Completion of one dispatched command.
///
/// Invoked exactly once per command, except on dispatchers created with
/// `permanent_command_callbacks` (subscribers), where every pushed
/// message re-invokes the same callback. Never invoked after the
/// dispatcher is dropped.
pub type CommandCallback = Box<dyn FnMut(Result<Reply, DispatcherError>)>;

/// Executes commands against one logical backend endpoint.
///
/// Completions for a single dispatcher run on the engine thread in
/// submission order. Disconnection and reconnection are reported through
/// [`AsyncCommandDispatcher::register_disconnect_cb`] and the discovery
/// layer, never through command callbacks.
pub trait AsyncCommandDispatcher {
    fn wait_connected(&self, callback: ConnectedCallback);

    fn register_disconnect_cb(&self, callback: DisconnectCallback);

    /// Submit one command. `ns` carries the namespace for hash-slot
    /// routing in cluster deployments.
    fn dispatch(&self, ns: &str, contents: CommandContents, callback: CommandCallback);
}

/// Everything a factory needs to build a dispatcher for one endpoint.
pub struct DispatcherSetup {
    pub engine: Rc<dyn Engine>,
    pub database_info: DatabaseInfo,
    /// Subscriber connections keep their command callback alive across
    /// replies instead of consuming it on the first one.
    pub permanent_command_callbacks: bool,
}

/// Embedder-supplied constructor for dispatchers.
pub type DispatcherFactory = Rc<dyn Fn(DispatcherSetup) -> Rc<dyn AsyncCommandDispatcher>>;

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
