// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sdl-core: Shared vocabulary for the Shared Data Layer client runtime.
//!
//! Holds the types every other crate speaks (namespaces, keys, opaque
//! data, host addresses), the user-visible error taxonomy, and the
//! [`System`] seam over the OS primitives that need to be faked in tests.

pub mod macros;

pub mod error;
pub mod hostport;
pub mod namespace;
pub mod system;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::Error;
pub use hostport::{AddressError, HostAndPort, DEFAULT_PORT, DEFAULT_SENTINEL_PORT};
pub use namespace::{disallowed_characters, is_valid_namespace, is_valid_namespace_syntax};
pub use system::{RealSystem, System, SystemError};
#[cfg(any(test, feature = "test-support"))]
pub use test_support::FakeSystem;
pub use types::{Data, DataMap, Key, Keys, Namespace, PublisherId, RequestId};
