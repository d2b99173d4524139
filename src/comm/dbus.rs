// This file is part of sysdev, a client library for platform device daemons reached over D-Bus.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// sysdev is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// sysdev is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Client side of the device daemons' D-Bus interfaces.
//!
//! # Components
//!
//! - [`proxy_cache`] - Pooled proxies keyed by (destination, object path, interface), reclaimed
//!   when the remote owner of a destination changes
//! - [`dispatcher`] - Synchronous and asynchronous method calls through cached proxies
//! - [`marshal`] - Signature string plus string parameters to a positional argument tuple
//! - [`transport`] - The seam between the cache/dispatcher and the bus connection
//!
//! # Control flow
//!
//! caller → [`Dispatcher`] (acquire proxy from [`ProxyCache`], marshal arguments) → transport →
//! remote daemon → [`Dispatcher`] (reply integer or translated error) → caller.

pub mod dispatcher;
pub mod marshal;
pub mod proxy_cache;
pub mod transport;

#[cfg(test)]
pub(crate) mod fake_transport;

pub use dispatcher::{Dispatcher, PendingCallback};
pub use marshal::{Arg, Args, marshal};
pub use proxy_cache::ProxyCache;
pub use transport::{Transport, ZbusTransport};

use crate::config::DBUS_MAXIMUM_NAME_LENGTH;
use crate::error::SysdevError;
use std::fmt;

/// Identity of one cached proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyKey {
    pub destination: String,
    pub object_path: String,
    pub interface: String,
}

impl ProxyKey {
    /// Build a key, rejecting empty components before anything touches the bus.
    pub fn new(destination: &str, object_path: &str, interface: &str) -> Result<Self, SysdevError> {
        if destination.is_empty() || object_path.is_empty() || interface.is_empty() {
            return Err(SysdevError::Argument(format!(
                "Cannot determine destination address: destination '{destination}', \
                path '{object_path}', interface '{interface}'"
            )));
        }
        Ok(ProxyKey {
            destination: destination.to_string(),
            object_path: object_path.to_string(),
            interface: interface.to_string(),
        })
    }

    /// Whether this key addresses the same remote interface as `other`.
    ///
    /// Destination and interface names only compare their first [`DBUS_MAXIMUM_NAME_LENGTH`]
    /// bytes, so two longer names sharing that prefix are considered equal. Object paths compare
    /// in full.
    pub fn matches(&self, other: &ProxyKey) -> bool {
        bounded_name(&self.destination) == bounded_name(&other.destination)
            && self.object_path == other.object_path
            && bounded_name(&self.interface) == bounded_name(&other.interface)
    }
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.destination, self.object_path, self.interface
        )
    }
}

fn bounded_name(name: &str) -> &[u8] {
    let bytes = name.as_bytes();
    &bytes[..bytes.len().min(DBUS_MAXIMUM_NAME_LENGTH)]
}

#[cfg(test)]
mod test_proxy_key {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    #[gtest]
    #[rstest]
    #[case::no_destination("", "/Org/Tizen/System/DeviceD/Display", "org.tizen.system.deviced.display")]
    #[case::no_path("org.tizen.system.deviced", "", "org.tizen.system.deviced.display")]
    #[case::no_interface("org.tizen.system.deviced", "/Org/Tizen/System/DeviceD/Display", "")]
    fn empty_component_is_rejected(
        #[case] destination: &str,
        #[case] path: &str,
        #[case] interface: &str,
    ) {
        let result = ProxyKey::new(destination, path, interface);
        assert_that!(
            result,
            err(displays_as(contains_substring("SysdevError::Argument")))
        );
    }

    #[gtest]
    fn identical_keys_match() {
        let a = ProxyKey::new("a.b", "/a/b", "a.b.c").unwrap();
        let b = ProxyKey::new("a.b", "/a/b", "a.b.c").unwrap();
        assert_that!(a.matches(&b), eq(true));
    }

    #[gtest]
    #[rstest]
    #[case::destination("a.c", "/a/b", "a.b.c")]
    #[case::path("a.b", "/a/b/c", "a.b.c")]
    #[case::interface("a.b", "/a/b", "a.b.d")]
    fn differing_keys_do_not_match(
        #[case] destination: &str,
        #[case] path: &str,
        #[case] interface: &str,
    ) {
        let a = ProxyKey::new("a.b", "/a/b", "a.b.c").unwrap();
        let b = ProxyKey::new(destination, path, interface).unwrap();
        assert_that!(a.matches(&b), eq(false));
    }

    #[gtest]
    fn names_sharing_a_bounded_prefix_collide() {
        let prefix = "x".repeat(DBUS_MAXIMUM_NAME_LENGTH);
        let a = ProxyKey::new(&format!("{prefix}.one"), "/p", &format!("{prefix}.i1")).unwrap();
        let b = ProxyKey::new(&format!("{prefix}.two"), "/p", &format!("{prefix}.i2")).unwrap();
        assert_that!(a.matches(&b), eq(true));
    }

    #[gtest]
    fn long_paths_compare_in_full() {
        let prefix = "/p".repeat(DBUS_MAXIMUM_NAME_LENGTH);
        let a = ProxyKey::new("a.b", &format!("{prefix}/one"), "a.b.c").unwrap();
        let b = ProxyKey::new("a.b", &format!("{prefix}/two"), "a.b.c").unwrap();
        assert_that!(a.matches(&b), eq(false));
    }
}
