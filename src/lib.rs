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

//! sysdev - client library for platform device daemons reached over D-Bus.
//!
//! The library keeps a pool of D-Bus proxies keyed by (destination, object path, interface),
//! reclaims a proxy once the remote service behind it restarts, and issues method calls through
//! those proxies with a compact signature string and string parameters.
//!
//! # Modules
//!
//! - [`comm::dbus`] - Proxy cache, argument marshaling and the call dispatcher
//! - [`device`] - Validating wrappers for display and camera flash brightness
//! - [`config`] - Well-known bus names and the optional configuration file
//! - [`error`] - Crate errors and their integer error codes
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - The library logs through the `log` facade. Binaries pick the backend.

pub mod comm;
pub mod config;
pub mod device;
pub mod error;
