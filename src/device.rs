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

//! Device capabilities exposed by the device daemon.
//!
//! Each operation validates its arguments, issues one or more synchronous calls through the
//! [`Dispatcher`] and maps the outcome onto [`DeviceError`].
//!
//! # Components
//!
//! - [`battery`] - Battery charge state and warning level
//! - [`display`] - Display count and brightness
//! - [`flash`] - Camera flash LED brightness

pub mod battery;
pub mod display;
pub mod flash;

use crate::comm::dbus::{Dispatcher, Transport, ZbusTransport};
use crate::config::{DEVICED_BUS_NAME, DispatcherConfig};
use crate::error::{EACCES, ENODEV, ENOTSUP, ErrorCode, SysdevError};
use log::error;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("DeviceError::InvalidParameter: {0}")]
    InvalidParameter(&'static str),
    #[error("DeviceError::PermissionDenied: the daemon refused the request")]
    PermissionDenied,
    #[error("DeviceError::NotSupported: the device is not present or not supported")]
    NotSupported,
    #[error("DeviceError::OperationFailed: the daemon could not complete the request")]
    OperationFailed,
}

impl From<ErrorCode> for DeviceError {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::NotSupported => DeviceError::NotSupported,
            ErrorCode::PermissionDenied => DeviceError::PermissionDenied,
            _ => DeviceError::OperationFailed,
        }
    }
}

impl From<SysdevError> for DeviceError {
    fn from(err: SysdevError) -> Self {
        DeviceError::from(err.code())
    }
}

/// Map the integer a daemon answered with onto a device result.
///
/// # Returns: `Result<i32, DeviceError>`
/// * `Ok(i32)` - `value` itself when it is not negative
/// * `Err(DeviceError::NotSupported)` - `-ENODEV` or `-ENOTSUP`
/// * `Err(DeviceError::PermissionDenied)` - `-EACCES`
/// * `Err(DeviceError::OperationFailed)` - Any other negative value
pub fn check_value(value: i32) -> Result<i32, DeviceError> {
    match value {
        v if v >= 0 => Ok(v),
        v if v == -ENODEV || v == -ENOTSUP => Err(DeviceError::NotSupported),
        v if v == -EACCES => Err(DeviceError::PermissionDenied),
        _ => Err(DeviceError::OperationFailed),
    }
}

/// Map a dispatcher result onto a device result.
pub fn check_result(result: Result<i32, SysdevError>) -> Result<i32, DeviceError> {
    match result {
        Ok(value) => check_value(value),
        Err(e) => {
            error!("Device request failed: {e}");
            Err(e.into())
        }
    }
}

/// Client for the device daemon's capabilities.
pub struct DeviceClient<T: Transport = ZbusTransport> {
    dispatcher: Arc<Dispatcher<T>>,
}

impl DeviceClient<ZbusTransport> {
    /// Client over the bus named in `config`. Must be called from within a tokio runtime.
    pub fn connect(config: &DispatcherConfig) -> Self {
        DeviceClient::new(Arc::new(Dispatcher::connect(config)))
    }
}

impl<T: Transport> DeviceClient<T> {
    pub fn new(dispatcher: Arc<Dispatcher<T>>) -> Self {
        DeviceClient { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<T>> {
        &self.dispatcher
    }

    async fn call(
        &self,
        path: &str,
        interface: &str,
        method: &str,
        signature: &str,
        params: &[String],
    ) -> Result<i32, DeviceError> {
        check_result(
            self.dispatcher
                .call_sync(
                    DEVICED_BUS_NAME,
                    path,
                    interface,
                    method,
                    signature,
                    params,
                )
                .await,
        )
    }
}
