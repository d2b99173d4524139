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

//! Error types and the translation of transport failures into integer error codes.
//!
//! Every failure inside the crate is a [`SysdevError`]. Callers that need the C-style integer
//! surface use [`SysdevError::errno`], which goes through [`ErrorCode`]. Transport errors are
//! first classified into a [`TransportErrorCode`] by their D-Bus error name and then mapped by
//! [`translate`].

use std::path::PathBuf;
use zbus::fdo;

/// `errno` values used by the integer error surface.
pub const EINVAL: i32 = 22;
pub const EACCES: i32 = 13;
pub const ENOMEM: i32 = 12;
pub const ENODEV: i32 = 19;
pub const ECOMM: i32 = 70;
pub const ENOTSUP: i32 = 95;

const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";
const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";

#[derive(Debug, thiserror::Error)]
pub enum SysdevError {
    #[error("SysdevError::Argument: {0}")]
    Argument(String),
    #[error("SysdevError::Marshal: {0}")]
    Marshal(String),
    #[error("SysdevError::Bus: {0}")]
    Bus(#[from] zbus::Error),
    #[error("SysdevError::PendingCalls: all {0} pending call slots are in use")]
    PendingCalls(usize),
    #[error("SysdevError::Closed: the proxy cache has been closed")]
    Closed,
    #[error("SysdevError::Config: failed to parse {file:?}: {e}")]
    Config { file: PathBuf, e: toml::de::Error },
    #[error("SysdevError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

impl SysdevError {
    /// The closed error-code domain this error belongs to.
    pub fn code(&self) -> ErrorCode {
        match self {
            SysdevError::Argument(..) | SysdevError::Marshal(..) => ErrorCode::InvalidArgument,
            SysdevError::Bus(e) => translate(TransportErrorCode::from(e)),
            SysdevError::PendingCalls(..) => ErrorCode::OutOfMemory,
            _ => ErrorCode::CommunicationFailure,
        }
    }

    /// Negative `errno` value for this error, as returned by the integer call surface.
    pub fn errno(&self) -> i32 {
        self.code().errno()
    }
}

/// Result classes reported by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success,
    InvalidArgument,
    PermissionDenied,
    NotSupported,
    CommunicationFailure,
    OutOfMemory,
}

impl ErrorCode {
    pub fn errno(self) -> i32 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::InvalidArgument => -EINVAL,
            ErrorCode::PermissionDenied => -EACCES,
            ErrorCode::NotSupported => -ENOTSUP,
            ErrorCode::CommunicationFailure => -ECOMM,
            ErrorCode::OutOfMemory => -ENOMEM,
        }
    }
}

/// Transport failure classes that carry a meaning of their own.
///
/// A device daemon that does not support a device never registers the corresponding method,
/// so the bus answers with `UnknownMethod`. Everything else is a plain communication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorCode {
    AccessDenied,
    UnknownMethod,
    Other,
}

impl TransportErrorCode {
    pub fn from_error_name(name: &str) -> Self {
        match name {
            ACCESS_DENIED => TransportErrorCode::AccessDenied,
            UNKNOWN_METHOD => TransportErrorCode::UnknownMethod,
            _ => TransportErrorCode::Other,
        }
    }
}

impl From<&zbus::Error> for TransportErrorCode {
    fn from(err: &zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, _, _) => Self::from_error_name(name.as_str()),
            zbus::Error::FDO(e) => match e.as_ref() {
                fdo::Error::AccessDenied(..) => TransportErrorCode::AccessDenied,
                fdo::Error::UnknownMethod(..) => TransportErrorCode::UnknownMethod,
                _ => TransportErrorCode::Other,
            },
            _ => TransportErrorCode::Other,
        }
    }
}

/// Map a transport failure class onto the dispatcher's error codes.
///
/// Total: anything not explicitly recognised is a communication failure.
pub fn translate(code: TransportErrorCode) -> ErrorCode {
    match code {
        TransportErrorCode::AccessDenied => ErrorCode::PermissionDenied,
        TransportErrorCode::UnknownMethod => ErrorCode::NotSupported,
        TransportErrorCode::Other => ErrorCode::CommunicationFailure,
    }
}
