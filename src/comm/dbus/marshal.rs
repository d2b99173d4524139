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

//! Turning a signature string and string parameters into a call's argument tuple.
//!
//! The signature alphabet is `i` (int32), `u` (uint32), `t` (uint64 on the wire, parsed as a
//! 64-bit signed value first) and `s` (string). Each character consumes the parameter at the
//! same position.

use crate::error::SysdevError;
use log::trace;
use zbus::zvariant::{Structure, StructureBuilder};

/// One marshaled argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Int32(i32),
    Uint32(u32),
    Uint64(u64),
    Str(String),
}

/// Positional arguments of one method call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn as_slice(&self) -> &[Arg] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build the message body for these arguments, `None` when the call takes none.
    pub fn to_structure(&self) -> Result<Option<Structure<'_>>, zbus::Error> {
        if self.0.is_empty() {
            return Ok(None);
        }
        let builder = self
            .0
            .iter()
            .fold(StructureBuilder::new(), |builder, arg| match arg {
                Arg::Int32(v) => builder.add_field(*v),
                Arg::Uint32(v) => builder.add_field(*v),
                Arg::Uint64(v) => builder.add_field(*v),
                Arg::Str(v) => builder.add_field(v.as_str()),
            });
        Ok(Some(builder.build()?))
    }
}

impl From<Vec<Arg>> for Args {
    fn from(args: Vec<Arg>) -> Self {
        Args(args)
    }
}

fn parse_param<T: std::str::FromStr>(
    param: &str,
    sig: char,
    index: usize,
) -> Result<T, SysdevError> {
    param.trim().parse::<T>().map_err(|_| {
        SysdevError::Marshal(format!(
            "parameter {index} '{param}' is not a valid value for signature '{sig}'"
        ))
    })
}

/// Marshal `params` according to `signature`.
///
/// Fails on an unknown signature character, on a parameter that does not parse as its type,
/// and when the number of parameters differs from the signature's length.
pub fn marshal<S: AsRef<str>>(signature: &str, params: &[S]) -> Result<Args, SysdevError> {
    let sig_len = signature.chars().count();
    if sig_len != params.len() {
        return Err(SysdevError::Marshal(format!(
            "signature '{signature}' expects {sig_len} parameters but {} were given",
            params.len()
        )));
    }

    let mut args = Vec::with_capacity(sig_len);
    for (index, (sig, param)) in signature.chars().zip(params).enumerate() {
        let param = param.as_ref();
        let arg = match sig {
            'i' => Arg::Int32(parse_param(param, sig, index)?),
            'u' => Arg::Uint32(parse_param(param, sig, index)?),
            // A negative value keeps its two's complement bits, as the daemons expect.
            't' => match param.trim().parse::<i64>() {
                Ok(v) => Arg::Uint64(v as u64),
                Err(_) => Arg::Uint64(parse_param(param, sig, index)?),
            },
            's' => Arg::Str(param.to_string()),
            _ => {
                return Err(SysdevError::Marshal(format!(
                    "unsupported signature character '{sig}' in '{signature}'"
                )));
            }
        };
        args.push(arg);
    }
    trace!("Marshaled '{signature}' into {args:?}");
    Ok(Args(args))
}
