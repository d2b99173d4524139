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

//! Raw method calls through the sysdev dispatcher.

use crate::CallArgs;
use log::debug;
use sysdev::comm::dbus::Dispatcher;
use sysdev::comm::dbus::dispatcher::reply_code;
use sysdev::config::DispatcherConfig;
use sysdev::error::SysdevError;
use zbus::Message;

/// Calls the method and returns the integer it answered with.
pub async fn call_handler(
    config: &DispatcherConfig,
    args: &CallArgs,
) -> Result<String, SysdevError> {
    let dispatcher = Dispatcher::connect(config);
    let value = dispatcher
        .call_sync(
            &args.destination,
            &args.path,
            &args.interface,
            &args.method,
            &args.signature,
            args.params.as_slice(),
        )
        .await?;
    dispatcher.close().await;
    Ok(value.to_string())
}

/// Issues the method asynchronously and waits for its completion.
pub async fn call_async_handler(
    config: &DispatcherConfig,
    args: &CallArgs,
) -> Result<String, SysdevError> {
    let dispatcher = Dispatcher::connect(config);
    let completion = dispatcher
        .call_async_reply(
            &args.destination,
            &args.path,
            &args.interface,
            &args.method,
            &args.signature,
            args.params.as_slice(),
        )
        .await?;
    debug!("{} issued, waiting for its completion", args.method);
    let reply = completion
        .await
        .map_err(|_| SysdevError::Internal("completion dropped before the reply".into()))??;
    dispatcher.close().await;
    Ok(describe_reply(&reply))
}

/// Formats a reply as `signature: value`, falling back to the signature alone.
fn describe_reply(reply: &Message) -> String {
    let signature = reply.body().signature().to_string();
    match reply_code(reply) {
        Ok(code) => format!("{signature}: {code}"),
        Err(_) => format!("reply with signature '{signature}'"),
    }
}
