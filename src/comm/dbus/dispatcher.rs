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

//! Method calls through cached proxies.
//!
//! [`Dispatcher::call_sync`] waits for the reply and returns the integer it carries.
//! [`Dispatcher::call_async`] returns as soon as the call is issued and delivers the outcome to
//! a completion callback exactly once. Neither path has a timeout.
//!
//! A completion callback runs on a runtime worker. On a current-thread runtime, awaiting
//! `call_sync` from inside a callback can never complete; callbacks should hand their result off
//! instead of issuing further synchronous calls.

use crate::comm::dbus::marshal::marshal;
use crate::comm::dbus::proxy_cache::ProxyCache;
use crate::comm::dbus::transport::{Transport, ZbusTransport};
use crate::config::DispatcherConfig;
use crate::error::SysdevError;
use log::{error, trace};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};
use zbus::Message;

/// Completion callback of an asynchronous call. Receives the reply message or the error.
pub type PendingCallback = Box<dyn FnOnce(Result<Message, SysdevError>) + Send + 'static>;

/// State of one in-flight asynchronous call, consumed by its completion.
struct PendingCall {
    method: String,
    callback: Option<PendingCallback>,
    permit: OwnedSemaphorePermit,
}

impl PendingCall {
    fn complete(self, result: Result<Message, SysdevError>) {
        let PendingCall {
            method,
            callback,
            permit,
        } = self;
        drop(permit);
        match callback {
            Some(callback) => callback(result),
            None => trace!("{method} completed without a callback: {result:?}"),
        }
    }
}

/// Read the single `int32` a method reply carries.
pub fn reply_code(reply: &Message) -> Result<i32, SysdevError> {
    Ok(reply.body().deserialize::<i32>()?)
}

pub struct Dispatcher<T: Transport> {
    cache: Arc<ProxyCache<T>>,
    pending: Arc<Semaphore>,
    max_pending_calls: usize,
}

impl Dispatcher<ZbusTransport> {
    /// Dispatcher over the bus named in `config`. Must be called from within a tokio runtime.
    pub fn connect(config: &DispatcherConfig) -> Self {
        Dispatcher::new(
            ProxyCache::open(ZbusTransport::new(config.bus)),
            config.max_pending_calls,
        )
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(cache: Arc<ProxyCache<T>>, max_pending_calls: usize) -> Self {
        Dispatcher {
            cache,
            pending: Arc::new(Semaphore::new(max_pending_calls)),
            max_pending_calls,
        }
    }

    pub fn cache(&self) -> &Arc<ProxyCache<T>> {
        &self.cache
    }

    async fn acquire(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        method: &str,
    ) -> Result<T::Proxy, SysdevError> {
        self.cache
            .acquire_proxy(destination, path, interface)
            .await
            .inspect_err(|e| {
                error!(
                    "fail to get proxy from proxy pool : {interface}-{method} ({}: {e})",
                    e.errno()
                )
            })
    }

    /// Call `method` and wait for its reply.
    ///
    /// # Arguments
    ///
    /// * `signature` - One character per parameter, from `i`, `u`, `t` and `s`
    /// * `params` - String form of each parameter, in signature order
    ///
    /// # Returns: `Result<i32, SysdevError>`
    /// * `Ok(i32)` - The integer carried by the reply, returned verbatim
    /// * `Err(SysdevError::Argument)` - Empty destination, path or interface
    /// * `Err(SysdevError::Marshal)` - Signature and parameters do not agree; nothing was sent
    /// * `Err(SysdevError::Bus)` - Transport or remote failure; see [`SysdevError::errno`]
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use sysdev::comm::dbus::Dispatcher;
    /// # use sysdev::config::DispatcherConfig;
    /// # async fn example() -> Result<(), sysdev::error::SysdevError> {
    /// let dispatcher = Dispatcher::connect(&DispatcherConfig::default());
    /// let brightness = dispatcher
    ///     .call_sync(
    ///         "org.tizen.system.deviced",
    ///         "/Org/Tizen/System/DeviceD/Display",
    ///         "org.tizen.system.deviced.display",
    ///         "HoldBrightness",
    ///         "i",
    ///         &["80"],
    ///     )
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call_sync<S: AsRef<str>>(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        method: &str,
        signature: &str,
        params: &[S],
    ) -> Result<i32, SysdevError> {
        let proxy = self.acquire(destination, path, interface, method).await?;
        let args = marshal(signature, params)?;
        let reply = self
            .cache
            .transport()
            .call(&proxy, method, &args)
            .await
            .map_err(|e| {
                let e = SysdevError::from(e);
                error!("method call error : {interface}-{method} ({}: {e})", e.errno());
                e
            })?;
        reply_code(&reply)
    }

    /// Issue `method` without waiting for the reply.
    ///
    /// Returns once the call is on its way. The outcome goes to `callback` only, exactly once.
    /// When `callback` is `None` the call is still made and its outcome is only logged.
    ///
    /// # Returns: `Result<(), SysdevError>`
    /// * `Ok(())` - The call was issued
    /// * `Err(SysdevError::Argument)` / `Err(SysdevError::Bus)` - No proxy; callback not scheduled
    /// * `Err(SysdevError::Marshal)` - Signature and parameters do not agree; callback not scheduled
    /// * `Err(SysdevError::PendingCalls)` - Too many calls in flight; callback not scheduled
    #[allow(clippy::too_many_arguments)]
    pub async fn call_async<S: AsRef<str>>(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        method: &str,
        signature: &str,
        params: &[S],
        callback: Option<PendingCallback>,
    ) -> Result<(), SysdevError> {
        let proxy = self.acquire(destination, path, interface, method).await?;
        let args = marshal(signature, params)?;
        let permit = self.pending.clone().try_acquire_owned().map_err(|_| {
            error!("cannot start {interface}-{method}: no free pending call slot");
            SysdevError::PendingCalls(self.max_pending_calls)
        })?;

        let pending = PendingCall {
            method: method.to_string(),
            callback,
            permit,
        };
        let transport = self.cache.transport().clone();
        let interface = interface.to_string();
        let method = method.to_string();
        tokio::spawn(async move {
            let result = transport
                .call(&proxy, &method, &args)
                .await
                .map_err(SysdevError::from);
            if let Err(e) = &result {
                error!("method call error : {interface}-{method} ({}: {e})", e.errno());
            }
            pending.complete(result);
        });
        Ok(())
    }

    /// [`call_async`](Self::call_async) with the outcome delivered through a channel.
    pub async fn call_async_reply<S: AsRef<str>>(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        method: &str,
        signature: &str,
        params: &[S],
    ) -> Result<oneshot::Receiver<Result<Message, SysdevError>>, SysdevError> {
        let (tx, rx) = oneshot::channel();
        let callback: PendingCallback = Box::new(move |result| {
            if tx.send(result).is_err() {
                trace!("Reply receiver dropped before completion");
            }
        });
        self.call_async(
            destination,
            path,
            interface,
            method,
            signature,
            params,
            Some(callback),
        )
        .await?;
        Ok(rx)
    }

    /// Release every cached proxy. See [`ProxyCache::close`].
    pub async fn close(&self) {
        self.cache.close().await;
    }
}
