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

//! The seam between the proxy cache/dispatcher and the message bus.
//!
//! [`ZbusTransport`] is the production implementation. It connects lazily to the configured bus
//! the first time a proxy is needed and hands out `zbus::Proxy` handles.

use crate::comm::dbus::ProxyKey;
use crate::comm::dbus::marshal::Args;
use crate::config::BusKind;
use crate::error::SysdevError;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use log::{debug, trace, warn};
use std::future::{Future, pending};
use std::pin::pin;
use tokio::sync::OnceCell;
use zbus::{Connection, Message, Proxy};

/// What the proxy cache and dispatcher need from a bus connection.
///
/// Calls have no timeout: a method call resolves when the remote side answers or the transport
/// itself fails.
pub trait Transport: Send + Sync + 'static {
    /// Transport-side handle to one remote interface. Clones share the same underlying proxy.
    type Proxy: Clone + Send + Sync + 'static;

    /// Create a proxy for `key`, connecting to the bus first if needed.
    fn create_proxy(
        &self,
        key: &ProxyKey,
    ) -> impl Future<Output = Result<Self::Proxy, SysdevError>> + Send;

    /// Issue `method` through `proxy` and wait for the reply message.
    fn call(
        &self,
        proxy: &Self::Proxy,
        method: &str,
        args: &Args,
    ) -> impl Future<Output = Result<Message, zbus::Error>> + Send;

    /// Subscribe to owner changes of the proxy's destination.
    ///
    /// The subscription is in place once the outer future resolves. The returned future then
    /// resolves on the first owner change after that point.
    fn owner_changed(
        &self,
        proxy: &Self::Proxy,
    ) -> impl Future<Output = BoxFuture<'static, ()>> + Send;
}

/// [`Transport`] over a `zbus` connection to the system or session bus.
#[derive(Debug)]
pub struct ZbusTransport {
    bus: BusKind,
    connection: OnceCell<Connection>,
}

impl ZbusTransport {
    pub fn new(bus: BusKind) -> Self {
        ZbusTransport {
            bus,
            connection: OnceCell::new(),
        }
    }

    async fn connection(&self) -> Result<&Connection, SysdevError> {
        self.connection
            .get_or_try_init(|| async {
                debug!("Connecting to the {:?} bus", self.bus);
                let connection = match self.bus {
                    BusKind::System => Connection::system().await,
                    BusKind::Session => Connection::session().await,
                }?;
                Ok(connection)
            })
            .await
    }
}

impl Transport for ZbusTransport {
    type Proxy = Proxy<'static>;

    async fn create_proxy(&self, key: &ProxyKey) -> Result<Proxy<'static>, SysdevError> {
        let connection = self.connection().await?;
        trace!("Creating proxy for {key}");
        let proxy = Proxy::new(
            connection,
            key.destination.clone(),
            key.object_path.clone(),
            key.interface.clone(),
        )
        .await?;
        Ok(proxy)
    }

    async fn call(
        &self,
        proxy: &Proxy<'static>,
        method: &str,
        args: &Args,
    ) -> Result<Message, zbus::Error> {
        match args.to_structure()? {
            Some(body) => proxy.call_method(method, &body).await,
            None => proxy.call_method(method, &()).await,
        }
    }

    async fn owner_changed(&self, proxy: &Proxy<'static>) -> BoxFuture<'static, ()> {
        let destination = proxy.destination().to_owned();
        match proxy.receive_owner_changed().await {
            Ok(changes) => async move {
                let mut changes = pin!(changes);
                let owner = changes.next().await;
                trace!("Owner of {destination} is now {owner:?}");
            }
            .boxed(),
            Err(e) => {
                warn!("Cannot follow the owner of {destination}, its proxy stays cached: {e}");
                pending::<()>().boxed()
            }
        }
    }
}
