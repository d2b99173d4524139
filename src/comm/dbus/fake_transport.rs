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

//! In-memory [`Transport`] for unit tests.
//!
//! Counts proxy creations, records every call, answers from scripted replies and lets a test
//! change the owner of a destination.

use crate::comm::dbus::ProxyKey;
use crate::comm::dbus::marshal::Args;
use crate::comm::dbus::transport::Transport;
use crate::error::SysdevError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use zbus::Message;

/// Poll an async condition until it holds, failing the test after about a second.
macro_rules! eventually {
    ($cond:expr) => {{
        let mut attempts = 0;
        while !$cond {
            attempts += 1;
            assert!(
                attempts < 200,
                "condition never held: {}",
                stringify!($cond)
            );
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }};
}
pub(crate) use eventually;

#[derive(Debug)]
pub(crate) struct FakeProxyInner {
    pub key: ProxyKey,
    owner_changed: Notify,
}

pub(crate) type FakeProxy = Arc<FakeProxyInner>;

#[derive(Debug, Clone)]
pub(crate) enum FakeReply {
    Value(i32),
    Text(String),
    Error(String),
    Delayed(Duration, i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub key: ProxyKey,
    pub method: String,
    pub args: Args,
}

#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    connects: AtomicUsize,
    subscriptions: AtomicUsize,
    fail_connections: AtomicBool,
    proxies: Mutex<Vec<FakeProxy>>,
    replies: Mutex<HashMap<String, FakeReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply for `method`, optionally qualified as `interface.method`.
    pub fn reply(self, method: &str, reply: FakeReply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(method.to_string(), reply);
        self
    }

    pub fn set_reply(&self, method: &str, reply: FakeReply) {
        self.replies
            .lock()
            .unwrap()
            .insert(method.to_string(), reply);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of owner-change subscriptions taken so far.
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn fail_connections(&self, fail: bool) {
        self.fail_connections.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.method).collect()
    }

    /// Fire the owner-changed notification of every proxy addressed to `destination`.
    pub fn change_owner(&self, destination: &str) {
        for proxy in self.proxies.lock().unwrap().iter() {
            if proxy.key.destination == destination {
                proxy.owner_changed.notify_one();
            }
        }
    }

    fn scripted(&self, key: &ProxyKey, method: &str) -> Option<FakeReply> {
        let replies = self.replies.lock().unwrap();
        replies
            .get(&format!("{}.{method}", key.interface))
            .or_else(|| replies.get(method))
            .cloned()
    }
}

fn reply_message<B>(body: &B) -> Result<Message, zbus::Error>
where
    B: serde::Serialize + zbus::zvariant::DynamicType,
{
    Message::method_call("/", "Reply")?.build(body)
}

/// Error reply named `name`, surfaced the way a zbus proxy surfaces one.
fn error_for(name: &str) -> zbus::Error {
    let reply = Message::method_call("/", "Call")
        .and_then(|call| call.build(&()))
        .and_then(|call| Message::error(&call.header(), name)?.build(&(name,)));
    match reply {
        Ok(reply) => zbus::Error::from(reply),
        Err(e) => e,
    }
}

impl Transport for FakeTransport {
    type Proxy = FakeProxy;

    async fn create_proxy(&self, key: &ProxyKey) -> Result<FakeProxy, SysdevError> {
        if self.fail_connections.load(Ordering::SeqCst) {
            return Err(zbus::Error::Failure("bus unavailable".into()).into());
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let proxy = Arc::new(FakeProxyInner {
            key: key.clone(),
            owner_changed: Notify::new(),
        });
        self.proxies.lock().unwrap().push(proxy.clone());
        Ok(proxy)
    }

    fn call(
        &self,
        proxy: &FakeProxy,
        method: &str,
        args: &Args,
    ) -> impl Future<Output = Result<Message, zbus::Error>> + Send {
        self.calls.lock().unwrap().push(RecordedCall {
            key: proxy.key.clone(),
            method: method.to_string(),
            args: args.clone(),
        });
        let (delay, result) = match self.scripted(&proxy.key, method) {
            Some(FakeReply::Value(v)) => (None, reply_message(&v)),
            Some(FakeReply::Text(s)) => (None, reply_message(&s)),
            Some(FakeReply::Error(name)) => (None, Err(error_for(&name))),
            Some(FakeReply::Delayed(d, v)) => (Some(d), reply_message(&v)),
            None => (
                None,
                Err(error_for("org.freedesktop.DBus.Error.UnknownMethod")),
            ),
        };
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }

    async fn owner_changed(&self, proxy: &FakeProxy) -> BoxFuture<'static, ()> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let proxy = proxy.clone();
        async move { proxy.owner_changed.notified().await }.boxed()
    }
}
