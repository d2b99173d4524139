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

//! Pooled proxies, one per (destination, object path, interface).
//!
//! A proxy is created the first time its triple is requested and reused afterwards. Every cached
//! proxy has a watcher task following the owner of its destination: when the owner changes, the
//! watcher only tombstones the node and asks the maintenance task for a sweep. The sweep is the
//! only place nodes leave the pool, so the pool is never mutated from inside a notification.
//!
//! Tombstoned nodes are skipped by lookups but their handles stay valid until the sweep, and
//! callers that already hold a handle keep it alive past the sweep.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use sysdev::comm::dbus::{ProxyCache, ZbusTransport};
//! # use sysdev::config::BusKind;
//! # async fn example() -> Result<(), sysdev::error::SysdevError> {
//! let cache = ProxyCache::open(ZbusTransport::new(BusKind::System));
//! let proxy = cache
//!     .acquire_proxy(
//!         "org.tizen.system.deviced",
//!         "/Org/Tizen/System/DeviceD/Display",
//!         "org.tizen.system.deviced.display",
//!     )
//!     .await?;
//! cache.close().await;
//! # Ok(())
//! # }
//! ```

use crate::comm::dbus::ProxyKey;
use crate::comm::dbus::transport::Transport;
use crate::error::SysdevError;
use futures::future::BoxFuture;
use log::{debug, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// One cached proxy.
struct ProxyNode<P> {
    key: ProxyKey,
    handle: P,
    tombstoned: Arc<AtomicBool>,
    watcher: JoinHandle<()>,
}

impl<P> ProxyNode<P> {
    fn is_tombstoned(&self) -> bool {
        self.tombstoned.load(Ordering::Acquire)
    }
}

impl<P> Drop for ProxyNode<P> {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

type ProxyPool<P> = Vec<ProxyNode<P>>;

/// Owner of every cached proxy.
///
/// All pool access goes through one async mutex, which also makes lookup and creation for a
/// triple a single step: two concurrent requests for a new triple create one proxy.
///
/// The mutex stays held while a missing proxy is created and subscribed to owner changes. A
/// first connection to an unresponsive bus therefore blocks every other acquisition and the
/// sweep until it completes or fails.
pub struct ProxyCache<T: Transport> {
    transport: Arc<T>,
    pool: Mutex<ProxyPool<T::Proxy>>,
    sweep_requests: mpsc::UnboundedSender<()>,
    maintenance: Option<JoinHandle<()>>,
    closed: AtomicBool,
}

impl<T: Transport> ProxyCache<T> {
    /// Create a cache over `transport` and start its maintenance task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(transport: T) -> Arc<Self> {
        Self::build(transport, true)
    }

    pub(crate) fn build(transport: T, with_maintenance: bool) -> Arc<Self> {
        let (sweep_requests, mut sweep_rx) = mpsc::unbounded_channel::<()>();
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let maintenance = with_maintenance.then(|| {
                let weak = weak.clone();
                tokio::spawn(async move {
                    while sweep_rx.recv().await.is_some() {
                        // Several owners may vanish together; one sweep covers them all.
                        while sweep_rx.try_recv().is_ok() {}
                        let Some(cache) = weak.upgrade() else {
                            break;
                        };
                        cache.sweep_tombstones().await;
                    }
                    trace!("Proxy cache maintenance stopped");
                })
            });
            ProxyCache {
                transport: Arc::new(transport),
                pool: Mutex::new(Vec::new()),
                sweep_requests,
                maintenance,
                closed: AtomicBool::new(false),
            }
        })
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Get the cached proxy for the triple, creating and caching it on a miss.
    ///
    /// # Returns: `Result<T::Proxy, SysdevError>`
    /// * `Ok(T::Proxy)` - The cached handle, or a new one if no live node matched
    /// * `Err(SysdevError::Argument)` - One of the three names is empty; nothing was attempted
    /// * `Err(SysdevError::Closed)` - [`close`](Self::close) was called
    /// * `Err(SysdevError::Bus)` - Connecting or creating the proxy failed; the pool is unchanged
    pub async fn acquire_proxy(
        &self,
        destination: &str,
        object_path: &str,
        interface: &str,
    ) -> Result<T::Proxy, SysdevError> {
        let key = ProxyKey::new(destination, object_path, interface)?;

        let mut pool = self.pool.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(SysdevError::Closed);
        }
        if let Some(node) = pool
            .iter()
            .find(|node| !node.is_tombstoned() && node.key.matches(&key))
        {
            trace!("Reusing cached proxy for {key}");
            return Ok(node.handle.clone());
        }

        let handle = self.transport.create_proxy(&key).await?;
        // Subscribe before the node is visible, so no owner change can slip past it.
        let owner_changed = self.transport.owner_changed(&handle).await;
        let tombstoned = Arc::new(AtomicBool::new(false));
        let watcher = self.watch_owner(&key, owner_changed, tombstoned.clone());
        debug!("Cached new proxy for {key}");
        pool.push(ProxyNode {
            key,
            handle: handle.clone(),
            tombstoned,
            watcher,
        });
        Ok(handle)
    }

    fn watch_owner(
        &self,
        key: &ProxyKey,
        owner_changed: BoxFuture<'static, ()>,
        tombstoned: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let sweep_requests = self.sweep_requests.clone();
        let key = key.clone();
        tokio::spawn(async move {
            owner_changed.await;
            debug!("Owner of {} changed, tombstoning proxy {key}", key.destination);
            tombstoned.store(true, Ordering::Release);
            if sweep_requests.send(()).is_err() {
                trace!("No maintenance task to reclaim {key}");
            }
        })
    }

    /// Remove and release every tombstoned node. Live nodes are left untouched.
    ///
    /// # Returns: `usize`
    /// * Number of nodes released
    pub async fn sweep_tombstones(&self) -> usize {
        let mut pool = self.pool.lock().await;
        let (dead, live): (ProxyPool<T::Proxy>, ProxyPool<T::Proxy>) =
            std::mem::take(&mut *pool)
                .into_iter()
                .partition(ProxyNode::is_tombstoned);
        *pool = live;
        for node in &dead {
            debug!("Releasing proxy {}", node.key);
        }
        dead.len()
    }

    /// Number of nodes in the pool, tombstoned ones included.
    pub async fn cached_count(&self) -> usize {
        self.pool.lock().await.len()
    }

    /// Number of nodes waiting for the next sweep.
    pub async fn tombstoned_count(&self) -> usize {
        self.pool
            .lock()
            .await
            .iter()
            .filter(|node| node.is_tombstoned())
            .count()
    }

    /// Stop the maintenance and watcher tasks and release every cached proxy.
    ///
    /// Later acquisitions fail with [`SysdevError::Closed`].
    pub async fn close(&self) {
        let mut pool = self.pool.lock().await;
        self.closed.store(true, Ordering::Release);
        if let Some(maintenance) = &self.maintenance {
            maintenance.abort();
        }
        debug!("Closing proxy cache, releasing {} proxies", pool.len());
        pool.clear();
    }
}

impl<T: Transport> Drop for ProxyCache<T> {
    fn drop(&mut self) {
        if let Some(maintenance) = &self.maintenance {
            maintenance.abort();
        }
        self.pool.get_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::dbus::fake_transport::{FakeTransport, eventually};
    use googletest::prelude::*;
    use rstest::*;

    const DEST: &str = "org.tizen.system.deviced";
    const PATH: &str = "/Org/Tizen/System/DeviceD/Display";
    const IFACE: &str = "org.tizen.system.deviced.display";

    #[gtest]
    #[tokio::test]
    async fn repeated_acquire_reuses_the_proxy() {
        let cache = ProxyCache::open(FakeTransport::new());
        let first = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        let second = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        assert_that!(Arc::ptr_eq(&first, &second), eq(true));
        assert_that!(cache.transport().connects(), eq(1));
        assert_that!(cache.cached_count().await, eq(1));
    }

    #[gtest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_acquisitions_create_one_proxy() {
        let cache = ProxyCache::open(FakeTransport::new());
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.acquire_proxy(DEST, PATH, IFACE).await })
            })
            .collect();
        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap().unwrap());
        }
        assert_that!(
            handles.iter().all(|handle| Arc::ptr_eq(handle, &handles[0])),
            eq(true)
        );
        assert_that!(cache.transport().connects(), eq(1));
        assert_that!(cache.cached_count().await, eq(1));
    }

    #[gtest]
    #[tokio::test]
    async fn owner_changes_are_followed_from_the_moment_a_proxy_is_cached() {
        let cache = ProxyCache::build(FakeTransport::new(), false);
        cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        // No yield since the acquisition: the watcher task has not run yet.
        assert_that!(cache.transport().subscriptions(), eq(1));
        cache.transport().change_owner(DEST);
        eventually!(cache.tombstoned_count().await == 1);
    }

    #[gtest]
    #[tokio::test]
    async fn distinct_triples_get_distinct_proxies() {
        let cache = ProxyCache::open(FakeTransport::new());
        let display = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        let led = cache
            .acquire_proxy(DEST, "/Org/Tizen/System/DeviceD/Led", "org.tizen.system.deviced.Led")
            .await
            .unwrap();
        assert_that!(Arc::ptr_eq(&display, &led), eq(false));
        assert_that!(cache.transport().connects(), eq(2));
    }

    #[gtest]
    #[tokio::test]
    #[rstest]
    #[case::no_destination("", PATH, IFACE)]
    #[case::no_path(DEST, "", IFACE)]
    #[case::no_interface(DEST, PATH, "")]
    async fn empty_names_never_reach_the_transport(
        #[case] destination: &str,
        #[case] path: &str,
        #[case] interface: &str,
    ) {
        let cache = ProxyCache::open(FakeTransport::new());
        let result = cache.acquire_proxy(destination, path, interface).await;
        assert_that!(
            result.map(|_| ()),
            err(displays_as(contains_substring("SysdevError::Argument")))
        );
        assert_that!(cache.transport().connects(), eq(0));
    }

    #[gtest]
    #[tokio::test]
    async fn failed_connection_leaves_pool_unchanged() {
        let cache = ProxyCache::open(FakeTransport::new());
        cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        cache.transport().fail_connections(true);
        let result = cache.acquire_proxy(DEST, "/other", IFACE).await;
        assert_that!(
            result.map(|_| ()),
            err(displays_as(contains_substring("SysdevError::Bus")))
        );
        assert_that!(cache.cached_count().await, eq(1));
    }

    #[gtest]
    #[tokio::test]
    async fn owner_change_only_tombstones_until_swept() {
        let cache = ProxyCache::build(FakeTransport::new(), false);
        let stale = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        cache.transport().change_owner(DEST);
        eventually!(cache.tombstoned_count().await == 1);
        assert_that!(cache.cached_count().await, eq(1));

        // A tombstoned node is never handed out again, even before the sweep.
        let fresh = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        assert_that!(Arc::ptr_eq(&stale, &fresh), eq(false));
        assert_that!(cache.transport().connects(), eq(2));

        assert_that!(cache.sweep_tombstones().await, eq(1));
        assert_that!(cache.cached_count().await, eq(1));
        assert_that!(cache.tombstoned_count().await, eq(0));
    }

    #[gtest]
    #[tokio::test]
    async fn maintenance_reclaims_after_owner_change() {
        let cache = ProxyCache::open(FakeTransport::new());
        let stale = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        cache
            .acquire_proxy(DEST, "/Org/Tizen/System/DeviceD/Led", "org.tizen.system.deviced.Led")
            .await
            .unwrap();
        cache
            .acquire_proxy("org.freedesktop.UPower", "/org/freedesktop/UPower", "org.freedesktop.UPower")
            .await
            .unwrap();

        cache.transport().change_owner(DEST);
        eventually!(cache.cached_count().await == 1);

        let fresh = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        assert_that!(Arc::ptr_eq(&stale, &fresh), eq(false));
        assert_that!(cache.transport().connects(), eq(4));
        assert_that!(cache.cached_count().await, eq(2));
    }

    #[gtest]
    #[tokio::test]
    async fn sweep_on_empty_pool_is_a_no_op() {
        let cache = ProxyCache::build(FakeTransport::new(), false);
        assert_that!(cache.sweep_tombstones().await, eq(0));
        assert_that!(cache.cached_count().await, eq(0));
    }

    #[gtest]
    #[tokio::test]
    async fn sweep_without_tombstones_keeps_live_nodes() {
        let cache = ProxyCache::build(FakeTransport::new(), false);
        let first = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        cache.acquire_proxy(DEST, "/other", IFACE).await.unwrap();
        assert_that!(cache.sweep_tombstones().await, eq(0));
        assert_that!(cache.cached_count().await, eq(2));
        let again = cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        assert_that!(Arc::ptr_eq(&first, &again), eq(true));
        assert_that!(cache.transport().connects(), eq(2));
    }

    #[gtest]
    #[tokio::test]
    async fn closed_cache_rejects_acquisition() {
        let cache = ProxyCache::open(FakeTransport::new());
        cache.acquire_proxy(DEST, PATH, IFACE).await.unwrap();
        cache.close().await;
        assert_that!(cache.cached_count().await, eq(0));
        let result = cache.acquire_proxy(DEST, PATH, IFACE).await;
        assert_that!(
            result.map(|_| ()),
            err(displays_as(contains_substring("SysdevError::Closed")))
        );
        assert_that!(cache.transport().connects(), eq(1));
    }
}
