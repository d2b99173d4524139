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

//! Battery charge state and warning level.

use crate::comm::dbus::Transport;
use crate::config::{BATTERY_INTERFACE, BATTERY_PATH, METHOD_BATTERY_IS_FULL, METHOD_BATTERY_LEVEL};
use crate::device::{DeviceClient, DeviceError};
use log::{error, trace};
use std::fmt;

/// Battery warning level reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryWarning {
    Empty,
    Critical,
    Low,
    Normal,
    Full,
}

impl TryFrom<i32> for BatteryWarning {
    type Error = DeviceError;

    /// Levels as the daemon numbers them: 1 is power off, 5 is full.
    fn try_from(level: i32) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(BatteryWarning::Empty),
            2 => Ok(BatteryWarning::Critical),
            3 => Ok(BatteryWarning::Low),
            4 => Ok(BatteryWarning::Normal),
            5 => Ok(BatteryWarning::Full),
            _ => {
                error!("Unknown battery level {level}");
                Err(DeviceError::OperationFailed)
            }
        }
    }
}

impl fmt::Display for BatteryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatteryWarning::Empty => "empty",
            BatteryWarning::Critical => "critical",
            BatteryWarning::Low => "low",
            BatteryWarning::Normal => "normal",
            BatteryWarning::Full => "full",
        };
        f.write_str(name)
    }
}

impl<T: Transport> DeviceClient<T> {
    /// Whether the battery is fully charged.
    ///
    /// # Returns: `Result<bool, DeviceError>`
    /// * `Ok(true)` - The daemon answered 1
    /// * `Ok(false)` - The daemon answered any other non-negative value
    /// * `Err(DeviceError)` - The daemon failed the request or answered a negative value
    pub async fn battery_is_full(&self) -> Result<bool, DeviceError> {
        let full = self
            .call(BATTERY_PATH, BATTERY_INTERFACE, METHOD_BATTERY_IS_FULL, "", &[])
            .await?;
        trace!("Battery full state: {full}");
        Ok(full == 1)
    }

    /// Current battery warning level.
    pub async fn battery_warning_status(&self) -> Result<BatteryWarning, DeviceError> {
        let level = self
            .call(BATTERY_PATH, BATTERY_INTERFACE, METHOD_BATTERY_LEVEL, "", &[])
            .await?;
        BatteryWarning::try_from(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::dbus::fake_transport::{FakeReply, FakeTransport};
    use crate::comm::dbus::{Dispatcher, ProxyCache};
    use crate::error::{EACCES, ENODEV};
    use googletest::prelude::*;
    use rstest::*;
    use std::sync::Arc;

    fn battery_client(transport: FakeTransport) -> DeviceClient<FakeTransport> {
        DeviceClient::new(Arc::new(Dispatcher::new(ProxyCache::open(transport), 4)))
    }

    #[gtest]
    #[tokio::test]
    #[rstest]
    #[case::full(1, Ok(true))]
    #[case::charging(0, Ok(false))]
    #[case::other_positive(2, Ok(false))]
    #[case::no_battery(-ENODEV, Err(DeviceError::NotSupported))]
    #[case::denied(-EACCES, Err(DeviceError::PermissionDenied))]
    #[case::failed(-1, Err(DeviceError::OperationFailed))]
    async fn is_full_checks_the_daemon_answer(
        #[case] answer: i32,
        #[case] exp: Result<bool, DeviceError>,
    ) {
        let client =
            battery_client(FakeTransport::new().reply("IsFull", FakeReply::Value(answer)));
        assert_that!(client.battery_is_full().await, eq(&exp));
        let calls = client.dispatcher().cache().transport().calls();
        assert_that!(calls.len(), eq(1));
        assert_that!(calls[0].key.object_path.as_str(), eq(BATTERY_PATH));
        assert_that!(calls[0].key.interface.as_str(), eq(BATTERY_INTERFACE));
    }

    #[gtest]
    #[tokio::test]
    async fn is_full_without_battery_service_is_not_supported() {
        let client = battery_client(FakeTransport::new());
        assert_that!(
            client.battery_is_full().await,
            err(eq(&DeviceError::NotSupported))
        );
    }

    #[gtest]
    #[tokio::test]
    #[rstest]
    #[case::empty(1, BatteryWarning::Empty)]
    #[case::critical(2, BatteryWarning::Critical)]
    #[case::low(3, BatteryWarning::Low)]
    #[case::normal(4, BatteryWarning::Normal)]
    #[case::full(5, BatteryWarning::Full)]
    async fn warning_status_maps_levels(#[case] level: i32, #[case] exp: BatteryWarning) {
        let client = battery_client(
            FakeTransport::new().reply("GetBatteryLevel", FakeReply::Value(level)),
        );
        assert_that!(client.battery_warning_status().await, ok(eq(&exp)));
    }

    #[gtest]
    #[tokio::test]
    #[rstest]
    #[case::zero(0)]
    #[case::above_full(6)]
    async fn unknown_level_is_an_operation_failure(#[case] level: i32) {
        let client = battery_client(
            FakeTransport::new().reply("GetBatteryLevel", FakeReply::Value(level)),
        );
        assert_that!(
            client.battery_warning_status().await,
            err(eq(&DeviceError::OperationFailed))
        );
    }
}
