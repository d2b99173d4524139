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

//! Display brightness.
//!
//! Every operation first asks the daemon how many displays exist and rejects an index outside
//! `[0, count)`. Setters also read the maximum brightness and reject values above it, so an
//! invalid value never reaches the daemon.

use crate::comm::dbus::Transport;
use crate::config::{
    DISPLAY_INTERFACE, DISPLAY_PATH, METHOD_DISPLAY_COUNT, METHOD_GET_BRIGHTNESS,
    METHOD_GET_MAX_BRIGHTNESS, METHOD_HOLD_BRIGHTNESS, METHOD_RELEASE_BRIGHTNESS,
    METHOD_SET_BRIGHTNESS,
};
use crate::device::{DeviceClient, DeviceError};
use log::{debug, trace};

impl<T: Transport> DeviceClient<T> {
    async fn display_call(
        &self,
        method: &str,
        signature: &str,
        params: &[String],
    ) -> Result<i32, DeviceError> {
        self.call(DISPLAY_PATH, DISPLAY_INTERFACE, method, signature, params)
            .await
    }

    /// Number of displays the daemon manages.
    pub async fn display_count(&self) -> Result<usize, DeviceError> {
        let count = self.display_call(METHOD_DISPLAY_COUNT, "", &[]).await?;
        trace!("Daemon reports {count} displays");
        // check_value only lets non-negative values through
        Ok(count as usize)
    }

    async fn check_index(&self, index: usize) -> Result<(), DeviceError> {
        let count = self.display_count().await?;
        if index >= count {
            debug!("Display index {index} is out of range, {count} displays present");
            return Err(DeviceError::InvalidParameter("display index out of range"));
        }
        Ok(())
    }

    async fn check_brightness(&self, index: usize, value: i32) -> Result<(), DeviceError> {
        if value < 0 {
            return Err(DeviceError::InvalidParameter("brightness must not be negative"));
        }
        let max = self.max_brightness(index).await?;
        if value > max {
            debug!("Brightness {value} exceeds the maximum {max} of display {index}");
            return Err(DeviceError::InvalidParameter("brightness exceeds the maximum"));
        }
        Ok(())
    }

    /// Current brightness of display `index`.
    pub async fn brightness(&self, index: usize) -> Result<i32, DeviceError> {
        self.check_index(index).await?;
        self.display_call(METHOD_GET_BRIGHTNESS, "", &[]).await
    }

    /// Maximum brightness of display `index`.
    pub async fn max_brightness(&self, index: usize) -> Result<i32, DeviceError> {
        self.check_index(index).await?;
        self.display_call(METHOD_GET_MAX_BRIGHTNESS, "", &[]).await
    }

    /// Hold display `index` at `value` without touching the user setting.
    ///
    /// # Returns: `Result<(), DeviceError>`
    /// * `Ok(())` - The daemon holds the new brightness
    /// * `Err(DeviceError::InvalidParameter)` - Bad index, negative value or value above the maximum
    /// * `Err(DeviceError)` - The daemon failed the request
    pub async fn set_brightness(&self, index: usize, value: i32) -> Result<(), DeviceError> {
        self.check_brightness(index, value).await?;
        self.display_call(METHOD_HOLD_BRIGHTNESS, "i", &[value.to_string()])
            .await?;
        Ok(())
    }

    /// Release a held brightness so display `index` follows the user setting again.
    pub async fn set_brightness_from_settings(&self, index: usize) -> Result<(), DeviceError> {
        self.check_index(index).await?;
        self.display_call(METHOD_RELEASE_BRIGHTNESS, "", &[]).await?;
        Ok(())
    }

    /// Set display `index` to `value` and store it as the user setting.
    pub async fn set_brightness_to_settings(
        &self,
        index: usize,
        value: i32,
    ) -> Result<(), DeviceError> {
        self.check_brightness(index, value).await?;
        self.display_call(METHOD_SET_BRIGHTNESS, "i", &[value.to_string()])
            .await?;
        Ok(())
    }
}
