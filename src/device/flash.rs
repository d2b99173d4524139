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

//! Camera flash LED brightness.

use crate::comm::dbus::Transport;
use crate::config::{
    LED_INTERFACE, LED_PATH, METHOD_LED_GET_BRIGHTNESS, METHOD_LED_GET_MAX_BRIGHTNESS,
    METHOD_LED_SET_BRIGHTNESS,
};
use crate::device::{DeviceClient, DeviceError};
use log::debug;

impl<T: Transport> DeviceClient<T> {
    /// Current brightness of the camera flash.
    pub async fn flash_brightness(&self) -> Result<i32, DeviceError> {
        self.call(LED_PATH, LED_INTERFACE, METHOD_LED_GET_BRIGHTNESS, "", &[])
            .await
    }

    /// Maximum brightness of the camera flash.
    pub async fn flash_max_brightness(&self) -> Result<i32, DeviceError> {
        self.call(LED_PATH, LED_INTERFACE, METHOD_LED_GET_MAX_BRIGHTNESS, "", &[])
            .await
    }

    /// Set the camera flash to `value`, where 0 turns it off.
    ///
    /// # Returns: `Result<(), DeviceError>`
    /// * `Ok(())` - The flash was set
    /// * `Err(DeviceError::InvalidParameter)` - `value` is negative or above the maximum
    /// * `Err(DeviceError)` - The daemon failed the request
    pub async fn set_flash_brightness(&self, value: i32) -> Result<(), DeviceError> {
        if value < 0 {
            return Err(DeviceError::InvalidParameter("brightness must not be negative"));
        }
        let max = self.flash_max_brightness().await?;
        if value > max {
            debug!("Flash brightness {value} exceeds the maximum {max}");
            return Err(DeviceError::InvalidParameter("brightness exceeds the maximum"));
        }
        self.call(
            LED_PATH,
            LED_INTERFACE,
            METHOD_LED_SET_BRIGHTNESS,
            "i",
            &[value.to_string()],
        )
        .await?;
        Ok(())
    }
}
