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

//! Battery, display and camera flash commands.

use crate::{BatterySubcommand, DisplaySubcommand, FlashSubcommand};
use sysdev::config::DispatcherConfig;
use sysdev::device::{DeviceClient, DeviceError};

/// Argument parser for the battery command
pub async fn battery_handler(
    config: &DispatcherConfig,
    sub_command: &BatterySubcommand,
) -> Result<String, DeviceError> {
    let client = DeviceClient::connect(config);
    let msg = match *sub_command {
        BatterySubcommand::Full => client.battery_is_full().await?.to_string(),
        BatterySubcommand::Warning => client.battery_warning_status().await?.to_string(),
    };
    client.dispatcher().close().await;
    Ok(msg)
}

/// Argument parser for the display command
pub async fn display_handler(
    config: &DispatcherConfig,
    sub_command: &DisplaySubcommand,
) -> Result<String, DeviceError> {
    let client = DeviceClient::connect(config);
    let msg = match *sub_command {
        DisplaySubcommand::Count => client.display_count().await?.to_string(),
        DisplaySubcommand::Get { index } => client.brightness(index).await?.to_string(),
        DisplaySubcommand::Max { index } => client.max_brightness(index).await?.to_string(),
        DisplaySubcommand::Set { value, index } => {
            client.set_brightness(index, value).await?;
            format!("display {index} held at {value}")
        }
        DisplaySubcommand::Restore { index } => {
            client.set_brightness_from_settings(index).await?;
            format!("display {index} follows the user setting")
        }
        DisplaySubcommand::Save { value, index } => {
            client.set_brightness_to_settings(index, value).await?;
            format!("display {index} set to {value} and saved")
        }
    };
    client.dispatcher().close().await;
    Ok(msg)
}

/// Argument parser for the flash command
pub async fn flash_handler(
    config: &DispatcherConfig,
    sub_command: &FlashSubcommand,
) -> Result<String, DeviceError> {
    let client = DeviceClient::connect(config);
    let msg = match *sub_command {
        FlashSubcommand::Get => client.flash_brightness().await?.to_string(),
        FlashSubcommand::Max => client.flash_max_brightness().await?.to_string(),
        FlashSubcommand::Set { value } => {
            client.set_flash_brightness(value).await?;
            format!("flash set to {value}")
        }
    };
    client.dispatcher().close().await;
    Ok(msg)
}
