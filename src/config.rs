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

//! Well-known bus names and the optional dispatcher configuration file.
//!
//! Values are hardcoded and can be overridden through `/etc/sysdev/config.toml`:
//!
//! ```toml
//! [dispatcher]
//! bus = "session"
//! max_pending_calls = 64
//! ```

use crate::error::SysdevError;
use log::{trace, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Location of the optional configuration file.
pub static CONFIG_PATH: &str = "/etc/sysdev/config.toml";

/// Max length in bytes of a bus name or interface name. Object paths are unbounded.
pub const DBUS_MAXIMUM_NAME_LENGTH: usize = 255;

pub const DEFAULT_MAX_PENDING_CALLS: usize = 256;

pub static DEVICED_BUS_NAME: &str = "org.tizen.system.deviced";

pub static DISPLAY_PATH: &str = "/Org/Tizen/System/DeviceD/Display";
pub static DISPLAY_INTERFACE: &str = "org.tizen.system.deviced.display";
pub static METHOD_DISPLAY_COUNT: &str = "GetDisplayCount";
pub static METHOD_GET_BRIGHTNESS: &str = "GetBrightness";
pub static METHOD_GET_MAX_BRIGHTNESS: &str = "GetMaxBrightness";
pub static METHOD_HOLD_BRIGHTNESS: &str = "HoldBrightness";
pub static METHOD_RELEASE_BRIGHTNESS: &str = "ReleaseBrightness";
pub static METHOD_SET_BRIGHTNESS: &str = "SetBrightness";

pub static LED_PATH: &str = "/Org/Tizen/System/DeviceD/Led";
pub static LED_INTERFACE: &str = "org.tizen.system.deviced.Led";
pub static METHOD_LED_GET_BRIGHTNESS: &str = "GetBrightnessForCamera";
pub static METHOD_LED_GET_MAX_BRIGHTNESS: &str = "GetMaxBrightness";
pub static METHOD_LED_SET_BRIGHTNESS: &str = "SetBrightness";

pub static BATTERY_PATH: &str = "/Org/Tizen/System/DeviceD/Battery";
pub static BATTERY_INTERFACE: &str = "org.tizen.system.deviced.Battery";
pub static METHOD_BATTERY_IS_FULL: &str = "IsFull";
pub static METHOD_BATTERY_LEVEL: &str = "GetBatteryLevel";

/// Which message bus the dispatcher talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    System,
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub bus: BusKind,
    /// Upper bound on asynchronous calls waiting for their completion.
    pub max_pending_calls: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            bus: BusKind::System,
            max_pending_calls: DEFAULT_MAX_PENDING_CALLS,
        }
    }
}

/// This is the top level struct which holds all sections
#[derive(Debug, Deserialize)]
struct TomlConfig {
    dispatcher: Option<DispatcherToml>,
}

#[derive(Debug, Deserialize)]
struct DispatcherToml {
    bus: Option<BusKind>,
    max_pending_calls: Option<usize>,
}

impl From<DispatcherToml> for DispatcherConfig {
    fn from(value: DispatcherToml) -> Self {
        trace!("User provided config: {value:?}");
        let defaults = DispatcherConfig::default();
        DispatcherConfig {
            bus: value.bus.unwrap_or_else(|| {
                trace!("No bus provided. Using hardcoded value.");
                defaults.bus
            }),
            max_pending_calls: match value.max_pending_calls {
                Some(0) => {
                    warn!("max_pending_calls of 0 would reject every call. Using hardcoded value.");
                    defaults.max_pending_calls
                }
                Some(n) => n,
                None => defaults.max_pending_calls,
            },
        }
    }
}

/// Parse the contents of a configuration file.
///
/// A file without a `[dispatcher]` section yields the defaults.
pub fn parse_config(toml_string: &str, file: &Path) -> Result<DispatcherConfig, SysdevError> {
    let config: TomlConfig = toml::from_str(toml_string).map_err(|e| SysdevError::Config {
        file: file.to_path_buf(),
        e,
    })?;
    match config.dispatcher {
        Some(dispatcher) => Ok(dispatcher.into()),
        None => {
            warn!("{file:?} did not contain a `[dispatcher]` section. Using hardcoded defaults.");
            Ok(DispatcherConfig::default())
        }
    }
}

/// Read the configuration from `config_path`.
pub fn config_from_file(config_path: &Path) -> Result<DispatcherConfig, SysdevError> {
    if !config_path.is_file() {
        return Err(SysdevError::Internal(format!(
            "Config file not found in {config_path:?}. Using hardcoded defaults"
        )));
    }
    let toml_string = std::fs::read_to_string(config_path).map_err(|e| {
        SysdevError::Internal(format!("Failed to read config file {config_path:?}: {e}"))
    })?;
    parse_config(&toml_string, config_path)
}

static CONFIG: OnceLock<DispatcherConfig> = OnceLock::new();

fn init_dispatcher_config() -> DispatcherConfig {
    match config_from_file(&PathBuf::from(CONFIG_PATH)) {
        Ok(config) => {
            trace!("Successfully loaded config: {config:?}");
            config
        }
        Err(e) => {
            warn!("Using hardcoded defaults because failed to load config: {e}");
            DispatcherConfig::default()
        }
    }
}

/// Process-wide configuration, loaded on first use.
pub fn dispatcher_config() -> &'static DispatcherConfig {
    CONFIG.get_or_init(init_dispatcher_config)
}
