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

//! Command-line interface for sysdev.
//!
//! Issues raw method calls through the sysdev dispatcher and drives the battery, display and
//! camera flash wrappers of the device daemon.
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`, `error`
//!   or `off`). Defaults to `warn`
//!
//! # Examples
//!
//! ```bash
//! sysdev_cli call org.tizen.system.deviced /Org/Tizen/System/DeviceD/Display \
//!     org.tizen.system.deviced.display HoldBrightness --signature i 80
//! sysdev_cli display set 80 --index 0
//! sysdev_cli --session flash get
//! sysdev_cli battery full
//! ```

mod call;
mod device;

use clap::{Args, Parser, Subcommand};
use log::debug;
use std::error::Error;
use std::io::{self, Write};
use std::process::ExitCode;
use sysdev::config::{BusKind, DispatcherConfig, dispatcher_config};

#[derive(Parser, Debug)]
#[command(name = "sysdev")]
#[command(bin_name = "sysdev_cli")]
struct Cli {
    #[arg(
        long = "session",
        help = r#"Talk to the session bus instead of the configured bus.
The configured bus comes from /etc/sysdev/config.toml and defaults to the system bus.
        "#
    )]
    session: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Target and arguments of one raw method call.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CallArgs {
    /// Bus name of the remote service
    destination: String,
    /// Object path of the remote object
    path: String,
    /// Interface the method belongs to
    interface: String,
    method: String,
    #[arg(
        long,
        short,
        default_value = "",
        help = "One character per parameter: i (int32), u (uint32), t (uint64), s (string)"
    )]
    signature: String,
    #[arg(allow_hyphen_values = true)]
    params: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call a method and print the integer it returns
    Call(CallArgs),
    /// Call a method asynchronously and print the reply once it completes
    CallAsync(CallArgs),
    /// Battery charge state
    Battery {
        #[command(subcommand)]
        command: BatterySubcommand,
    },
    /// Display brightness
    Display {
        #[command(subcommand)]
        command: DisplaySubcommand,
    },
    /// Camera flash brightness
    Flash {
        #[command(subcommand)]
        command: FlashSubcommand,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum BatterySubcommand {
    /// Whether the battery is fully charged
    Full,
    /// Battery warning level
    Warning,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum DisplaySubcommand {
    /// Number of displays
    Count,
    /// Current brightness
    Get {
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Maximum brightness
    Max {
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Hold the brightness at VALUE without changing the user setting
    Set {
        #[arg(allow_negative_numbers = true)]
        value: i32,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Release a held brightness and follow the user setting again
    Restore {
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Set the brightness to VALUE and store it as the user setting
    Save {
        #[arg(allow_negative_numbers = true)]
        value: i32,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum FlashSubcommand {
    /// Current flash brightness
    Get,
    /// Maximum flash brightness
    Max,
    /// Set the flash brightness, 0 turns it off
    Set {
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },
}

fn effective_config(session: bool) -> DispatcherConfig {
    let mut config = dispatcher_config().clone();
    if session {
        config.bus = BusKind::Session;
    }
    config
}

/// Print the outcome of a command, the message to `out` or the error to `err`, once.
///
/// # Returns: `u8`
/// * `0` - The command succeeded
/// * `1` - The command failed
fn report(
    result: Result<String, Box<dyn Error>>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> u8 {
    let (written, status) = match result {
        Ok(msg) => (writeln!(out, "{msg}"), 0),
        Err(e) => (writeln!(err, "{e}"), 1),
    };
    match written {
        Ok(()) => status,
        Err(_) => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    let config = effective_config(cli.session);
    let result: Result<String, Box<dyn Error>> = match &cli.command {
        Commands::Call(args) => call::call_handler(&config, args)
            .await
            .map_err(Into::into),
        Commands::CallAsync(args) => call::call_async_handler(&config, args)
            .await
            .map_err(Into::into),
        Commands::Battery { command } => device::battery_handler(&config, command)
            .await
            .map_err(Into::into),
        Commands::Display { command } => device::display_handler(&config, command)
            .await
            .map_err(Into::into),
        Commands::Flash { command } => device::flash_handler(&config, command)
            .await
            .map_err(Into::into),
    };
    ExitCode::from(report(result, &mut io::stdout(), &mut io::stderr()))
}
