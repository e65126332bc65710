// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use doorbot::{AlarmMode, ClientConfig};

/// Command-line front end for the doorbell service.
#[derive(Debug, Clone, Parser)]
#[command(name = "doorbot", version, about)]
pub struct Config {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Log format (json or text).
    #[arg(long, env = "DOORBOT_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log level filter.
    #[arg(long, env = "DOORBOT_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print every device on the account.
    Devices,
    /// Print recorded events.
    History {
        #[arg(long)]
        limit: Option<u32>,
        /// Only events older than this event id.
        #[arg(long)]
        older_than: Option<String>,
    },
    /// Print active dings.
    Dings,
    /// Print the recording URL of each recent event.
    Links {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Download event recordings, skipping files already on disk.
    Download {
        /// Number of recent events; omitted pages through the whole history.
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value = "downloads")]
        out: PathBuf,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: u16,
    },
    /// List the alarm devices at a location.
    AlarmDevices {
        #[arg(long)]
        location: String,
    },
    /// Change the arming mode of an alarm panel.
    AlarmMode {
        #[arg(long)]
        location: String,
        /// Panel zid.
        #[arg(long)]
        zid: String,
        /// all (away), some (home) or none (disarmed).
        #[arg(long)]
        mode: AlarmMode,
        /// Sensors to leave out when arming.
        #[arg(long)]
        bypass: Vec<String>,
    },
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.client.validate()?;
        match self.log_format.as_str() {
            "json" | "text" => Ok(()),
            other => anyhow::bail!("invalid log format: {other}"),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
