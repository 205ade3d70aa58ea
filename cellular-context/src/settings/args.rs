use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use crate::pdp::{AuthenticationType, RadioAccessTechnology};

/// Brings up a cellular data connection on a Cinterion modem.
///
/// Finds or defines a PDP context for the requested APN, authenticates, selects the
/// radio access technology and activates the context.
#[derive(Debug, Parser, Serialize)]
#[command(author, version)]
pub struct Args {
    /// The path to the config file.
    #[arg(long, default_value = "/etc/orb_cellular_context.toml")]
    #[serde(skip)]
    pub config: PathBuf,
    /// Serial device of the modem's AT interface.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    /// AT command timeout in milliseconds.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout: Option<u64>,
    /// Access point name. Without one the first usable context is taken as is.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apn: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationType>,
    /// Radio access technology: catm1, catnb or a raw `^SXRAT` value.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rat: Option<RadioAccessTechnology>,
    /// Band bitmask, decimal or 0x prefixed hex.
    #[arg(long, value_parser = clap_num::maybe_hex::<u32>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<u32>,
    /// Requests the control plane data path.
    #[arg(long)]
    // Skipped when unset, otherwise a missing flag would override the config file and
    // environment with `false`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub control_plane: bool,
    /// Requests a non-IP context.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub non_ip: bool,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_attempts: Option<u32>,
    /// Delay between registration polls in milliseconds.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_interval: Option<u64>,
}
