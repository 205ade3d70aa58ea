use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use figment::providers::Format as _;
use secrecy::SecretString;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};

use crate::{
    base::RegistrationPolicy,
    context::{ContextOptions, DEFAULT_BAND},
    device::PropertyTable,
    pdp::{AuthenticationType, RadioAccessTechnology},
};

mod args;
pub use args::Args;

#[cfg(test)]
mod tests;

pub const ENV_PREFIX: &str = "ORB_CELLULAR_";

/// `Settings` are the configurable options for bringing a cellular data connection up.
///
/// Secrets (`password`, `sim_pin`) can only come from the config file or the
/// environment, never from the command line.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Serial device of the modem's AT interface.
    pub device: PathBuf,
    pub baud_rate: u32,
    /// Time to wait for the final result code of a single AT command.
    #[serde_as(as = "DurationMilliSeconds")]
    pub command_timeout: Duration,
    pub apn: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub sim_pin: Option<SecretString>,
    pub authentication: AuthenticationType,
    pub rat: RadioAccessTechnology,
    /// Band bitmask for `^SCFG="Radio/Band/..."`.
    pub band: u32,
    pub control_plane: bool,
    pub non_ip: bool,
    /// Capabilities of the attached modem.
    pub properties: PropertyTable,
    pub registration_attempts: u32,
    #[serde_as(as = "DurationMilliSeconds")]
    pub registration_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        let registration = RegistrationPolicy::default();
        let options = ContextOptions::default();
        Self {
            device: PathBuf::from("/dev/ttyACM0"),
            baud_rate: 115_200,
            command_timeout: Duration::from_secs(5),
            apn: None,
            username: None,
            password: None,
            sim_pin: None,
            authentication: options.authentication,
            rat: options.rat,
            band: DEFAULT_BAND,
            control_plane: options.control_plane,
            non_ip: options.non_ip,
            properties: PropertyTable::default(),
            registration_attempts: registration.attempts,
            registration_interval: registration.interval,
        }
    }
}

impl Settings {
    /// Constructs `Settings` from a config file, environment variables, and command
    /// line arguments. Command line arguments take precedence over environment
    /// variables, which in turn take precedence over the config file.
    pub fn get<P: AsRef<Path>>(
        args: &Args,
        config: P,
        env_prefix: &str,
    ) -> figment::error::Result<Settings> {
        figment::Figment::new()
            .merge(figment::providers::Toml::file(config))
            .merge(figment::providers::Env::prefixed(env_prefix))
            .merge(figment::providers::Serialized::defaults(args))
            .extract()
    }

    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            authentication: self.authentication,
            rat: self.rat,
            band: self.band,
            control_plane: self.control_plane,
            non_ip: self.non_ip,
        }
    }

    pub fn registration(&self) -> RegistrationPolicy {
        RegistrationPolicy {
            attempts: self.registration_attempts,
            interval: self.registration_interval,
        }
    }
}
