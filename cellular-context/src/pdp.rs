use std::{fmt, str::FromStr};

use derive_more::{Display, From};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::device::Property;

/// Longest PDP type string the modem is expected to report (`IPV4V6`, `Non-IP`).
pub const MAX_PDP_TYPE_LENGTH: usize = 9;

/// Longest access point name kept from modem responses.
pub const MAX_ACCESSPOINT_NAME_LENGTH: usize = 100;

/// Modem assigned PDP context identifier (`<cid>` in `+CGDCONT`).
#[derive(
    Debug, Display, From, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct ContextId(pub u32);

impl ContextId {
    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PdpType {
    Ipv4,
    Ipv6,
    Ipv4v6,
    NonIp,
}

impl PdpType {
    /// Parses the `<PDP_type>` parameter of `+CGDCONT`. Unknown types yield `None`.
    pub fn from_modem_str(s: &str) -> Option<Self> {
        [Self::Ipv4v6, Self::Ipv6, Self::Ipv4, Self::NonIp]
            .into_iter()
            .find(|ty| ty.as_modem_str().eq_ignore_ascii_case(s))
    }

    pub fn as_modem_str(self) -> &'static str {
        match self {
            PdpType::Ipv4 => "IP",
            PdpType::Ipv6 => "IPV6",
            PdpType::Ipv4v6 => "IPV4V6",
            PdpType::NonIp => "Non-IP",
        }
    }

    /// Capability flag a device must report to use this PDP type as is.
    pub fn property(self) -> Property {
        match self {
            PdpType::Ipv4 => Property::Ipv4PdpType,
            PdpType::Ipv6 => Property::Ipv6PdpType,
            PdpType::Ipv4v6 => Property::Ipv4v6PdpType,
            PdpType::NonIp => Property::NonIpPdpType,
        }
    }
}

impl fmt::Display for PdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_modem_str())
    }
}

/// `<auth_type>` of `AT^SGAUTH`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationType {
    None = 0,
    Pap = 1,
    #[default]
    Chap = 2,
    Automatic = 3,
}

impl AuthenticationType {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// Radio access technology selected with `AT^SXRAT`.
///
/// Serialized as `catm1`, `catnb` or the raw number. The numbers 7 and 8 always
/// come back as the named technologies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RadioAccessTechnology {
    CatM1,
    #[default]
    CatNb,
    /// Any other `^SXRAT` value. No band is configured for it.
    Other(u8),
}

impl RadioAccessTechnology {
    pub fn value(self) -> u8 {
        match self {
            RadioAccessTechnology::CatM1 => 7,
            RadioAccessTechnology::CatNb => 8,
            RadioAccessTechnology::Other(value) => value,
        }
    }

    /// `^SCFG` key holding the band mask of this technology.
    pub fn band_key(self) -> Option<&'static str> {
        match self {
            RadioAccessTechnology::CatM1 => Some("Radio/Band/CatM"),
            RadioAccessTechnology::CatNb => Some("Radio/Band/CatNB"),
            RadioAccessTechnology::Other(_) => None,
        }
    }
}

impl From<u8> for RadioAccessTechnology {
    fn from(value: u8) -> Self {
        match value {
            7 => Self::CatM1,
            8 => Self::CatNb,
            value => Self::Other(value),
        }
    }
}

impl Serialize for RadioAccessTechnology {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RadioAccessTechnology::CatM1 => serializer.serialize_str("catm1"),
            RadioAccessTechnology::CatNb => serializer.serialize_str("catnb"),
            RadioAccessTechnology::Other(value) => serializer.serialize_u8(*value),
        }
    }
}

impl<'de> Deserialize<'de> for RadioAccessTechnology {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Value(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Value(value) => Ok(value.into()),
            Repr::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

impl fmt::Display for RadioAccessTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioAccessTechnology::CatM1 => f.write_str("CAT-M1"),
            RadioAccessTechnology::CatNb => f.write_str("CAT-NB"),
            RadioAccessTechnology::Other(value) => write!(f, "RAT {value}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown radio access technology `{0}`, expected catm1, catnb or a number")]
pub struct ParseRatError(String);

impl FromStr for RadioAccessTechnology {
    type Err = ParseRatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "catm1" | "cat-m1" | "catm" => Ok(Self::CatM1),
            "catnb" | "cat-nb" | "nbiot" => Ok(Self::CatNb),
            other => other
                .parse::<u8>()
                .map(Self::from)
                .map_err(|_| ParseRatError(s.to_owned())),
        }
    }
}

/// Snapshot of the selected PDP context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdpContext {
    pub cid: ContextId,
    pub pdp_type: PdpType,
    pub apn: Option<String>,
}
