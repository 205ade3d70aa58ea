//! Capability table of the modem the context manager is driving.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Named boolean capabilities the context logic branches on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Property {
    Ipv4PdpType,
    Ipv6PdpType,
    Ipv4v6PdpType,
    NonIpPdpType,
    /// The modem accepts user authentication over AT (`^SGAUTH`).
    AtAuthentication,
}

pub trait CellularDevice {
    fn property(&self, property: Property) -> bool;
}

impl<T: CellularDevice + ?Sized> CellularDevice for &T {
    fn property(&self, property: Property) -> bool {
        (**self).property(property)
    }
}

/// Set-backed [`CellularDevice`], usually loaded from settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyTable(BTreeSet<Property>);

impl PropertyTable {
    pub fn new(properties: impl IntoIterator<Item = Property>) -> Self {
        Self(properties.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn with(mut self, property: Property) -> Self {
        self.0.insert(property);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = Property> + '_ {
        self.0.iter().copied()
    }
}

impl Default for PropertyTable {
    fn default() -> Self {
        Self::new([Property::Ipv4PdpType, Property::AtAuthentication])
    }
}

impl CellularDevice for PropertyTable {
    fn property(&self, property: Property) -> bool {
        self.0.contains(&property)
    }
}
