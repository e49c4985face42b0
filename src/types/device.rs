//! Device identity and status types.

use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// Length of a device address in bytes.
pub const ADDRESS_LEN: usize = 6;

/// Battery sentinel meaning "not reported".
pub const BATTERY_UNKNOWN: i8 = -1;

/// A six-byte Bluetooth device address.
///
/// Always displayed in canonical `XX:XX:XX:XX:XX:XX` uppercase form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.trim().split(':').collect();
        if groups.len() != ADDRESS_LEN {
            return Err(AddressError::GroupCount(groups.len()));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        for (index, group) in groups.iter().enumerate() {
            if group.len() != 2 {
                return Err(AddressError::InvalidOctet {
                    index,
                    group: (*group).to_string(),
                });
            }
            hex::decode_to_slice(group, &mut bytes[index..=index]).map_err(|_| {
                AddressError::InvalidOctet {
                    index,
                    group: (*group).to_string(),
                }
            })?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self
            .0
            .iter()
            .map(|byte| hex::encode_upper([*byte]))
            .collect();
        f.write_str(&groups.join(":"))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// A device as first mentioned by the console.
///
/// Equality is by address only.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    /// Hardware address.
    pub address: Address,
    /// Display name, possibly empty.
    pub name: String,
}

impl DeviceIdentity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }
}

impl PartialEq for DeviceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for DeviceIdentity {}

impl std::hash::Hash for DeviceIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// Device status as reported by an `info` query.
///
/// Produced fresh on every query. Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Address reported in the block, if any.
    pub address: Option<Address>,
    /// Device name (empty when not reported).
    pub name: String,
    /// Device is paired.
    pub paired: bool,
    /// Device is trusted.
    pub trusted: bool,
    /// Device is bonded.
    pub bonded: bool,
    /// Device is connected.
    pub connected: bool,
    /// Battery level in percent, or [`BATTERY_UNKNOWN`].
    pub battery_percent: i8,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            address: None,
            name: String::new(),
            paired: false,
            trusted: false,
            bonded: false,
            connected: false,
            battery_percent: BATTERY_UNKNOWN,
        }
    }
}

impl DeviceStatus {
    /// Returns the battery level if it was reported.
    #[must_use]
    pub fn battery(&self) -> Option<u8> {
        u8::try_from(self.battery_percent).ok()
    }

    /// Returns the identity if the block carried an address.
    #[must_use]
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.address
            .map(|address| DeviceIdentity::new(address, self.name.clone()))
    }
}

/// Radio-level block state from the system radio list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioBlockState {
    /// Radio is soft blocked.
    pub soft_blocked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_canonical() {
        let address: Address = "aa:bb:cc:0d:ee:ff".parse().unwrap();
        assert_eq!(address.as_bytes(), &[0xAA, 0xBB, 0xCC, 0x0D, 0xEE, 0xFF]);
        assert_eq!(address.to_string(), "AA:BB:CC:0D:EE:FF");
    }

    #[test]
    fn test_address_parse_errors() {
        assert_eq!(
            "AA:BB:CC".parse::<Address>(),
            Err(AddressError::GroupCount(3))
        );
        assert!(matches!(
            "AA:BB:CC:DD:EE:GG".parse::<Address>(),
            Err(AddressError::InvalidOctet { index: 5, .. })
        ));
        assert!(matches!(
            "AA:BB:CC:DD:EE:F".parse::<Address>(),
            Err(AddressError::InvalidOctet { index: 5, .. })
        ));
    }

    #[test]
    fn test_identity_equality_by_address() {
        let address: Address = "11:22:33:44:55:66".parse().unwrap();
        let a = DeviceIdentity::new(address, "Speaker");
        let b = DeviceIdentity::new(address, "Renamed");
        assert_eq!(a, b);
    }

    #[test]
    fn test_status_battery() {
        let mut status = DeviceStatus::default();
        assert_eq!(status.battery(), None);
        assert!(status.identity().is_none());

        status.battery_percent = 80;
        assert_eq!(status.battery(), Some(80));
    }
}
