use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::{IpNetworkError, Ipv4Network};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::shared::PrefixError;

/// IPv4 CIDR block, always stored as its network address.
///
/// Ordering is lexicographic on the octets, then on the mask length, so
/// `10.0.0.0/8 < 10.0.0.0/24 < 10.1.0.0/16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix {
    octets: [u8; 4],
    mask: u8,
}

/// How one prefix relates to another in address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetRelation {
    Disjoint,
    /// `self` is contained in `other` and has a longer mask.
    MoreSpecific,
    /// `self` contains `other` and has a shorter mask.
    LessSpecific,
    Equal,
}

impl Prefix {
    /// Builds a prefix from raw parts, zeroing the host bits.
    pub fn new(octets: [u8; 4], mask: u8) -> Result<Self, PrefixError> {
        if mask > 32 {
            return Err(PrefixError::InvalidFormat(format!(
                "{}.{}.{}.{}/{}",
                octets[0], octets[1], octets[2], octets[3], mask
            )));
        }
        let addr = u32::from_be_bytes(octets) & Self::netmask(mask);
        Ok(Prefix {
            octets: addr.to_be_bytes(),
            mask,
        })
    }

    pub fn parse(text: &str) -> Result<Self, PrefixError> {
        let invalid = || PrefixError::InvalidFormat(text.to_string());

        let (addr, mask) = text.trim().split_once('/').ok_or_else(invalid)?;
        let mask: u8 = parse_decimal(mask).ok_or_else(invalid)?;
        if mask > 32 {
            return Err(invalid());
        }

        let fields: Vec<&str> = addr.split('.').collect();
        if fields.len() != 4 {
            return Err(invalid());
        }
        let mut octets = [0u8; 4];
        for (octet, field) in octets.iter_mut().zip(fields) {
            *octet = parse_decimal(field).ok_or_else(invalid)?;
        }

        Prefix::new(octets, mask)
    }

    pub fn octets(&self) -> [u8; 4] {
        self.octets
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.octets)
    }

    fn netmask(mask: u8) -> u32 {
        if mask == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(mask))
        }
    }

    /// Classifies `self` against `other`.
    ///
    /// Octets are compared up to the byte boundary of the shorter mask; a
    /// partial byte is settled by comparing which block of size
    /// `2^(8 - shared % 8)` each value falls into.
    pub fn subnet_relationship(&self, other: &Prefix) -> SubnetRelation {
        let shared = self.mask.min(other.mask);
        let full_bytes = usize::from(shared / 8);

        if self.octets[..full_bytes] != other.octets[..full_bytes] {
            return SubnetRelation::Disjoint;
        }

        let partial_bits = shared % 8;
        if partial_bits != 0 {
            let block = 1u16 << (8 - partial_bits);
            let ours = u16::from(self.octets[full_bytes]) / block;
            let theirs = u16::from(other.octets[full_bytes]) / block;
            if ours != theirs {
                return SubnetRelation::Disjoint;
            }
        }

        match self.mask.cmp(&other.mask) {
            std::cmp::Ordering::Equal => SubnetRelation::Equal,
            std::cmp::Ordering::Greater => SubnetRelation::MoreSpecific,
            std::cmp::Ordering::Less => SubnetRelation::LessSpecific,
        }
    }

    pub fn contains(&self, other: &Prefix) -> bool {
        matches!(
            self.subnet_relationship(other),
            SubnetRelation::LessSpecific | SubnetRelation::Equal
        )
    }
}

/// Plain decimal digits only; `u8::from_str` would also take a leading `+`.
fn parse_decimal(field: &str) -> Option<u8> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// True when `more_specific` is a strict subnet of `less_specific`.
pub fn is_subnet(less_specific: &str, more_specific: &str) -> Result<bool, PrefixError> {
    let outer = Prefix::parse(less_specific)?;
    let inner = Prefix::parse(more_specific)?;
    Ok(outer.subnet_relationship(&inner) == SubnetRelation::LessSpecific)
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets;
        write!(f, "{}.{}.{}.{}/{}", a, b, c, d, self.mask)
    }
}

impl FromStr for Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prefix::parse(s)
    }
}

impl TryFrom<Prefix> for Ipv4Network {
    type Error = IpNetworkError;

    fn try_from(prefix: Prefix) -> Result<Self, Self::Error> {
        Ipv4Network::new(Ipv4Addr::from(prefix.octets), prefix.mask)
    }
}

impl From<Ipv4Network> for Prefix {
    fn from(net: Ipv4Network) -> Self {
        Prefix {
            octets: net.network().octets(),
            mask: net.prefix(),
        }
    }
}

impl Serialize for Prefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Prefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Prefix::parse(&text).map_err(serde::de::Error::custom)
    }
}
