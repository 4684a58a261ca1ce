//! IPv4 CIDR blocks.
//!
//! VPC and subnet address ranges, security-group sources and route
//! destinations are all expressed as CIDR blocks. This module parses them,
//! answers containment/overlap questions for validation, and carves
//! sequential subnets out of a VPC range.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing or carving CIDR blocks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    #[error("CIDR '{0}' is missing a '/prefix' suffix")]
    MissingPrefix(String),

    #[error("CIDR '{0}' has an invalid IPv4 address")]
    InvalidAddress(String),

    #[error("CIDR '{0}' has an invalid prefix length (expected 0-32)")]
    InvalidPrefix(String),

    #[error("Cannot carve /{new_prefix} subnet #{index} out of {parent}")]
    OutOfRange {
        parent: Ipv4Cidr,
        new_prefix: u8,
        index: u32,
    },
}

/// An IPv4 network in CIDR notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix_len: u8,
}

fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}

impl Ipv4Cidr {
    /// The block matching every IPv4 address.
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        address: Ipv4Addr::UNSPECIFIED,
        prefix_len: 0,
    };

    /// Create a block; the address is kept as given (host bits included).
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, CidrError> {
        if prefix_len > 32 {
            return Err(CidrError::InvalidPrefix(format!("{}/{}", address, prefix_len)));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    /// Address as written
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// First address of the block
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & mask(self.prefix_len))
    }

    /// Last address of the block
    pub fn last(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network()) | !mask(self.prefix_len))
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }

    /// True when the written address has no host bits set
    pub fn is_aligned(&self) -> bool {
        self.address == self.network()
    }

    /// True for `0.0.0.0/0`
    pub fn is_any(&self) -> bool {
        self.prefix_len == 0
    }

    /// Whether `other` lies entirely within this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_len >= self.prefix_len
            && (u32::from(other.address) & mask(self.prefix_len)) == u32::from(self.network())
    }

    /// Whether the two blocks share at least one address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The `index`-th subnet of length `new_prefix` inside this block.
    ///
    /// `10.0.0.0/16` carved at `/24` yields `10.0.0.0/24`, `10.0.1.0/24`, ...
    pub fn subnet(&self, new_prefix: u8, index: u32) -> Result<Ipv4Cidr, CidrError> {
        let out_of_range = || CidrError::OutOfRange {
            parent: *self,
            new_prefix,
            index,
        };

        if new_prefix > 32 || new_prefix < self.prefix_len {
            return Err(out_of_range());
        }

        let extra_bits = u32::from(new_prefix - self.prefix_len);
        let available = 1u64 << extra_bits;
        if u64::from(index) >= available {
            return Err(out_of_range());
        }

        let step = 1u64 << (32 - u32::from(new_prefix));
        let base = u64::from(u32::from(self.network()));
        let start = base + u64::from(index) * step;
        let start = u32::try_from(start).map_err(|_| out_of_range())?;

        Ok(Ipv4Cidr {
            address: Ipv4Addr::from(start),
            prefix_len: new_prefix,
        })
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| CidrError::MissingPrefix(s.to_string()))?;

        // Ipv4Addr::from_str already rejects leading zeros and out-of-range octets
        let address: Ipv4Addr = addr
            .parse()
            .map_err(|_| CidrError::InvalidAddress(s.to_string()))?;

        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(CidrError::InvalidPrefix(s.to_string()));
        }
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| CidrError::InvalidPrefix(s.to_string()))?;

        Ipv4Cidr::new(address, prefix_len).map_err(|_| CidrError::InvalidPrefix(s.to_string()))
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Ipv4Cidr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let c = cidr("10.0.0.0/16");
        assert_eq!(c.prefix_len(), 16);
        assert_eq!(c.to_string(), "10.0.0.0/16");
        assert_eq!(c.size(), 65536);
        assert_eq!(c.last(), Ipv4Addr::new(10, 0, 255, 255));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "10.0.0.0".parse::<Ipv4Cidr>(),
            Err(CidrError::MissingPrefix(_))
        ));
        assert!(matches!(
            "10.0.0.256/24".parse::<Ipv4Cidr>(),
            Err(CidrError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<Ipv4Cidr>(),
            Err(CidrError::InvalidPrefix(_))
        ));
        assert!(matches!(
            "10.0.0.0/+8".parse::<Ipv4Cidr>(),
            Err(CidrError::InvalidPrefix(_))
        ));
        assert!("".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn test_alignment() {
        assert!(cidr("10.0.1.0/24").is_aligned());
        assert!(!cidr("10.0.1.7/24").is_aligned());
        assert_eq!(cidr("10.0.1.7/24").network(), Ipv4Addr::new(10, 0, 1, 0));
    }

    #[test]
    fn test_containment_and_overlap() {
        let vpc = cidr("10.0.0.0/16");
        assert!(vpc.contains(&cidr("10.0.5.0/24")));
        assert!(!vpc.contains(&cidr("10.1.0.0/24")));
        assert!(!cidr("10.0.5.0/24").contains(&vpc));
        assert!(cidr("10.0.0.0/24").overlaps(&cidr("10.0.0.128/25")));
        assert!(!cidr("10.0.0.0/24").overlaps(&cidr("10.0.1.0/24")));
        assert!(Ipv4Cidr::ANY.contains(&vpc));
        assert!(Ipv4Cidr::ANY.is_any());
    }

    #[test]
    fn test_subnet_carving() {
        let vpc = cidr("10.0.0.0/16");
        assert_eq!(vpc.subnet(24, 0).unwrap(), cidr("10.0.0.0/24"));
        assert_eq!(vpc.subnet(24, 5).unwrap(), cidr("10.0.5.0/24"));
        assert_eq!(vpc.subnet(24, 255).unwrap(), cidr("10.0.255.0/24"));
        assert!(vpc.subnet(24, 256).is_err());
        assert!(vpc.subnet(8, 0).is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let c = cidr("192.168.0.0/20");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"192.168.0.0/20\"");
        let back: Ipv4Cidr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
