// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4)")]
    InvalidPrefixLength(u8),

    #[error("Address {address} is not the network address of /{prefix_length}")]
    NotNetworkAddress { address: Ipv4Addr, prefix_length: u8 },

    #[error("Subnet mask /{mask} must be longer than the parent block /{parent}")]
    MaskNotNarrower { parent: u8, mask: u8 },

    #[error("Subnet index {index} is outside the {capacity} /{mask} subnets of {parent}")]
    SubnetOutOfRange {
        parent: String,
        mask: u8,
        index: u64,
        capacity: u64,
    },

    #[error("Invalid port range: {0}")]
    InvalidPortRange(String),
}

/// IPv4 network block in CIDR notation
///
/// Invariants:
/// - Valid IPv4 address and a prefix length of 0-32
/// - The address is the network address (host bits are zero)
///
/// # Examples
///
/// ```rust
/// use cim_stack::domain::Ipv4Cidr;
///
/// let vpc = Ipv4Cidr::new("10.0.0.0/16").unwrap();
/// let first = vpc.subnet(24, 0).unwrap();
/// assert_eq!(first.to_string(), "10.0.0.0/24");
/// assert!(vpc.contains(&first));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Cidr {
    /// The unrestricted range (any IPv4 address)
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        network: Ipv4Addr::UNSPECIFIED,
        prefix_length: 0,
    };

    /// Parse a CIDR block
    ///
    /// # Invariants
    /// - Prefix length is mandatory and at most 32
    /// - Address must be the network address of the block
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let address = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(address, prefix_length)
    }

    /// Create from separate address and prefix
    pub fn from_parts(address: Ipv4Addr, prefix_length: u8) -> Result<Self, NetworkError> {
        if prefix_length > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        if u32::from(address) & !Self::mask_bits(prefix_length) != 0 {
            return Err(NetworkError::NotNetworkAddress {
                address,
                prefix_length,
            });
        }

        Ok(Self {
            network: address,
            prefix_length,
        })
    }

    fn mask_bits(prefix_length: u8) -> u32 {
        if prefix_length == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_length))
        }
    }

    /// Get the network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Get the prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_length))
    }

    /// Last address in the block
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !Self::mask_bits(self.prefix_length))
    }

    /// Whether this block matches every IPv4 address
    pub fn is_unrestricted(&self) -> bool {
        self.prefix_length == 0
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_length >= self.prefix_length
            && u32::from(other.network) & Self::mask_bits(self.prefix_length)
                == u32::from(self.network)
    }

    /// Whether the two blocks share any address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// How many `/mask` subnets fit in this block
    pub fn subnet_capacity(&self, mask: u8) -> Result<u64, NetworkError> {
        if mask > 32 {
            return Err(NetworkError::InvalidPrefixLength(mask));
        }
        if mask <= self.prefix_length {
            return Err(NetworkError::MaskNotNarrower {
                parent: self.prefix_length,
                mask,
            });
        }
        Ok(1u64 << u32::from(mask - self.prefix_length))
    }

    /// Carve the `index`-th `/mask` subnet out of this block
    pub fn subnet(&self, mask: u8, index: u64) -> Result<Ipv4Cidr, NetworkError> {
        let capacity = self.subnet_capacity(mask)?;
        if index >= capacity {
            return Err(NetworkError::SubnetOutOfRange {
                parent: self.to_string(),
                mask,
                index,
                capacity,
            });
        }

        let step = 1u64 << (32 - u32::from(mask));
        let start = u64::from(u32::from(self.network)) + index * step;
        // start fits: index < capacity keeps it inside this block
        let network = Ipv4Addr::from(start as u32);
        Ipv4Cidr::from_parts(network, mask)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_length)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ipv4Cidr::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Inclusive TCP port range value object
///
/// Invariants:
/// - Ports are 1-65535
/// - `from <= to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRange {
    from: u16,
    to: u16,
}

impl PortRange {
    /// Create a range covering `from..=to`
    pub fn new(from: u16, to: u16) -> Result<Self, NetworkError> {
        if from == 0 || from > to {
            return Err(NetworkError::InvalidPortRange(format!("{from}-{to}")));
        }
        Ok(Self { from, to })
    }

    /// Create a single-port range
    pub fn single(port: u16) -> Result<Self, NetworkError> {
        Self::new(port, port)
    }

    pub fn from_port(&self) -> u16 {
        self.from
    }

    pub fn to_port(&self) -> u16 {
        self.to
    }

    /// Whether `port` is inside the range
    pub fn contains(&self, port: u16) -> bool {
        (self.from..=self.to).contains(&port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Availability zone within a region
///
/// Zones are addressed by index; the platform name is the region followed by
/// a letter suffix (`eu-central-1a`, `eu-central-1b`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AvailabilityZone {
    region: String,
    index: u8,
}

impl AvailabilityZone {
    /// Highest zone count a region can be asked for
    pub const MAX_PER_REGION: u8 = 6;

    pub fn new(region: impl Into<String>, index: u8) -> Self {
        Self {
            region: region.into(),
            index,
        }
    }

    /// Zero-based zone index
    pub fn index(&self) -> u8 {
        self.index
    }

    /// One-based ordinal used in resource names
    pub fn ordinal(&self) -> u8 {
        self.index + 1
    }

    /// Platform zone name
    pub fn name(&self) -> String {
        format!("{}{}", self.region, char::from(b'a' + self.index))
    }
}

impl fmt::Display for AvailabilityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Role-scoped subnet tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    /// Load balancer and egress gateways
    Public,
    /// Compute service tasks
    App,
    /// Database instances
    Data,
}

impl SubnetTier {
    /// Carving order of the tiers inside the network block
    pub const ALL: [SubnetTier; 3] = [Self::Public, Self::App, Self::Data];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::App => "app",
            Self::Data => "data",
        }
    }

    /// Routing mode every subnet of this tier gets
    pub fn routing_mode(&self) -> RoutingMode {
        match self {
            Self::Public => RoutingMode::Public,
            Self::App => RoutingMode::EgressOnly,
            Self::Data => RoutingMode::Isolated,
        }
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a subnet reaches the internet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Default route through the internet gateway
    Public,
    /// Default route through the egress gateway of the same zone
    EgressOnly,
    /// No default route
    Isolated,
}

impl RoutingMode {
    pub fn reaches_internet_directly(&self) -> bool {
        matches!(self, Self::Public)
    }
}
