use ipnet::Ipv4Net;
use std::{
    fmt,
    net::{IpAddr, Ipv4Addr},
};

/// Matches a caller's address against an IPv4 network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NetworkMatch {
    net: Ipv4Net,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NetworkParseError {
    #[error("invalid IPv4 address {0:?}")]
    Addr(String),

    #[error("non-numeric mask {0:?}")]
    NonNumericMask(String),

    #[error("mask out of range {0:?}")]
    MaskRange(String),

    #[error("unparsable network {0:?}")]
    Unparsable(String),
}

// === impl NetworkMatch ===

impl NetworkMatch {
    pub fn new(net: Ipv4Net) -> Self {
        Self { net }
    }

    pub fn net(&self) -> Ipv4Net {
        self.net
    }

    /// Returns true if `addr` lies within this network.
    ///
    /// IPv4-mapped IPv6 addresses are compared as their IPv4 form; any other
    /// IPv6 address never matches.
    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = match addr {
            IpAddr::V4(addr) => addr,
            IpAddr::V6(addr) => match addr.to_ipv4_mapped() {
                Some(addr) => addr,
                None => return false,
            },
        };
        self.net.contains(&addr)
    }
}

impl From<Ipv4Net> for NetworkMatch {
    fn from(net: Ipv4Net) -> Self {
        Self::new(net)
    }
}

impl From<Ipv4Addr> for NetworkMatch {
    fn from(addr: Ipv4Addr) -> Self {
        Ipv4Net::from(addr).into()
    }
}

/// Parses `W.X.Y.Z` (an implicit /32) or `W.X.Y.Z/N`.
impl std::str::FromStr for NetworkMatch {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let addr = parts.next().unwrap_or_default();
        let mask = parts.next();
        if parts.next().is_some() {
            return Err(NetworkParseError::Unparsable(s.to_string()));
        }

        let addr = addr
            .parse::<Ipv4Addr>()
            .map_err(|_| NetworkParseError::Addr(s.to_string()))?;
        let prefix_len = match mask {
            None => 32,
            Some(mask) => mask
                .parse::<u8>()
                .map_err(|_| NetworkParseError::NonNumericMask(s.to_string()))?,
        };
        let net = Ipv4Net::new(addr, prefix_len)
            .map_err(|_| NetworkParseError::MaskRange(s.to_string()))?;
        Ok(Self::new(net))
    }
}

impl fmt::Display for NetworkMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.net.fmt(f)
    }
}
