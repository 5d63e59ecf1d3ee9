use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// The routing decision for a classified domain.
///
/// Every consumer matches this exhaustively; the surrounding resolver
/// translates the decision into a DNS response (synthesize locally, forward
/// to one of the upstream sets, or doctor the answer after resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Answer locally with a sinkhole address.
    Terminate,
    /// Forward to the blocker upstream set (synthesizes NXDOMAIN-equivalents).
    DnsBlock,
    /// Forward to the allow upstream set.
    DnsAllow,
    /// Substitute the answer's addresses after upstream resolution.
    Rewrite {
        v4: Option<Ipv4Addr>,
        v6: Option<Ipv6Addr>,
    },
    /// No rule matched; pass the query through unchanged.
    NoMatch,
}

/// An upstream endpoint: an address plus an optional non-standard port.
///
/// Text form is dnsmasq-style `address` or `address#port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamAddr {
    pub ip: IpAddr,
    pub port: Option<u16>,
}

impl FromStr for UpstreamAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, port) = match s.split_once('#') {
            Some((addr, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port in upstream address '{s}'"))?;
                (addr, Some(port))
            }
            None => (s, None),
        };
        let ip = addr
            .parse::<IpAddr>()
            .map_err(|_| format!("invalid upstream address '{s}'"))?;
        Ok(Self { ip, port })
    }
}

impl fmt::Display for UpstreamAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}#{}", self.ip, port),
            None => write!(f, "{}", self.ip),
        }
    }
}

impl Serialize for UpstreamAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UpstreamAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A concrete address resolved from a decision and a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Terminate locally with this sinkhole address.
    Sinkhole(IpAddr),
    /// Forward to this upstream endpoint.
    Upstream(UpstreamAddr),
    /// Answer with this address carried inside a `Rewrite` decision.
    Fixed(IpAddr),
}
