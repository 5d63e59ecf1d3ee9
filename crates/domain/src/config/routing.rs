use crate::decision::{RouteTarget, RoutingDecision, UpstreamAddr};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The four address sets consulted when a decision is turned into a reply.
///
/// Each set is an ordered sequence; the first element is used for
/// single-address replies. All four are fixed at startup and never
/// reassigned while the engine is live.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// IPv4 sinkhole addresses for `Terminate` (e.g. `0.0.0.0`).
    #[serde(default)]
    pub terminate_v4: Vec<Ipv4Addr>,

    /// IPv6 sinkhole addresses for `Terminate` (e.g. `::`).
    #[serde(default)]
    pub terminate_v6: Vec<Ipv6Addr>,

    /// Blocker upstreams for `DnsBlock`, `address` or `address#port`.
    #[serde(default)]
    pub dns_block: Vec<UpstreamAddr>,

    /// Real upstreams for `DnsAllow`, `address` or `address#port`.
    #[serde(default)]
    pub dns_allow: Vec<UpstreamAddr>,
}

impl RoutingConfig {
    /// Resolve a decision and address family to a concrete target.
    ///
    /// Returns `None` when the relevant set is unconfigured, when a
    /// `Rewrite` decision carries no address for the family, and always for
    /// `NoMatch` (pass-through uses the resolver's own upstreams).
    pub fn select(&self, decision: &RoutingDecision, want_v6: bool) -> Option<RouteTarget> {
        match decision {
            RoutingDecision::Terminate => {
                if want_v6 {
                    self.terminate_v6
                        .first()
                        .map(|a| RouteTarget::Sinkhole(IpAddr::V6(*a)))
                } else {
                    self.terminate_v4
                        .first()
                        .map(|a| RouteTarget::Sinkhole(IpAddr::V4(*a)))
                }
            }
            RoutingDecision::DnsBlock => self.dns_block.first().copied().map(RouteTarget::Upstream),
            RoutingDecision::DnsAllow => self.dns_allow.first().copied().map(RouteTarget::Upstream),
            RoutingDecision::Rewrite { v4, v6 } => {
                if want_v6 {
                    v6.map(|a| RouteTarget::Fixed(IpAddr::V6(a)))
                } else {
                    v4.map(|a| RouteTarget::Fixed(IpAddr::V4(a)))
                }
            }
            RoutingDecision::NoMatch => None,
        }
    }
}
