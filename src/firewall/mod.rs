//! Firewall allowlist compilation.
//!
//! Domains are resolved on the host (see [`resolve`]) and rendered into one
//! `iptables-restore` file per address family (see [`render`]). Each file
//! replaces the whole filter table in a single kernel call, so the container
//! never runs with a half-applied rule set.

pub mod render;
pub mod resolve;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::config::FirewallEntry;

pub use render::{render, render_rules, AddressFamily, FirewallRules};
pub use resolve::{
    resolve_entries, spawn_resolution, DomainResolver, HostLookup, ResolutionTask, SystemResolver,
};

/// A domain entry after lookup, split by address family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub domain: String,
    pub ports: Vec<u16>,
    pub v4: Vec<Ipv4Addr>,
    pub v6: Vec<Ipv6Addr>,
}

impl ResolvedEntry {
    /// Classify addresses into v4/v6, dropping unspecified and link-local
    /// addresses and duplicates. IPv4-mapped IPv6 addresses count as IPv4.
    pub fn from_addrs(
        domain: impl Into<String>,
        ports: Vec<u16>,
        addrs: impl IntoIterator<Item = IpAddr>,
    ) -> Self {
        let mut entry = Self {
            domain: domain.into(),
            ports,
            ..Default::default()
        };

        for addr in addrs {
            let addr = match addr {
                IpAddr::V6(v6) => v6
                    .to_ipv4_mapped()
                    .map(IpAddr::V4)
                    .unwrap_or(IpAddr::V6(v6)),
                v4 => v4,
            };
            match addr {
                IpAddr::V4(v4) if v4.is_unspecified() || v4.is_link_local() => {}
                IpAddr::V6(v6) if v6.is_unspecified() || v6.is_unicast_link_local() => {}
                IpAddr::V4(v4) => {
                    if !entry.v4.contains(&v4) {
                        entry.v4.push(v4);
                    }
                }
                IpAddr::V6(v6) => {
                    if !entry.v6.contains(&v6) {
                        entry.v6.push(v6);
                    }
                }
            }
        }

        entry
    }
}

/// Everything the renderer needs: resolved domains plus CIDRs passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub domains: Vec<ResolvedEntry>,
    pub cidrs: Vec<FirewallEntry>,
}
