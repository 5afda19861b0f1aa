//! Render `iptables-restore` input from a resolution.

use std::net::IpAddr;

use super::{Resolution, ResolvedEntry};
use crate::config::{AllowTarget, FirewallEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    fn host_prefix(self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128,
        }
    }

    fn reject_with(self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "icmp-port-unreachable",
            AddressFamily::Ipv6 => "icmp6-port-unreachable",
        }
    }

    /// Family of a CIDR string. Unparseable addresses fall back to a colon check.
    fn of_cidr(cidr: &str) -> Self {
        let addr = cidr.split('/').next().unwrap_or(cidr);
        match addr.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => AddressFamily::Ipv6,
            Ok(IpAddr::V4(_)) => AddressFamily::Ipv4,
            Err(_) if addr.contains(':') => AddressFamily::Ipv6,
            Err(_) => AddressFamily::Ipv4,
        }
    }
}

/// Both rule files for one sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRules {
    pub v4: String,
    pub v6: String,
}

pub fn render_rules(resolution: &Resolution) -> FirewallRules {
    FirewallRules {
        v4: render(&resolution.domains, &resolution.cidrs, AddressFamily::Ipv4),
        v6: render(&resolution.domains, &resolution.cidrs, AddressFamily::Ipv6),
    }
}

/// Produce a complete filter table for one family.
///
/// Output is allowed for established traffic, loopback and DNS, then for each
/// allowlisted address, and rejected otherwise. Inbound and forwarded traffic
/// are left open. CIDRs of the other family are skipped.
pub fn render(domains: &[ResolvedEntry], cidrs: &[FirewallEntry], family: AddressFamily) -> String {
    let mut rules: Vec<String> = vec![
        "*filter".into(),
        ":INPUT ACCEPT [0:0]".into(),
        ":FORWARD ACCEPT [0:0]".into(),
        ":OUTPUT ACCEPT [0:0]".into(),
        "-A OUTPUT -m conntrack --ctstate ESTABLISHED,RELATED -j ACCEPT".into(),
        "-A OUTPUT -o lo -j ACCEPT".into(),
        "-A OUTPUT -p udp --dport 53 -j ACCEPT".into(),
        "-A OUTPUT -p tcp --dport 53 -j ACCEPT".into(),
    ];

    let prefix = family.host_prefix();
    for entry in domains {
        let addrs: Vec<String> = match family {
            AddressFamily::Ipv4 => entry.v4.iter().map(|a| a.to_string()).collect(),
            AddressFamily::Ipv6 => entry.v6.iter().map(|a| a.to_string()).collect(),
        };
        for addr in &addrs {
            for port in &entry.ports {
                rules.push(format!(
                    "-A OUTPUT -d {}/{} -p tcp --dport {} -j ACCEPT",
                    addr, prefix, port
                ));
            }
        }
    }

    for entry in cidrs {
        let AllowTarget::Cidr(cidr) = &entry.target else {
            continue;
        };
        if AddressFamily::of_cidr(cidr) != family {
            continue;
        }
        if entry.ports.is_empty() {
            rules.push(format!("-A OUTPUT -d {} -j ACCEPT", cidr));
        } else {
            for port in &entry.ports {
                rules.push(format!(
                    "-A OUTPUT -d {} -p tcp --dport {} -j ACCEPT",
                    cidr, port
                ));
            }
        }
    }

    rules.push(format!(
        "-A OUTPUT -j REJECT --reject-with {}",
        family.reject_with()
    ));
    rules.push("COMMIT".into());

    let mut out = rules.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_V4: &str = "*filter
:INPUT ACCEPT [0:0]
:FORWARD ACCEPT [0:0]
:OUTPUT ACCEPT [0:0]
-A OUTPUT -m conntrack --ctstate ESTABLISHED,RELATED -j ACCEPT
-A OUTPUT -o lo -j ACCEPT
-A OUTPUT -p udp --dport 53 -j ACCEPT
-A OUTPUT -p tcp --dport 53 -j ACCEPT
";

    fn resolved(domain: &str, ports: &[u16], addrs: &[&str]) -> ResolvedEntry {
        ResolvedEntry::from_addrs(
            domain,
            ports.to_vec(),
            addrs.iter().map(|a| a.parse::<IpAddr>().unwrap()),
        )
    }

    #[test]
    fn test_empty_allowlist_is_base_plus_reject() {
        let out = render(&[], &[], AddressFamily::Ipv4);
        let expected = format!(
            "{}-A OUTPUT -j REJECT --reject-with icmp-port-unreachable\nCOMMIT\n",
            BASE_V4
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_domain_rules_per_address_and_port() {
        let domains = vec![resolved("example.com", &[80, 443], &["203.0.113.5"])];
        let out = render(&domains, &[], AddressFamily::Ipv4);
        let expected = format!(
            "{}-A OUTPUT -d 203.0.113.5/32 -p tcp --dport 80 -j ACCEPT\n\
             -A OUTPUT -d 203.0.113.5/32 -p tcp --dport 443 -j ACCEPT\n\
             -A OUTPUT -j REJECT --reject-with icmp-port-unreachable\n\
             COMMIT\n",
            BASE_V4
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_cidr_without_ports_is_unrestricted() {
        let out = render(&[], &[FirewallEntry::cidr("10.0.0.0/8")], AddressFamily::Ipv4);
        assert!(out.contains("-A OUTPUT -d 10.0.0.0/8 -j ACCEPT\n"));
        assert!(!out.contains("10.0.0.0/8 -p tcp"));
    }

    #[test]
    fn test_cidr_with_ports() {
        let cidrs = vec![FirewallEntry::cidr("10.0.0.0/8").with_ports([5432, 6379])];
        let out = render(&[], &cidrs, AddressFamily::Ipv4);
        assert!(out.contains("-A OUTPUT -d 10.0.0.0/8 -p tcp --dport 5432 -j ACCEPT\n"));
        assert!(out.contains("-A OUTPUT -d 10.0.0.0/8 -p tcp --dport 6379 -j ACCEPT\n"));
        assert!(!out.contains("-A OUTPUT -d 10.0.0.0/8 -j ACCEPT"));
    }

    #[test]
    fn test_families_are_separated() {
        let domains = vec![resolved("dual.example", &[443], &["203.0.113.5", "2001:db8::5"])];
        let cidrs = vec![
            FirewallEntry::cidr("10.0.0.0/8"),
            FirewallEntry::cidr("fd00::/8"),
        ];
        let rules = render_rules(&Resolution { domains, cidrs });

        assert!(rules.v4.contains("-d 203.0.113.5/32 -p tcp --dport 443"));
        assert!(!rules.v4.contains("2001:db8::5"));
        assert!(rules.v4.contains("-d 10.0.0.0/8 -j ACCEPT"));
        assert!(!rules.v4.contains("fd00::/8"));
        assert!(rules.v4.contains("icmp-port-unreachable"));

        assert!(rules.v6.contains("-d 2001:db8::5/128 -p tcp --dport 443"));
        assert!(!rules.v6.contains("203.0.113.5"));
        assert!(rules.v6.contains("-d fd00::/8 -j ACCEPT"));
        assert!(!rules.v6.contains("10.0.0.0/8"));
        assert!(rules.v6.contains("icmp6-port-unreachable"));
    }

    #[test]
    fn test_reject_is_last_rule() {
        let domains = vec![resolved("a.com", &[443], &["203.0.113.1"])];
        let out = render(&domains, &[FirewallEntry::cidr("10.0.0.0/8")], AddressFamily::Ipv4);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[lines.len() - 1], "COMMIT");
        assert!(lines[lines.len() - 2].starts_with("-A OUTPUT -j REJECT"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let domains = vec![
            resolved("a.com", &[443], &["203.0.113.1", "203.0.113.2"]),
            resolved("b.com", &[80], &["198.51.100.1"]),
        ];
        assert_eq!(
            render(&domains, &[], AddressFamily::Ipv4),
            render(&domains, &[], AddressFamily::Ipv4)
        );
    }
}
