//! Input loader: newline-delimited IP addresses.

use crate::{ReconError, Target};
use anyhow::{Context, Result};
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::Path;

/// Largest CIDR block accepted on one line: a /16 for IPv4, a /112 for IPv6.
pub const MAX_CIDR_HOST_BITS: u8 = 16;

/// Read targets from a file. Blank lines and `#` comments are skipped, CIDR
/// lines expand to their host addresses, anything else is an error.
pub fn load_targets(path: &Path) -> Result<Vec<Target>> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read target list {}", path.display()))?;
    Ok(parse_targets(&s)?)
}

pub fn parse_targets(content: &str) -> Result<Vec<Target>, ReconError> {
    let mut out = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        if let Ok(ip) = t.parse::<IpAddr>() {
            out.push(Target(ip));
            continue;
        }
        let net: IpNet = t
            .parse()
            .map_err(|_| ReconError::InvalidTarget { line: idx + 1, value: t.to_string() })?;
        if net.max_prefix_len() - net.prefix_len() > MAX_CIDR_HOST_BITS {
            return Err(ReconError::TooManyTargets { line: idx + 1, value: t.to_string() });
        }
        out.extend(expand_cidr(net));
    }
    Ok(out)
}

fn expand_cidr(net: IpNet) -> Vec<Target> {
    let mut v: Vec<Target> = net.hosts().map(Target).collect();
    if v.is_empty() {
        v.push(Target(net.addr()));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blanks_and_comments() {
        let t = parse_targets("10.0.0.1\n\n# lab\n  10.0.0.2  \n").unwrap();
        let ips: Vec<String> = t.iter().map(|t| t.to_string()).collect();
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn keeps_input_order_and_duplicates() {
        let t = parse_targets("10.0.0.9\n10.0.0.1\n10.0.0.9\n").unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t[0].to_string(), "10.0.0.9");
        assert_eq!(t[1].to_string(), "10.0.0.1");
    }

    #[test]
    fn expands_cidr() {
        let t = parse_targets("192.168.0.0/30\n").unwrap();
        let ips: Vec<String> = t.iter().map(|t| t.to_string()).collect();
        assert_eq!(ips, vec!["192.168.0.1", "192.168.0.2"]);
        let t = parse_targets("192.168.0.7/32\n").unwrap();
        assert_eq!(t[0].to_string(), "192.168.0.7");
    }

    #[test]
    fn accepts_ipv6() {
        let t = parse_targets("::1\nfe80::1\n").unwrap();
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn oversized_blocks_rejected_with_line_number() {
        match parse_targets("::1\n2001:db8::/64\n").unwrap_err() {
            ReconError::TooManyTargets { line, value } => {
                assert_eq!(line, 2);
                assert_eq!(value, "2001:db8::/64");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(parse_targets("10.0.0.0/8\n"), Err(ReconError::TooManyTargets { line: 1, .. })));
        assert!(parse_targets("2001:db8::/112\n").is_ok());
        assert_eq!(parse_targets("10.1.0.0/16\n").unwrap().len(), 65534);
    }

    #[test]
    fn rejects_garbage_with_line_number() {
        let err = parse_targets("10.0.0.1\nnot-an-ip; rm -rf /\n").unwrap_err();
        match err {
            ReconError::InvalidTarget { line, value } => {
                assert_eq!(line, 2);
                assert!(value.starts_with("not-an-ip"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(load_targets(Path::new("/nonexistent/targets.txt")).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ips.txt");
        std::fs::write(&p, "127.0.0.1\n127.0.0.2\n").unwrap();
        assert_eq!(load_targets(&p).unwrap().len(), 2);
    }
}
