//! Published-port grammar (§4.A):
//! `[host_ip:]host_port[-host_port_end]:container_port[-container_port_end][/proto]`

use boxd_shared::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proto {
    Tcp,
    Udp,
}

impl FromStr for Proto {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Proto::Tcp),
            "udp" => Ok(Proto::Udp),
            other => Err(CoreError::InvalidArgument(format!(
                "unknown protocol '{other}', expected tcp or udp"
            ))),
        }
    }
}

impl std::fmt::Display for Proto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Proto::Tcp => write!(f, "tcp"),
            Proto::Udp => write!(f, "udp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPort {
    pub host_ip: IpAddr,
    pub host_port: u16,
    pub container_port: u16,
    pub proto: Proto,
    pub count: u32,
}

impl std::fmt::Display for PublishedPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let host_end = self.host_port as u32 + self.count - 1;
        let container_end = self.container_port as u32 + self.count - 1;
        if self.count == 1 {
            write!(f, "{}:{}:{}/{}", self.host_ip, self.host_port, self.container_port, self.proto)
        } else {
            write!(
                f,
                "{}:{}-{}:{}-{}/{}",
                self.host_ip, self.host_port, host_end, self.container_port, container_end, self.proto
            )
        }
    }
}

fn split_range(spec: &str) -> CoreResult<(u16, u16)> {
    match spec.split_once('-') {
        Some((start, end)) => {
            let start: u16 = start
                .parse()
                .map_err(|_| CoreError::InvalidArgument(format!("invalid port '{start}'")))?;
            let end: u16 = end
                .parse()
                .map_err(|_| CoreError::InvalidArgument(format!("invalid port '{end}'")))?;
            if start < 2 {
                return Err(CoreError::InvalidArgument(format!(
                    "port range must start at 2 or above, got {start}"
                )));
            }
            if start > end {
                return Err(CoreError::InvalidArgument(format!(
                    "port range start {start} is greater than end {end}"
                )));
            }
            Ok((start, end))
        }
        None => {
            let port: u16 = spec
                .parse()
                .map_err(|_| CoreError::InvalidArgument(format!("invalid port '{spec}'")))?;
            if port < 2 {
                return Err(CoreError::InvalidArgument(format!(
                    "port must be 2 or above, got {port}"
                )));
            }
            Ok((port, port))
        }
    }
}

/// Parses one published-port specification.
pub fn parse_published_port(spec: &str) -> CoreResult<PublishedPort> {
    let (proto_part, proto) = match spec.rsplit_once('/') {
        Some((rest, proto)) => (rest, proto.parse::<Proto>()?),
        None => (spec, Proto::Tcp),
    };

    // A bracketed IPv6 host literal absorbs its own colons; pull it off
    // first so the remainder only ever has `host_range:container_range`.
    let (host_ip, remainder) = if let Some(rest) = proto_part.strip_prefix('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| CoreError::InvalidArgument(format!("unterminated '[' in '{spec}'")))?;
        let host_ip_str = &rest[..close];
        let after = &rest[close + 1..];
        let after = after
            .strip_prefix(':')
            .ok_or_else(|| CoreError::InvalidArgument(format!("expected ':' after ']' in '{spec}'")))?;
        (host_ip_str.to_string(), after.to_string())
    } else {
        let parts: Vec<&str> = proto_part.split(':').collect();
        match parts.len() {
            // host_port:container_port — host IP defaults to 0.0.0.0
            2 => ("0.0.0.0".to_string(), proto_part.to_string()),
            // host_ip:host_port:container_port
            3 => (parts[0].to_string(), format!("{}:{}", parts[1], parts[2])),
            _ => {
                return Err(CoreError::InvalidArgument(format!(
                    "malformed published port '{spec}'"
                )));
            }
        }
    };

    let (host_range_str, container_side) = remainder.split_once(':').ok_or_else(|| {
        CoreError::InvalidArgument(format!("malformed published port '{spec}'"))
    })?;

    let host_ip: IpAddr = host_ip
        .parse()
        .map_err(|_| CoreError::InvalidArgument(format!("invalid host IP '{host_ip}' in '{spec}'")))?;

    let (host_start, host_end) = split_range(host_range_str)?;
    let (container_start, container_end) = split_range(container_side)?;

    let host_count = host_end as u32 - host_start as u32 + 1;
    let container_count = container_end as u32 - container_start as u32 + 1;
    if host_count != container_count {
        return Err(CoreError::InvalidArgument(
            "counts are not equal".to_string(),
        ));
    }

    Ok(PublishedPort {
        host_ip,
        host_port: host_start,
        container_port: container_start,
        proto,
        count: host_count,
    })
}

/// Validates that no two published ports' host-port windows overlap (§4.A,
/// §8 scenario 1).
pub fn validate_no_overlap(ports: &[PublishedPort]) -> CoreResult<()> {
    if ports.len() > boxd_shared::constants::limits::MAX_PUBLISHED_PORTS {
        return Err(CoreError::InvalidArgument(format!(
            "at most {} published ports are allowed",
            boxd_shared::constants::limits::MAX_PUBLISHED_PORTS
        )));
    }

    for (i, a) in ports.iter().enumerate() {
        for b in &ports[i + 1..] {
            let a_start = a.host_port as u32;
            let a_end = a_start + a.count;
            let b_start = b.host_port as u32;
            let b_end = b_start + b.count;
            if a_start < b_end && b_start < a_end {
                return Err(CoreError::InvalidArgument(format!(
                    "published port ranges overlap: {a} and {b}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_full_spec_with_ranges() {
        let p = parse_published_port("127.0.0.1:8080-8179:9000-9099/tcp").unwrap();
        assert_eq!(p.host_ip.to_string(), "127.0.0.1");
        assert_eq!(p.host_port, 8080);
        assert_eq!(p.container_port, 9000);
        assert_eq!(p.proto, Proto::Tcp);
        assert_eq!(p.count, 100);
    }

    #[test]
    fn scenario_minimal_defaults() {
        let p = parse_published_port("8080:8000").unwrap();
        assert_eq!(p.host_ip.to_string(), "0.0.0.0");
        assert_eq!(p.host_port, 8080);
        assert_eq!(p.container_port, 8000);
        assert_eq!(p.proto, Proto::Tcp);
        assert_eq!(p.count, 1);
    }

    #[test]
    fn scenario_mismatched_counts_rejected() {
        let err = parse_published_port("8000-8000:9000-9001").unwrap_err();
        assert!(err.to_string().contains("counts are not equal"));
    }

    #[test]
    fn scenario_overlap_detected() {
        let a = parse_published_port("8080-8100:9000-9020").unwrap();
        let b = parse_published_port("8100-8120:9100-9120").unwrap();
        assert!(validate_no_overlap(&[a, b]).is_err());
    }

    #[test]
    fn round_trip_single_port() {
        let original = "0.0.0.0:8080:9000/tcp";
        let parsed = parse_published_port(original).unwrap();
        assert_eq!(parsed.to_string(), original);
    }

    #[test]
    fn round_trip_range() {
        let original = "0.0.0.0:8080-8089:9000-9009/udp";
        let parsed = parse_published_port(original).unwrap();
        assert_eq!(parsed.to_string(), original);
    }

    #[test]
    fn ipv6_host_literal() {
        let p = parse_published_port("[::1]:8080:9000/tcp").unwrap();
        assert_eq!(p.host_ip.to_string(), "::1");
    }
}
