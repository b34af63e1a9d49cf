//! Random value helpers for default field maps.

use rand::prelude::*;

const HOSTS: &[&str] = &[
    "web-01", "web-02", "api-gw-01", "db-primary", "fileserver", "build-agent-3", "jump-host",
];

const USERS: &[&str] = &[
    "alice", "bob", "svc_backup", "jdoe", "administrator", "mwilson", "deploy",
];

const DOMAINS: &[&str] = &["CORP", "CONTOSO", "LAB"];

const REGIONS: &[&str] = &["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-2"];

/// Pick one entry of a non-empty static list.
pub fn pick(items: &[&'static str]) -> &'static str {
    items.choose(&mut rand::rng()).copied().unwrap_or_default()
}

pub fn private_ip() -> String {
    let mut rng = rand::rng();
    match rng.random_range(0..3) {
        0 => format!("10.{}.{}.{}", rng.random_range(0..255), rng.random_range(0..255), rng.random_range(1..255)),
        1 => format!("172.{}.{}.{}", rng.random_range(16..32), rng.random_range(0..255), rng.random_range(1..255)),
        _ => format!("192.168.{}.{}", rng.random_range(0..255), rng.random_range(1..255)),
    }
}

/// Routable-looking address outside the RFC 1918 ranges.
pub fn public_ip() -> String {
    let mut rng = rand::rng();
    let first = *[45u8, 62, 89, 103, 141, 185, 193, 203].choose(&mut rng).unwrap_or(&185);
    format!(
        "{}.{}.{}.{}",
        first,
        rng.random_range(0..255),
        rng.random_range(0..255),
        rng.random_range(1..255)
    )
}

pub fn ephemeral_port() -> u16 {
    rand::rng().random_range(49152..=65535)
}

pub fn hostname() -> &'static str {
    pick(HOSTS)
}

pub fn username() -> &'static str {
    pick(USERS)
}

pub fn domain() -> &'static str {
    pick(DOMAINS)
}

pub fn aws_region() -> &'static str {
    pick(REGIONS)
}

/// 12-digit AWS account id.
pub fn aws_account_id() -> String {
    format!("{:012}", rand::rng().random_range(100_000_000_000u64..999_999_999_999))
}

pub fn hex_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from_digit(rng.random_range(0..16), 16).unwrap_or('0'))
        .collect()
}

pub fn flow_id() -> u64 {
    rand::rng().random_range(1_000_000_000_000_000..2_000_000_000_000_000)
}

pub fn ratio(low: f64, high: f64) -> f64 {
    let value = rand::rng().random_range(low..high);
    (value * 100.0).round() / 100.0
}

pub fn count(low: u64, high: u64) -> u64 {
    rand::rng().random_range(low..high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_ip_is_rfc1918() {
        for _ in 0..50 {
            let ip: std::net::Ipv4Addr = private_ip().parse().unwrap();
            assert!(ip.is_private(), "{ip} is not private");
        }
    }

    #[test]
    fn test_public_ip_is_not_private() {
        for _ in 0..50 {
            let ip: std::net::Ipv4Addr = public_ip().parse().unwrap();
            assert!(!ip.is_private());
        }
    }

    #[test]
    fn test_hex_id_length() {
        let id = hex_id(32);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ephemeral_port_range() {
        for _ in 0..50 {
            assert!(ephemeral_port() >= 49152);
        }
    }
}
