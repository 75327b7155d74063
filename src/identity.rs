//! The stable per-machine user identifier.
//!
//! The identifier is the SHA-256 of the first external IPv4 address, as
//! lowercase hex. It only needs to be stable for one machine on one network.

use std::net::{IpAddr, Ipv4Addr};

use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Cannot find an IP to hash")]
    NoAddress,
    #[error("Failed to list network interfaces: {0}")]
    Interfaces(String),
}

/// Hashes the first non-loopback IPv4 address on this machine.
pub fn user_uuid() -> Result<String, IdentityError> {
    let interfaces =
        NetworkInterface::show().map_err(|e| IdentityError::Interfaces(e.to_string()))?;
    let addresses = interfaces
        .iter()
        .flat_map(|iface| iface.addr.iter().map(|a| a.ip()));
    first_external_v4(addresses)
        .map(hash_address)
        .ok_or(IdentityError::NoAddress)
}

fn first_external_v4(addresses: impl IntoIterator<Item = IpAddr>) -> Option<Ipv4Addr> {
    addresses.into_iter().find_map(|ip| match ip {
        IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
        _ => None,
    })
}

pub fn hash_address(ip: Ipv4Addr) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_sha256_of_dotted_quad() {
        assert_eq!(
            hash_address(Ipv4Addr::new(127, 0, 0, 1)),
            "12ca17b49af2289436f303e0166030a21e525d266e209267433801a8fd4071a0"
        );
        assert_eq!(hash_address(Ipv4Addr::new(10, 0, 0, 7)).len(), 64);
    }

    #[test]
    fn test_skips_loopback_and_v6() {
        let addresses: Vec<IpAddr> = vec![
            "127.0.0.1".parse().unwrap(),
            "fe80::1".parse().unwrap(),
            "192.168.1.20".parse().unwrap(),
            "10.0.0.2".parse().unwrap(),
        ];
        assert_eq!(
            first_external_v4(addresses),
            Some(Ipv4Addr::new(192, 168, 1, 20))
        );
        assert_eq!(first_external_v4(vec!["127.0.0.1".parse().unwrap()]), None);
        assert_eq!(IdentityError::NoAddress.to_string(), "Cannot find an IP to hash");
    }
}
