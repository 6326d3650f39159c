//! Syntactic validation of the hostname and address carried by an update request.

use crate::error::Error;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use trust_dns_proto::rr::Name;

const MAX_HOSTNAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local and
    //            Ipv6Addr.is_unicast_link_local. Presently these are unstable so we home-roll.
    //            See also RFC 4193 and RFC 4291.
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
    static ref IPV6_LINK_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fe80::/10").unwrap();
}

/// Parse `hostname` as a DNS name made of letter/digit/hyphen labels, and check it against the
/// `allowed` hostnames. An empty allow-list permits any well-formed hostname.
pub fn hostname(hostname: &str, allowed: &[String]) -> Result<Name, Error> {
    let invalid = || Error::InvalidHostname(hostname.to_string());
    let bare = hostname.strip_suffix('.').unwrap_or(hostname);
    if bare.is_empty() || bare.ends_with('.') || bare.len() > MAX_HOSTNAME_LEN {
        return Err(invalid());
    }

    let name = Name::from_ascii(bare).map_err(|_| invalid())?;
    if name.num_labels() == 0 || !name.iter().all(valid_label) {
        return Err(invalid());
    }

    if !allowed.is_empty()
        && !allowed
            .iter()
            .any(|a| a.strip_suffix('.').unwrap_or(a).eq_ignore_ascii_case(bare))
    {
        return Err(invalid());
    }
    Ok(name)
}

fn valid_label(label: &[u8]) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        && label.first() != Some(&b'-')
        && label.last() != Some(&b'-')
}

/// Parse `address` as an IPv4 or IPv6 literal. Unless `allow_private` is set, only publicly
/// routable unicast addresses are accepted.
pub fn address(address: &str, allow_private: bool) -> Result<IpAddr, Error> {
    let ip = IpAddr::from_str(address.trim())
        .map_err(|_| Error::InvalidAddress(address.to_string()))?;
    if !allow_private && !is_public(ip) {
        return Err(Error::DisallowedAddress(ip));
    }
    Ok(ip)
}

fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified())
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    !(ip.is_loopback()
        || ip.is_multicast()
        || ip.is_unspecified()
        || IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(ip))
        || IPV6_LINK_LOCAL_NETWORK.contains(IpAddr::V6(ip)))
}
