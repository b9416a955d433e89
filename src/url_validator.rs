//! Provider URL guard.
//!
//! Third-party TRAPI endpoints are typed in by the user and then fetched by
//! this server, so every such URL goes through here first:
//! - only http/https schemes
//! - optional domain allowlist (`TRAPI_ALLOWED_API_DOMAINS`)
//! - internal IP address blocking (private ranges, loopback, link-local)
//! - DNS rebinding protection: every resolved address is checked

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error)]
pub enum UrlValidationError {
    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),
    #[error("provider URLs must be http or https (got {0})")]
    UnsupportedScheme(String),
    #[error("provider domain {0} is not in the allowlist")]
    DomainNotAllowed(String),
    #[error("provider resolves to an internal address ({0})")]
    InternalIpAddress(String),
    #[error("could not resolve provider host: {0}")]
    DnsResolutionFailed(String),
}

/// Special-purpose IPv4 blocks beyond what `Ipv4Addr` classifies itself:
/// documentation, shared address space, protocol assignments, benchmarking.
const RESERVED_V4: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    (Ipv4Addr::new(100, 64, 0, 0), 10),
    (Ipv4Addr::new(192, 0, 0, 0), 24),
    (Ipv4Addr::new(198, 18, 0, 0), 15),
];

fn in_block(ip: &Ipv4Addr, net: &Ipv4Addr, prefix: u8) -> bool {
    let mask = u32::MAX << (32 - u32::from(prefix));
    u32::from(*ip) & mask == u32::from(*net) & mask
}

fn is_internal_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || RESERVED_V4.iter().any(|(net, prefix)| in_block(ip, net, *prefix))
}

fn is_internal_ipv6(ip: &Ipv6Addr) -> bool {
    let head = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.to_ipv4_mapped().is_some_and(|v4| is_internal_ipv4(&v4))
        || head & 0xfe00 == 0xfc00 // unique local
        || head & 0xffc0 == 0xfe80 // link-local
        || (head == 0x2001 && ip.segments()[1] == 0x0db8)
}

fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => is_internal_ipv6(v6),
    }
}

/// An empty allowlist admits every public host.
fn is_domain_allowed(host: &str, allowed_domains: &[String]) -> bool {
    if allowed_domains.is_empty() {
        return true;
    }
    let host = host.to_ascii_lowercase();
    allowed_domains.iter().map(|d| d.trim().to_ascii_lowercase()).any(|d| {
        host == d || host.strip_suffix(d.as_str()).is_some_and(|rest| rest.ends_with('.'))
    })
}

/// Parse and check a URL without touching the network.
pub fn check_provider_url(url_str: &str, allowed_domains: &[String]) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlValidationError::InvalidUrl(e.to_string()))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .ok_or_else(|| UrlValidationError::InvalidUrl("No host in URL".to_string()))?;

    if !is_domain_allowed(host, allowed_domains) {
        return Err(UrlValidationError::DomainNotAllowed(host.to_string()));
    }

    if let Ok(ip) = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        if is_internal_ip(&ip) {
            return Err(UrlValidationError::InternalIpAddress(ip.to_string()));
        }
    }

    Ok(url)
}

/// Validate a user-supplied provider URL, including resolution of its host.
pub async fn validate_provider_url(
    url_str: &str,
    allowed_domains: &[String],
) -> Result<Url, UrlValidationError> {
    let url = check_provider_url(url_str, allowed_domains)?;
    let host = url
        .host_str()
        .ok_or_else(|| UrlValidationError::InvalidUrl("No host in URL".to_string()))?;
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| UrlValidationError::DnsResolutionFailed(e.to_string()))?;
    for addr in addrs {
        if is_internal_ip(&addr.ip()) {
            return Err(UrlValidationError::InternalIpAddress(addr.ip().to_string()));
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist() {
        let allowed = vec!["transltr.io".to_string(), "renci.org".to_string()];
        assert!(is_domain_allowed("transltr.io", &allowed));
        assert!(is_domain_allowed("arax.ci.transltr.io", &allowed));
        assert!(!is_domain_allowed("evil.com", &allowed));
        assert!(!is_domain_allowed("transltr.io.evil.com", &allowed));
        assert!(is_domain_allowed("anything.example", &[]));
    }

    #[test]
    fn test_internal_ips() {
        assert!(is_internal_ipv4(&Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(192, 168, 1, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(169, 254, 1, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(100, 100, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(198, 19, 4, 4)));
        assert!(!is_internal_ipv4(&Ipv4Addr::new(198, 20, 0, 1)));
        assert!(!is_internal_ipv4(&Ipv4Addr::new(8, 8, 8, 8)));
        assert!(is_internal_ipv6(&Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_rejects_other_schemes() {
        let result = check_provider_url("ftp://example.org/query", &[]);
        assert!(matches!(result, Err(UrlValidationError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_rejects_literal_internal_ip() {
        let result = check_provider_url("http://127.0.0.1:8080/query", &[]);
        assert!(matches!(result, Err(UrlValidationError::InternalIpAddress(_))));
    }

    #[test]
    fn test_rejects_unknown_domain() {
        let allowed = vec!["transltr.io".to_string()];
        let result = check_provider_url("https://evil.com/query", &allowed);
        assert!(matches!(result, Err(UrlValidationError::DomainNotAllowed(_))));
    }

    #[test]
    fn test_accepts_public_url() {
        let url = check_provider_url("https://kp.example.org/trapi/query", &[]).unwrap();
        assert_eq!(url.host_str(), Some("kp.example.org"));
    }
}
