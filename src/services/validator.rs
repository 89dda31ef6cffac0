//! Target validation. Pure function over the input string; nothing is
//! executed until a target has passed every check here.

use std::net::Ipv4Addr;

use url::{Host, Url};

use crate::errors::AppError;
use crate::models::scan::ScanTarget;

/// Validate a raw target string into a [`ScanTarget`].
///
/// Rejects empty input, non-absolute and non-http(s) URLs, loopback and
/// RFC1918 hosts, and explicit privileged ports.
pub fn validate_target(input: &str) -> Result<ScanTarget, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Target URL is required".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|_| {
        AppError::Validation("Please enter a valid URL (e.g., https://example.com)".to_string())
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::Validation(
            "Invalid URL format. URL must start with http:// or https://".to_string(),
        ));
    }

    let hostname = match url.host() {
        Some(Host::Domain(domain)) => {
            if domain.eq_ignore_ascii_case("localhost") {
                return Err(AppError::PrivateNetwork);
            }
            domain.to_string()
        }
        Some(Host::Ipv4(ip)) => {
            if is_private_ipv4(ip) {
                return Err(AppError::PrivateNetwork);
            }
            ip.to_string()
        }
        Some(Host::Ipv6(ip)) => {
            if ip.is_loopback() {
                return Err(AppError::PrivateNetwork);
            }
            ip.to_string()
        }
        None => {
            return Err(AppError::Validation(
                "Please enter a valid URL (e.g., https://example.com)".to_string(),
            ))
        }
    };

    if let Some(port) = url.port() {
        if port <= 1024 {
            return Err(AppError::PrivilegedPort);
        }
    }

    Ok(ScanTarget {
        domain: hostname.clone(),
        hostname,
        url,
    })
}

/// Loopback and RFC1918 ranges: 127/8, 10/8, 172.16/12, 192.168/16.
fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_without_port() {
        let target = validate_target("https://example.com").unwrap();
        assert_eq!(target.hostname, "example.com");
        assert_eq!(target.domain, "example.com");
        assert_eq!(target.url.as_str(), "https://example.com/");
    }

    #[test]
    fn accepts_http_with_unprivileged_port() {
        let target = validate_target("http://example.com:8080/app").unwrap();
        assert_eq!(target.hostname, "example.com");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert!(validate_target("  https://example.com  ").is_ok());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            validate_target("   "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_relative_and_garbage_input() {
        assert!(validate_target("example.com").is_err());
        assert!(validate_target("not a url").is_err());
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(matches!(
            validate_target("ftp://example.com"),
            Err(AppError::Validation(_))
        ));
        assert!(validate_target("file:///etc/passwd").is_err());
    }

    #[test]
    fn rejects_private_hosts() {
        for host in [
            "127.0.0.1",
            "localhost",
            "10.1.2.3",
            "192.168.0.5",
            "172.20.0.1",
        ] {
            let result = validate_target(&format!("https://{host}"));
            assert!(
                matches!(result, Err(AppError::PrivateNetwork)),
                "expected private-network rejection for {host}"
            );
        }
    }

    #[test]
    fn rejects_ipv6_loopback() {
        assert!(matches!(
            validate_target("http://[::1]:8080"),
            Err(AppError::PrivateNetwork)
        ));
    }

    #[test]
    fn allows_public_172_addresses() {
        // 172.32.0.0 is outside the 172.16/12 private block.
        assert!(validate_target("https://172.32.0.1").is_ok());
    }

    #[test]
    fn rejects_privileged_ports() {
        assert!(matches!(
            validate_target("https://example.com:1024"),
            Err(AppError::PrivilegedPort)
        ));
        assert!(matches!(
            validate_target("http://example.com:22"),
            Err(AppError::PrivilegedPort)
        ));
    }

    #[test]
    fn scheme_default_port_is_not_explicit() {
        // The URL parser drops a scheme-default port, so https on 443 is
        // indistinguishable from no port at all. Same behavior as the
        // WHATWG URL API.
        assert!(validate_target("https://example.com:443").is_ok());
    }
}
