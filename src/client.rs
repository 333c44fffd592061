use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::ConfigError;

/// Transport settings applied when a virtual user's session starts.
///
/// Passed explicitly into every session so the TLS setting is visible at each
/// call site. `skip_tls_verify` is for development and test targets only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub skip_tls_verify: bool,
    pub request_timeout: Duration,
    /// DNS override in the form `hostname:ip:port`
    pub resolve_target_addr: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            skip_tls_verify: false,
            request_timeout: Duration::from_secs(30),
            resolve_target_addr: None,
        }
    }
}

/// Builds a reqwest HTTP client for one session.
pub fn build_client(config: &TransportConfig) -> Result<reqwest::Client, ConfigError> {
    let mut client_builder = reqwest::Client::builder().timeout(config.request_timeout);

    if let Some(ref resolve_str) = config.resolve_target_addr {
        if !resolve_str.is_empty() {
            let (hostname, socket_addr) = parse_resolve_override(resolve_str)?;
            client_builder = client_builder.resolve(&hostname, socket_addr);
        }
    }

    if config.skip_tls_verify {
        // With rustls this also skips the hostname check.
        client_builder = client_builder.danger_accept_invalid_certs(true);
    }

    Ok(client_builder.build()?)
}

/// Logs the transport settings once at startup.
pub fn log_transport_config(config: &TransportConfig) {
    if config.skip_tls_verify {
        warn!("Skipping TLS certificate verification. Use only against development targets.");
    }
    if let Some(ref resolve_str) = config.resolve_target_addr {
        info!(resolve = %resolve_str, "DNS override configured");
    }
}

/// Parses `hostname:ip:port` into the hostname and the address to connect to.
pub fn parse_resolve_override(resolve_str: &str) -> Result<(String, SocketAddr), ConfigError> {
    let invalid = |reason: String| {
        ConfigError::invalid("RESOLVE_TARGET_ADDR", resolve_str, reason)
    };

    let parts: Vec<&str> = resolve_str.split(':').collect();
    if parts.len() != 3 {
        return Err(invalid(
            "Expected the format 'hostname:ip:port'.".to_string(),
        ));
    }

    let hostname = parts[0].trim();
    let ip = parts[1].trim();
    let port_str = parts[2].trim();

    if hostname.is_empty() || ip.is_empty() || port_str.is_empty() {
        return Err(invalid(
            "hostname, IP and port must all be non-empty. Format: 'hostname:ip:port'".to_string(),
        ));
    }

    let port: u16 = port_str
        .parse()
        .map_err(|e| invalid(format!("Failed to parse port '{}': {}", port_str, e)))?;

    let socket_addr: SocketAddr = format!("{}:{}", ip, port)
        .parse()
        .map_err(|e| invalid(format!("Failed to parse IP '{}': {}", ip, e)))?;

    Ok((hostname.to_string(), socket_addr))
}
