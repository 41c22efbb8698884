//! Shared utilities for collectors and the HTTP listener:
//! - `host:port` splitting that understands `[v6]:port`, bare hosts and `:port`.

use anyhow::{Context, Result, anyhow};

/// Split `addr` into host and port.
///
/// Accepts `host:port`, `[::1]:port`, `:port` (empty host) and, when `default_port` is
/// given, a bare `host` or `[::1]`. Brackets are removed from IPv6 hosts.
///
/// # Errors
///
/// Returns an error if the port is missing (and no default is given) or is not a valid `u16`.
pub fn split_host_port(addr: &str, default_port: Option<u16>) -> Result<(String, u16)> {
    let addr = addr.trim();

    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| anyhow!("missing ']' in address {addr}"))?;
        return match tail.strip_prefix(':') {
            Some(port) => Ok((host.to_string(), parse_port(port, addr)?)),
            None if tail.is_empty() => default_port
                .map(|port| (host.to_string(), port))
                .ok_or_else(|| anyhow!("missing port in address {addr}")),
            None => Err(anyhow!("unexpected characters after ']' in address {addr}")),
        };
    }

    match addr.rsplit_once(':') {
        // More than one colon without brackets: a bare IPv6 address.
        Some((host, _)) if host.contains(':') => default_port
            .map(|port| (addr.to_string(), port))
            .ok_or_else(|| anyhow!("IPv6 address {addr} must be written as [host]:port")),
        Some((host, port)) => Ok((host.to_string(), parse_port(port, addr)?)),
        None => default_port
            .map(|port| (addr.to_string(), port))
            .ok_or_else(|| anyhow!("missing port in address {addr}")),
    }
}

fn parse_port(port: &str, addr: &str) -> Result<u16> {
    port.parse::<u16>()
        .with_context(|| format!("invalid port in address {addr}"))
}
