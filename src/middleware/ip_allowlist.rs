//! Network allowlist for the fulfillment-provider webhook.
//!
//! The provider does not sign its callbacks, so this gate restricts the
//! route to configured CIDR ranges. The client address comes from
//! `X-Forwarded-For` at the configured trusted proxy depth, falling back
//! to the socket peer address.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::AllowedIps;

#[derive(Clone, Debug)]
pub struct ProviderWebhookGate {
    pub allowed_ips: AllowedIps,
    pub trusted_proxy_depth: usize,
}

pub async fn provider_ip_allowlist(
    State(gate): State<ProviderWebhookGate>,
    req: Request,
    next: Next,
) -> Response {
    let client_ip = extract_client_ip(req.headers(), req.extensions(), gate.trusted_proxy_depth);

    if !is_allowed(client_ip, &gate.allowed_ips) {
        tracing::warn!(client_ip = ?client_ip, "blocked provider webhook from non-allowlisted address");
        return StatusCode::FORBIDDEN.into_response();
    }

    next.run(req).await
}

fn is_allowed(client_ip: Option<IpAddr>, allowed_ips: &AllowedIps) -> bool {
    match allowed_ips {
        AllowedIps::Any => true,
        AllowedIps::Cidrs(cidrs) => client_ip
            .map(|ip| cidrs.iter().any(|cidr| cidr.contains(&ip)))
            .unwrap_or(false),
    }
}

fn extract_client_ip(
    headers: &HeaderMap,
    extensions: &axum::http::Extensions,
    trusted_proxy_depth: usize,
) -> Option<IpAddr> {
    if let Some(ip) = extract_from_x_forwarded_for(headers, trusted_proxy_depth) {
        return Some(ip);
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip())
}

fn extract_from_x_forwarded_for(headers: &HeaderMap, trusted_proxy_depth: usize) -> Option<IpAddr> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;

    let chain: Vec<IpAddr> = raw
        .split(',')
        .map(str::trim)
        .filter_map(parse_ip_entry)
        .collect();

    if chain.is_empty() || trusted_proxy_depth >= chain.len() {
        return None;
    }

    let index = chain.len().saturating_sub(1 + trusted_proxy_depth);
    chain.get(index).copied()
}

fn parse_ip_entry(value: &str) -> Option<IpAddr> {
    if let Ok(ip) = IpAddr::from_str(value) {
        return Some(ip);
    }

    if let Ok(addr) = SocketAddr::from_str(value) {
        return Some(addr.ip());
    }

    None
}
