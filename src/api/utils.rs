//! Request helpers shared by the route handlers

use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::id::Id;
use crate::storage::UNKNOWN_ADDRESS;

use super::error::ApiError;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Source address of a request
///
/// First `X-Forwarded-For` entry, else `X-Real-IP`, else the peer address.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(first) = header_value(headers, FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header_value(headers, REAL_IP) {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

/// Path ids that do not parse cannot name an existing server
pub fn parse_server_id(raw: &str) -> Result<Id, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("server '{raw}' not found")))
}
