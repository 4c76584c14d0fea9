//! Discovery Link header
//!
//! Points subscribers at the hub's public URL. Attached to every outgoing
//! response except CORS preflight requests, where an extra header would
//! confuse preflight caching.

use axum::http::{header, HeaderMap, HeaderValue, Method};

pub const LINK_REL: &str = "tidings";

/// The Link header value advertising the hub at `hub_url`.
pub fn discovery_link(hub_url: &str) -> String {
    format!("<{hub_url}>; rel=\"{LINK_REL}\"")
}

/// Append the discovery link to `response_headers`, unless the request is a
/// CORS preflight.
pub fn add_discovery_link(
    response_headers: &mut HeaderMap,
    method: &Method,
    request_headers: &HeaderMap,
    hub_url: &str,
) {
    if is_preflight(method, request_headers) {
        return;
    }

    if let Ok(value) = HeaderValue::from_str(&discovery_link(hub_url)) {
        response_headers.append(header::LINK, value);
    }
}

fn is_preflight(method: &Method, request_headers: &HeaderMap) -> bool {
    method == Method::OPTIONS && request_headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}
