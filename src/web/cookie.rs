//! Authorization cookie creation
//!
//! The subscriber token travels in a cookie scoped by the hub's URL path and
//! domain, so it is only ever sent back to the hub's own host or a parent of
//! the requesting host. A hub on an unrelated domain is a hard failure, not
//! a silent no-op.

use crate::error::{Error, Result};

pub const AUTHORIZATION_COOKIE_NAME: &str = "tidingsAuthorization";

/// Build the `Set-Cookie` value carrying a subscriber token for the hub at
/// `hub_url`, as seen from a request to `requester_host`.
///
/// - Path and Secure come from the hub URL (Secure unless plain `http`).
/// - Domain is omitted when the hub host equals the requesting host, set to
///   the hub host when the requesting host is a parent domain of it, and a
///   `Forbidden` error otherwise.
pub fn authorization_cookie(hub_url: &str, requester_host: &str, token: &str) -> Result<String> {
    let url = parse_hub_url(hub_url)?;

    let mut cookie = format!(
        "{}={}; Path={}; HttpOnly; SameSite=Strict",
        AUTHORIZATION_COOKIE_NAME, token, url.path
    );

    if url.scheme != "http" {
        cookie.push_str("; Secure");
    }

    let hub_host = url.host.to_ascii_lowercase();
    let requester = requester_host.to_ascii_lowercase();

    if hub_host != requester {
        if !hub_host.ends_with(&format!(".{requester}")) {
            return Err(Error::Forbidden(format!(
                "unable to create authorization cookie for external domain \"{requester_host}\""
            )));
        }
        cookie.push_str("; Domain=");
        cookie.push_str(&hub_host);
    }

    Ok(cookie)
}

struct HubUrl {
    scheme: String,
    host: String,
    path: String,
}

fn parse_hub_url(url: &str) -> Result<HubUrl> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| Error::Config(format!("invalid hub URL \"{url}\"")))?;

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };

    // Strip port and userinfo; the cookie domain is host-only.
    let host = authority
        .rsplit_once('@')
        .map(|(_, h)| h)
        .unwrap_or(authority);
    let host = host.split_once(':').map(|(h, _)| h).unwrap_or(host);

    if host.is_empty() {
        return Err(Error::Config(format!("invalid hub URL \"{url}\": no host")));
    }

    // Drop query and fragment from the cookie path.
    let path = path.split(['?', '#']).next().unwrap_or("/");

    Ok(HubUrl {
        scheme: scheme.to_ascii_lowercase(),
        host: host.to_string(),
        path: path.to_string(),
    })
}
