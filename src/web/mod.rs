//! HTTP artifacts surrounding the hub: the authorization cookie and the
//! discovery Link header. Both are string-level helpers so they stay usable
//! from any HTTP layer.

mod cookie;
mod discovery;

pub use cookie::{authorization_cookie, AUTHORIZATION_COOKIE_NAME};
pub use discovery::{add_discovery_link, discovery_link, LINK_REL};
