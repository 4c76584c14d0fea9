//! Authentication and authorization
//!
//! Tokens are compact JWTs carrying topic-permission claims:
//! - `publish`: topic selectors the bearer may publish to
//! - `subscribe`: topic selectors the bearer may receive (`*` = all)
//! - `payload`: free-form claims forwarded untouched to application code
//!
//! Claims are verified per request and never persisted.

mod claims;
mod codec;
mod gateway;

pub use claims::Claims;
pub use codec::TokenCodec;
pub use gateway::{AuthGateway, Authorization};
