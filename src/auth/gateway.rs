//! Authorization gateway
//!
//! Thin façade over [`TokenCodec`] that turns a raw token into typed,
//! compiled authorization for one side of the hub (publish or subscribe).
//! Exists so claim parsing stays out of the hub itself.

use crate::auth::{Claims, TokenCodec};
use crate::error::{Error, Result};
use crate::topic::TopicSelector;

/// Verified authorization for a single request.
#[derive(Debug, Clone)]
pub struct Authorization {
    /// Compiled selectors from the relevant claim, input order preserved.
    pub selectors: Vec<TopicSelector>,
    /// Free-form claims forwarded to application code.
    pub payload: Option<serde_json::Value>,
}

impl Authorization {
    /// Whether any selector matches the given topic.
    pub fn covers(&self, topic: &str) -> bool {
        self.selectors.iter().any(|s| s.matches(topic))
    }
}

/// Validates tokens against required topic claims before granting access to
/// hub operations.
#[derive(Debug, Clone)]
pub struct AuthGateway {
    codec: TokenCodec,
}

impl AuthGateway {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    /// Verify a publisher token. The token must carry a `publish` claim.
    pub fn publisher_claims(&self, token: &str) -> Result<Authorization> {
        let claims = self.codec.verify(token)?;
        let patterns = claims
            .publish
            .ok_or_else(|| Error::Forbidden("token carries no publish claim".to_string()))?;

        Ok(Authorization {
            selectors: TopicSelector::compile(&patterns),
            payload: claims.payload,
        })
    }

    /// Verify a subscriber token. The token must carry a `subscribe` claim.
    pub fn subscriber_claims(&self, token: &str) -> Result<Authorization> {
        let claims = self.codec.verify(token)?;
        let patterns = claims
            .subscribe
            .ok_or_else(|| Error::Forbidden("token carries no subscribe claim".to_string()))?;

        Ok(Authorization {
            selectors: TopicSelector::compile(&patterns),
            payload: claims.payload,
        })
    }

    /// Verify a token without requiring any particular claim.
    pub fn claims(&self, token: &str) -> Result<Claims> {
        self.codec.verify(token)
    }
}
