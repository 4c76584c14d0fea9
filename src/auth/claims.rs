//! Token claim structure

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Claims carried by a hub token.
///
/// `publish` and `subscribe` must each be an array of strings when present;
/// any other shape fails verification. Array order is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Topic selectors the bearer may publish to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<Vec<String>>,

    /// Topic selectors the bearer may subscribe to (`*` = all).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<Vec<String>>,

    /// Free-form claims forwarded to application code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    /// Expiration time (seconds since the Unix epoch).
    pub exp: u64,

    /// Issued-at time (seconds since the Unix epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

impl Claims {
    /// Build claims expiring `ttl` from now.
    pub fn new(
        publish: Option<Vec<String>>,
        subscribe: Option<Vec<String>>,
        payload: Option<serde_json::Value>,
        ttl: Duration,
    ) -> Self {
        let now = unix_now();
        Self {
            publish,
            subscribe,
            payload,
            exp: now + ttl.as_secs(),
            iat: Some(now),
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_expiry_after_now() {
        let claims = Claims::new(None, None, None, Duration::from_secs(60));
        assert!(claims.exp > unix_now());
        assert!(claims.iat.unwrap() <= claims.exp);
    }

    #[test]
    fn test_claims_json_shape() {
        let claims = Claims::new(
            Some(vec!["https://example.com/books/{id}".to_string()]),
            Some(vec!["*".to_string()]),
            Some(serde_json::json!({"user": "alice"})),
            Duration::from_secs(60),
        );

        let json = serde_json::to_value(&claims).unwrap();
        assert!(json["publish"].is_array());
        assert_eq!(json["subscribe"][0], "*");
        assert_eq!(json["payload"]["user"], "alice");
    }

    #[test]
    fn test_malformed_claim_arrays_rejected() {
        // publish must be an array of strings, not a bare string
        let err = serde_json::from_str::<Claims>(r#"{"publish": "nope", "exp": 1}"#);
        assert!(err.is_err());

        let err = serde_json::from_str::<Claims>(r#"{"subscribe": [1, 2], "exp": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_claim_arrays_preserve_order() {
        let parsed: Claims =
            serde_json::from_str(r#"{"subscribe": ["b", "a", "c"], "exp": 1}"#).unwrap();
        assert_eq!(parsed.subscribe.unwrap(), vec!["b", "a", "c"]);
    }
}
