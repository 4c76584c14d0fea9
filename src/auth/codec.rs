//! Token signing and verification

use crate::auth::Claims;
use crate::error::{Error, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;

const SUPPORTED_ALGORITHMS: &[&str] = &["HS256", "HS384", "HS512"];

/// Signs and verifies hub tokens with a shared secret.
///
/// Verification is pure: no state is read or written, and claim arrays come
/// back in the order they were signed.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    algorithm: Algorithm,
}

impl TokenCodec {
    /// Create a codec for the given secret and algorithm name.
    /// Unsupported algorithm names are a configuration error.
    pub fn new(secret: &[u8], algorithm: &str) -> Result<Self> {
        let algorithm = match algorithm {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(Error::Config(format!(
                    "unsupported token algorithm \"{}\", expected one of \"{}\"",
                    other,
                    SUPPORTED_ALGORITHMS.join("\", \"")
                )))
            }
        };

        Ok(Self {
            secret: secret.to_vec(),
            algorithm,
        })
    }

    /// Produce a signed, time-bounded token for the given claims.
    pub fn sign(&self, claims: &Claims) -> Result<String> {
        encode(
            &Header::new(self.algorithm),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| Error::Config(format!("token signing failed: {e}")))
    }

    /// Verify a token and return its claims.
    ///
    /// Fails if the signature is invalid, the token is expired, or the claim
    /// structure is malformed.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Auth(e.to_string()))
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
