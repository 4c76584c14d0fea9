//! Configuration tree and validation
//!
//! Pure data validation over a plain structure, independent of the core.
//! The cross-field rules mirror the option tree this hub is wired from:
//! per hub, exactly one token source may be configured, and the deprecated
//! top-level `jwt`/`jwt_provider` shortcuts are mutually exclusive with the
//! `token` block and with each other.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

fn default_algorithm() -> String {
    "HS256".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hubs: BTreeMap<String, HubOptions>,
    #[serde(default)]
    pub default_hub: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HubOptions {
    /// URL of the hub's public endpoint.
    pub url: Option<String>,
    pub token: Option<TokenOptions>,
    /// Deprecated shortcut for `token.value`.
    pub jwt: Option<String>,
    /// Deprecated shortcut for `token.provider`.
    pub jwt_provider: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenOptions {
    /// A literal token to use.
    pub value: Option<String>,
    /// Name of a component supplying the token.
    pub provider: Option<String>,
    /// Name of a component creating tokens on demand.
    pub factory: Option<String>,
    /// Secret for signing tokens locally.
    pub secret: Option<String>,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Topic selectors granted for publishing when minting locally.
    #[serde(default)]
    pub publish: Vec<String>,
    /// Topic selectors granted for subscribing when minting locally.
    #[serde(default)]
    pub subscribe: Vec<String>,
}

impl Config {
    /// Validate the whole tree. Fatal at startup.
    pub fn validate(&self) -> Result<()> {
        for (name, hub) in &self.hubs {
            hub.validate()
                .map_err(|e| Error::Config(format!("hub \"{name}\": {e}")))?;
        }

        if let Some(default) = &self.default_hub {
            if !self.hubs.contains_key(default) {
                return Err(Error::Config(format!(
                    "default hub \"{}\" is not configured, expected one of \"{}\"",
                    default,
                    self.hubs.keys().cloned().collect::<Vec<_>>().join("\", \"")
                )));
            }
        }

        Ok(())
    }
}

impl HubOptions {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.jwt.is_some() && self.jwt_provider.is_some() {
            return Err("\"jwt\" and \"jwt_provider\" cannot be used together".to_string());
        }
        if self.jwt.is_some() && self.token.is_some() {
            return Err("\"jwt\" and \"token\" cannot be used together".to_string());
        }
        if self.jwt_provider.is_some() && self.token.is_some() {
            return Err("\"jwt_provider\" and \"token\" cannot be used together".to_string());
        }
        if self.jwt.is_none() && self.jwt_provider.is_none() && self.token.is_none() {
            return Err(
                "you must specify at least one of \"jwt\", \"jwt_provider\", and \"token\""
                    .to_string(),
            );
        }

        if let Some(token) = &self.token {
            if token.value.is_some() && token.provider.is_some() {
                return Err(
                    "\"token.value\" and \"token.provider\" cannot be used together".to_string(),
                );
            }
            if token.value.is_none()
                && token.provider.is_none()
                && token.factory.is_none()
                && token.secret.is_none()
            {
                return Err("you must specify at least one of \"token.value\", \"token.provider\", \"token.factory\", and \"token.secret\"".to_string());
            }
        }

        Ok(())
    }
}
