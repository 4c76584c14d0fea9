//! Named hub lookup
//!
//! An explicit name-to-hub mapping passed at construction. There is no
//! process-wide registry; whoever needs hubs receives this value.

use crate::error::{Error, Result};
use crate::hub::Hub;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct HubRegistry {
    hubs: BTreeMap<String, Arc<Hub>>,
    default: String,
}

impl HubRegistry {
    /// The default hub must be one of the configured hubs.
    pub fn new(hubs: BTreeMap<String, Arc<Hub>>, default: impl Into<String>) -> Result<Self> {
        let default = default.into();
        if !hubs.contains_key(&default) {
            return Err(Error::Config(format!(
                "default hub \"{}\" is not configured",
                default
            )));
        }

        Ok(Self { hubs, default })
    }

    /// Convenience constructor for the single-hub case.
    pub fn single(name: impl Into<String>, hub: Arc<Hub>) -> Self {
        let name = name.into();
        let mut hubs = BTreeMap::new();
        hubs.insert(name.clone(), hub);
        Self {
            hubs,
            default: name,
        }
    }

    /// Look up a hub by name; `None` selects the default hub. Unknown names
    /// are rejected with the valid names enumerated.
    pub fn get(&self, name: Option<&str>) -> Result<&Arc<Hub>> {
        let name = name.unwrap_or(&self.default);
        self.hubs.get(name).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "invalid hub name \"{}\", expected one of \"{}\"",
                name,
                self.names().join("\", \"")
            ))
        })
    }

    pub fn default_hub(&self) -> &Arc<Hub> {
        &self.hubs[&self.default]
    }

    pub fn names(&self) -> Vec<&str> {
        self.hubs.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthGateway, TokenCodec};
    use crate::hub::HubConfig;

    fn hub() -> Arc<Hub> {
        let codec = TokenCodec::new(b"secret", "HS256").unwrap();
        Arc::new(Hub::new(AuthGateway::new(codec), HubConfig::default()))
    }

    #[test]
    fn test_get_default_and_named() {
        let registry = HubRegistry::single("main", hub());
        assert!(registry.get(None).is_ok());
        assert!(registry.get(Some("main")).is_ok());
    }

    #[test]
    fn test_unknown_name_enumerates_valid_ones() {
        let mut hubs = BTreeMap::new();
        hubs.insert("alpha".to_string(), hub());
        hubs.insert("beta".to_string(), hub());
        let registry = HubRegistry::new(hubs, "alpha").unwrap();

        let err = registry.get(Some("gamma")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gamma"));
        assert!(msg.contains("alpha"));
        assert!(msg.contains("beta"));
    }

    #[test]
    fn test_missing_default_is_config_error() {
        let err = HubRegistry::new(BTreeMap::new(), "main").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
