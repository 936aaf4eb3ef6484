//! Resource provider trait
//!
//! A provider implements one package of type tokens (e.g. every
//! `aws:*:*` resource). The [`crate::LocalEngine`] routes registrations,
//! creates and invokes to the provider owning the token's package.

use crate::error::{EngineError, Result};
use crate::input::{Input, PropertyMap, input_str};
use crate::resource::Urn;
use crate::session::Registration;
use crate::state::ResourceState;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Package this provider owns (e.g. "aws", "azure-native")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    fn supports(&self, token: &str) -> bool;

    /// Validates a registration before anything is resolved. Only argument
    /// presence can be checked here since values may still be deferred.
    fn check(&self, registration: &Registration) -> Result<()> {
        if self.supports(&registration.token) {
            Ok(())
        } else {
            Err(EngineError::UnsupportedResource {
                provider: self.name().to_string(),
                token: registration.token.clone(),
            })
        }
    }

    /// Creates (or replaces) the resource and returns its outputs
    async fn create(&self, request: &CreateRequest) -> Result<PropertyMap>;

    async fn delete(&self, _resource: &ResourceState) -> Result<()> {
        Ok(())
    }

    /// Runs a provider function such as a lookup or a token derivation
    async fn invoke(&self, request: &InvokeRequest) -> Result<PropertyMap> {
        Err(EngineError::UnsupportedResource {
            provider: self.name().to_string(),
            token: request.token.clone(),
        })
    }
}

/// A resource ready to be created: every input is known
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub urn: Urn,
    pub token: String,
    pub name: String,
    pub inputs: PropertyMap,
    /// Provider settings: stack config under the package namespace,
    /// overridden by an explicit provider instance
    pub config: BTreeMap<String, String>,
}

impl CreateRequest {
    pub fn input_str(&self, key: &str) -> Option<&str> {
        input_str(&self.inputs, key)
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.input_str(key)
            .ok_or_else(|| EngineError::InvalidArgument {
                token: self.token.clone(),
                argument: key.to_string(),
                reason: "expected a string".to_string(),
            })
    }

    pub fn config_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.config
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    /// Explicit name from `key`, or the logical name plus a stable suffix
    pub fn physical_name(&self, key: &str) -> String {
        match self.input_str(key) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => physical_name(&self.urn),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub token: String,
    pub args: PropertyMap,
    pub config: BTreeMap<String, String>,
}

impl InvokeRequest {
    pub fn require_str(&self, key: &str) -> Result<&str> {
        input_str(&self.args, key).ok_or_else(|| EngineError::InvalidArgument {
            token: self.token.clone(),
            argument: key.to_string(),
            reason: "expected a string".to_string(),
        })
    }
}

/// Lowercase hex of the SHA-256 of `seed`, cut to `len` (at most 64)
/// characters. Simulated providers derive every generated identifier from
/// it so repeated runs agree.
pub fn stable_id(seed: &str, len: usize) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..len.min(hex.len())].to_string()
}

/// Stable seven character hex suffix derived from a URN
pub fn name_suffix(urn: &Urn) -> String {
    stable_id(urn.as_str(), 7)
}

/// Auto-generated physical name: `<logical name>-<suffix>`
pub fn physical_name(urn: &Urn) -> String {
    format!("{}-{}", urn.name(), name_suffix(urn))
}

/// Fails unless every key is present among the registration arguments
pub fn require_args(registration: &Registration, keys: &[&str]) -> Result<()> {
    for key in keys {
        if matches!(registration.args.get(key), None | Some(Input::Absent)) {
            return Err(EngineError::InvalidArgument {
                token: registration.token.clone(),
                argument: key.to_string(),
                reason: "required".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(inputs: serde_json::Value) -> CreateRequest {
        let serde_json::Value::Object(inputs) = inputs else {
            panic!("inputs must be an object");
        };
        CreateRequest {
            urn: Urn::new("dev", "site", "aws:s3/bucket:Bucket", "bucket"),
            token: "aws:s3/bucket:Bucket".to_string(),
            name: "bucket".to_string(),
            inputs,
            config: BTreeMap::from([("region".to_string(), "eu-west-1".to_string())]),
        }
    }

    #[test]
    fn test_physical_name_is_stable() {
        let urn = Urn::new("dev", "site", "aws:s3/bucket:Bucket", "bucket");
        let name = physical_name(&urn);
        assert_eq!(name, physical_name(&urn));
        assert!(name.starts_with("bucket-"));
        assert_eq!(name.len(), "bucket-".len() + 7);

        let other = Urn::new("prod", "site", "aws:s3/bucket:Bucket", "bucket");
        assert_ne!(name, physical_name(&other));
    }

    #[test]
    fn test_stable_id() {
        assert_eq!(stable_id("zone", 12), stable_id("zone", 12));
        assert_eq!(stable_id("zone", 12).len(), 12);
        assert_eq!(stable_id("zone", 500).len(), 64);
        assert_ne!(stable_id("a", 8), stable_id("b", 8));
    }

    #[test]
    fn test_request_helpers() {
        let req = request(serde_json::json!({ "bucket": "my-site", "acl": 1 }));
        assert_eq!(req.physical_name("bucket"), "my-site");
        assert!(req.physical_name("missing").starts_with("bucket-"));
        assert!(matches!(
            req.require_str("acl"),
            Err(EngineError::InvalidArgument { ref argument, .. }) if argument == "acl"
        ));
        assert_eq!(req.config_or("region", "us-east-1"), "eu-west-1");
        assert_eq!(req.config_or("profile", "default"), "default");
    }
}
