//! Typed program settings
//!
//! Each program reads its options through these structs so that the
//! defaults live in one place.

use crate::config::StackConfig;
use crate::error::{ConfigError, Result};

pub const DEFAULT_PATH: &str = "./www";
pub const DEFAULT_GCP_PATH: &str = "./site";
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";
pub const DEFAULT_ERROR_DOCUMENT: &str = "error.html";
pub const DEFAULT_GCP_PROJECT: &str = "pulumi-development";
pub const DEFAULT_API_PATH: &str = "./api";
pub const DEFAULT_SAS_VALIDITY_DAYS: u32 = 365;

/// Website content options shared by every program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub path: String,
    pub index_document: String,
    pub error_document: String,
}

impl SiteSettings {
    pub fn load(config: &StackConfig) -> Self {
        Self::load_with_path_default(config, DEFAULT_PATH)
    }

    pub fn load_with_path_default(config: &StackConfig, default_path: &str) -> Self {
        Self {
            path: config.get_or("path", default_path).to_string(),
            index_document: config
                .get_or("indexDocument", DEFAULT_INDEX_DOCUMENT)
                .to_string(),
            error_document: config
                .get_or("errorDocument", DEFAULT_ERROR_DOCUMENT)
                .to_string(),
        }
    }
}

/// Custom domain options; both values are required
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSettings {
    pub domain: String,
    pub subdomain: String,
}

impl DomainSettings {
    pub fn load(config: &StackConfig) -> Result<Self> {
        Ok(Self {
            domain: config.require("domain")?.to_string(),
            subdomain: config.require("subdomain")?.to_string(),
        })
    }

    /// `<subdomain>.<domain>`
    pub fn domain_name(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpSettings {
    pub project: String,
}

impl GcpSettings {
    pub fn load(config: &StackConfig) -> Self {
        Self {
            project: config.get_or("gcpProject", DEFAULT_GCP_PROJECT).to_string(),
        }
    }
}

/// Options of the serverless programs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerlessSettings {
    /// Local directory archived and uploaded as the function package
    pub api_path: String,
    /// Lifetime of the package SAS token, counted from the session clock
    pub sas_validity_days: u32,
}

impl ServerlessSettings {
    pub fn load(config: &StackConfig) -> Result<Self> {
        let sas_validity_days = config.parse_or("sasValidityDays", DEFAULT_SAS_VALIDITY_DAYS)?;
        if sas_validity_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sasValidityDays".to_string(),
                value: "0".to_string(),
                reason: "must be at least one day".to_string(),
            });
        }
        Ok(Self {
            api_path: config.get_or("apiPath", DEFAULT_API_PATH).to_string(),
            sas_validity_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_defaults_when_absent() {
        let settings = SiteSettings::load(&StackConfig::new());
        assert_eq!(settings.path, "./www");
        assert_eq!(settings.index_document, "index.html");
        assert_eq!(settings.error_document, "error.html");

        let gcp = SiteSettings::load_with_path_default(&StackConfig::new(), DEFAULT_GCP_PATH);
        assert_eq!(gcp.path, "./site");
    }

    #[test]
    fn test_site_values_verbatim_when_present() {
        let config = StackConfig::from_pairs([
            ("path", "../public dir"),
            ("indexDocument", "Home.HTM"),
            ("errorDocument", "404.html"),
        ]);
        let settings = SiteSettings::load(&config);
        assert_eq!(settings.path, "../public dir");
        assert_eq!(settings.index_document, "Home.HTM");
        assert_eq!(settings.error_document, "404.html");
    }

    #[test]
    fn test_domain_requires_both() {
        let config = StackConfig::from_pairs([("domain", "example.com")]);
        let err = DomainSettings::load(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref k) if k == "subdomain"));

        let config = StackConfig::from_pairs([("domain", "example.com"), ("subdomain", "www")]);
        let settings = DomainSettings::load(&config).unwrap();
        assert_eq!(settings.domain_name(), "www.example.com");
    }

    #[test]
    fn test_gcp_project_default() {
        assert_eq!(
            GcpSettings::load(&StackConfig::new()).project,
            "pulumi-development"
        );
        let config = StackConfig::from_pairs([("gcpProject", "my-project")]);
        assert_eq!(GcpSettings::load(&config).project, "my-project");
    }

    #[test]
    fn test_serverless_settings() {
        let defaults = ServerlessSettings::load(&StackConfig::new()).unwrap();
        assert_eq!(defaults.api_path, "./api");
        assert_eq!(defaults.sas_validity_days, 365);

        let config = StackConfig::from_pairs([("sasValidityDays", "0")]);
        assert!(ServerlessSettings::load(&config).is_err());
    }
}
