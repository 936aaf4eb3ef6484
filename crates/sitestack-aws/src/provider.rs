//! Simulated AWS provider
//!
//! Produces the attributes AWS would report (names, ARNs, endpoints)
//! deterministically from each resource's URN. No AWS API is called.

use crate::acm::{self, Certificate};
use crate::cloudfront::{self, Distribution};
use crate::error::AwsError;
use crate::route53::{self, GET_ZONE, Record};
use crate::s3::{self, Bucket};
use async_trait::async_trait;
use sitestack_engine::{
    Args, CreateRequest, EngineError, Input, InvokeRequest, PropertyMap, Registration,
    ResourceProvider, require_args, resource_handle,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const PACKAGE: &str = "aws";

pub const DEFAULT_REGION: &str = "us-east-1";

const REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-central-1",
    "ap-northeast-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "sa-east-1",
];

#[derive(Clone, Debug, Default)]
pub struct ProviderArgs {
    pub region: Input,
}

impl From<ProviderArgs> for Args {
    fn from(args: ProviderArgs) -> Self {
        Args::new().with("region", args.region)
    }
}

resource_handle!(
    /// An explicit AWS provider instance, e.g. pinned to us-east-1 for ACM
    Provider,
    "sitestack:providers:aws",
    ProviderArgs
);

/// The `aws` package
pub struct AwsProvider {
    /// Hosted zones seen by lookups, by zone id
    zones: Mutex<BTreeMap<String, String>>,
}

impl AwsProvider {
    pub fn new() -> Self {
        Self {
            zones: Mutex::new(BTreeMap::new()),
        }
    }

    fn region<'a>(&self, request: &'a CreateRequest) -> Result<&'a str, AwsError> {
        let region = request.config_or("region", DEFAULT_REGION);
        if REGIONS.contains(&region) {
            Ok(region)
        } else {
            Err(AwsError::InvalidRegion(region.to_string()))
        }
    }

    fn zone_name(&self, zone_id: Option<&str>) -> Option<String> {
        let zones = self
            .zones
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        zone_id.and_then(|id| zones.get(id).cloned())
    }
}

impl Default for AwsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceProvider for AwsProvider {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn display_name(&self) -> &str {
        "AWS"
    }

    fn supports(&self, token: &str) -> bool {
        matches!(
            token,
            Bucket::TOKEN | Certificate::TOKEN | Record::TOKEN | Distribution::TOKEN
        )
    }

    fn check(&self, registration: &Registration) -> sitestack_engine::Result<()> {
        let required: &[&str] = match registration.token.as_str() {
            Bucket::TOKEN => &[],
            Certificate::TOKEN => &["domainName"],
            Record::TOKEN => &["zoneId", "name", "type"],
            Distribution::TOKEN => &[
                "enabled",
                "origins",
                "defaultCacheBehavior",
                "restrictions",
                "viewerCertificate",
            ],
            other => {
                return Err(EngineError::UnsupportedResource {
                    provider: PACKAGE.to_string(),
                    token: other.to_string(),
                });
            }
        };
        require_args(registration, required)
    }

    async fn create(&self, request: &CreateRequest) -> sitestack_engine::Result<PropertyMap> {
        let outputs = match request.token.as_str() {
            Bucket::TOKEN => s3::create_bucket(request, self.region(request)?)?,
            Certificate::TOKEN => acm::create_certificate(request, self.region(request)?)?,
            Record::TOKEN => {
                let zone = self.zone_name(request.input_str("zoneId"));
                route53::create_record(request, zone.as_deref())?
            }
            Distribution::TOKEN => cloudfront::create_distribution(request)?,
            other => {
                return Err(EngineError::UnsupportedResource {
                    provider: PACKAGE.to_string(),
                    token: other.to_string(),
                });
            }
        };
        tracing::debug!(urn = %request.urn, "Simulated AWS resource");
        Ok(outputs)
    }

    async fn invoke(&self, request: &InvokeRequest) -> sitestack_engine::Result<PropertyMap> {
        match request.token.as_str() {
            GET_ZONE => {
                let zone = route53::lookup_zone(request)?;
                if let (Some(id), Some(name)) = (
                    zone.get("zoneId").and_then(|v| v.as_str()),
                    zone.get("name").and_then(|v| v.as_str()),
                ) {
                    self.zones
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .insert(id.to_string(), name.to_string());
                }
                Ok(zone)
            }
            other => Err(EngineError::UnsupportedResource {
                provider: PACKAGE.to_string(),
                token: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::{BucketArgs, BucketWebsiteArgs};
    use sitestack_config::StackConfig;
    use sitestack_engine::{LocalEngine, ResourceOptions, Session, StackState, apply};
    use std::sync::Arc;

    fn session(config: StackConfig) -> Session {
        let engine = LocalEngine::new(config).with_provider(AwsProvider::new());
        Session::new("site", "dev", Arc::new(engine))
    }

    fn website_bucket(ctx: &Session, options: ResourceOptions) -> Bucket {
        Bucket::new(
            ctx,
            "bucket",
            BucketArgs {
                acl: "public-read".into(),
                website: Some(BucketWebsiteArgs {
                    index_document: "index.html".into(),
                    error_document: "error.html".into(),
                }),
                ..Default::default()
            },
            options,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_region_from_stack_config() {
        let ctx = session(StackConfig::from_pairs([("aws:region", "eu-west-1")]));
        let bucket = website_bucket(&ctx, ResourceOptions::new());
        let mut state = StackState::new("site", "dev");
        apply(ctx.into_graph(), &mut state).await.unwrap();

        let endpoint = bucket.website_endpoint().resolve().await.unwrap();
        assert!(endpoint.ends_with(".s3-website-eu-west-1.amazonaws.com"));
    }

    #[tokio::test]
    async fn test_explicit_provider_region() {
        let ctx = session(StackConfig::from_pairs([("aws:region", "eu-west-1")]));
        let east = Provider::new(
            &ctx,
            "us-east-provider",
            ProviderArgs {
                region: "us-east-1".into(),
            },
            ResourceOptions::new(),
        )
        .unwrap();
        let bucket = website_bucket(&ctx, ResourceOptions::new().provider(east.resource()));
        let mut state = StackState::new("site", "dev");
        apply(ctx.into_graph(), &mut state).await.unwrap();

        let endpoint = bucket.website_endpoint().resolve().await.unwrap();
        assert!(endpoint.ends_with(".s3-website-us-east-1.amazonaws.com"));
    }

    #[tokio::test]
    async fn test_invalid_region_fails_resource() {
        let ctx = session(StackConfig::from_pairs([("aws:region", "moon-1")]));
        let bucket = website_bucket(&ctx, ResourceOptions::new());
        let mut state = StackState::new("site", "dev");
        let deployment = apply(ctx.into_graph(), &mut state).await.unwrap();

        assert_eq!(deployment.result.failed.len(), 1);
        assert!(bucket.bucket().resolve().await.is_err());
    }

    #[test]
    fn test_check_requires_arguments() {
        let ctx = session(StackConfig::new());
        let err = Record::new(
            &ctx,
            "record",
            crate::route53::RecordArgs {
                name: "www".into(),
                ..Default::default()
            },
            ResourceOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { ref argument, .. } if argument == "zoneId"
        ));
    }
}
