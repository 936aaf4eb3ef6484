//! Simulated gcp provider
//!
//! Project and region come from the `gcp` config namespace or an explicit
//! [`Provider`] instance.

use crate::compute::{
    self, BackendBucket, GlobalAddress, GlobalForwardingRule, TargetHttpProxy, UrlMap,
};
use crate::storage::{self, Bucket, BucketIamBinding};
use async_trait::async_trait;
use sitestack_engine::{
    Args, CreateRequest, EngineError, Input, PropertyMap, Registration, ResourceProvider,
    require_args, resource_handle,
};

pub const PACKAGE: &str = "gcp";

/// Project used when neither config nor a provider instance names one
pub const DEFAULT_PROJECT: &str = "pulumi-development";

#[derive(Clone, Debug, Default)]
pub struct ProviderArgs {
    pub project: Input,
    pub region: Input,
}

impl From<ProviderArgs> for Args {
    fn from(args: ProviderArgs) -> Self {
        Args::new()
            .with("project", args.project)
            .with("region", args.region)
    }
}

resource_handle!(
    /// An explicit gcp provider instance pinned to a project
    Provider,
    "sitestack:providers:gcp",
    ProviderArgs
);

/// The `gcp` package
#[derive(Default)]
pub struct GcpProvider;

impl GcpProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceProvider for GcpProvider {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn display_name(&self) -> &str {
        "Google Cloud"
    }

    fn supports(&self, token: &str) -> bool {
        matches!(
            token,
            Bucket::TOKEN
                | BucketIamBinding::TOKEN
                | BackendBucket::TOKEN
                | GlobalAddress::TOKEN
                | UrlMap::TOKEN
                | TargetHttpProxy::TOKEN
                | GlobalForwardingRule::TOKEN
        )
    }

    fn check(&self, registration: &Registration) -> sitestack_engine::Result<()> {
        let required: &[&str] = match registration.token.as_str() {
            Bucket::TOKEN | GlobalAddress::TOKEN => &[],
            BucketIamBinding::TOKEN => &["bucket", "role", "members"],
            BackendBucket::TOKEN => &["bucketName"],
            UrlMap::TOKEN => &["defaultService"],
            TargetHttpProxy::TOKEN => &["urlMap"],
            GlobalForwardingRule::TOKEN => &["target", "portRange"],
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
        let project = request.config_or("project", DEFAULT_PROJECT);
        let outputs = match request.token.as_str() {
            Bucket::TOKEN => storage::create_bucket(request, project)?,
            BucketIamBinding::TOKEN => storage::create_binding(request)?,
            BackendBucket::TOKEN => compute::create_backend_bucket(request, project)?,
            GlobalAddress::TOKEN => compute::create_global_address(request, project)?,
            UrlMap::TOKEN => compute::create_url_map(request, project)?,
            TargetHttpProxy::TOKEN => compute::create_http_proxy(request, project)?,
            GlobalForwardingRule::TOKEN => compute::create_forwarding_rule(request, project)?,
            other => {
                return Err(EngineError::UnsupportedResource {
                    provider: PACKAGE.to_string(),
                    token: other.to_string(),
                });
            }
        };
        tracing::debug!(urn = %request.urn, project, "Simulated GCP resource");
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BucketArgs;
    use sitestack_config::StackConfig;
    use sitestack_engine::{LocalEngine, ResourceOptions, Session, StackState, apply};
    use std::sync::Arc;

    fn session(config: StackConfig) -> Session {
        let engine = LocalEngine::new(config).with_provider(GcpProvider::new());
        Session::new("site", "dev", Arc::new(engine))
    }

    #[tokio::test]
    async fn test_default_project() {
        let ctx = session(StackConfig::new());
        let bucket = Bucket::new(&ctx, "bucket", BucketArgs::default(), ResourceOptions::new()).unwrap();
        let mut state = StackState::new("site", "dev");
        apply(ctx.into_graph(), &mut state).await.unwrap();

        let outputs = bucket.resource().state().resolve().await.unwrap();
        assert_eq!(outputs["project"], DEFAULT_PROJECT);
    }

    #[tokio::test]
    async fn test_explicit_provider_project() {
        let ctx = session(StackConfig::from_pairs([("gcp:project", "from-config")]));
        let provider = Provider::new(
            &ctx,
            "gcp",
            ProviderArgs {
                project: "explicit".into(),
                ..Default::default()
            },
            ResourceOptions::new(),
        )
        .unwrap();
        let bucket = Bucket::new(
            &ctx,
            "bucket",
            BucketArgs::default(),
            ResourceOptions::new().provider(provider.resource()),
        )
        .unwrap();
        let mut state = StackState::new("site", "dev");
        apply(ctx.into_graph(), &mut state).await.unwrap();

        let outputs = bucket.resource().state().resolve().await.unwrap();
        assert_eq!(outputs["project"], "explicit");
    }

    #[test]
    fn test_check_requires_arguments() {
        let ctx = session(StackConfig::new());
        let err = UrlMap::new(
            &ctx,
            "url-map",
            crate::compute::UrlMapArgs::default(),
            ResourceOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { ref argument, .. } if argument == "defaultService"
        ));
    }
}
