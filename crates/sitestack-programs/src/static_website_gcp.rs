//! Static website on Google Cloud
//!
//! Public Cloud Storage website bucket synced from `path` (default
//! `./site`), fronted by a global HTTP load balancer with Cloud CDN.

use sitestack_config::settings::DEFAULT_GCP_PATH;
use sitestack_config::{GcpSettings, SiteSettings, StackConfig};
use sitestack_engine::{
    GoogleCloudFolder, GoogleCloudFolderArgs, ResourceOptions, Result, Session,
};
use sitestack_gcp::compute::{
    BackendBucket, BackendBucketArgs, GlobalAddress, GlobalAddressArgs, GlobalForwardingRule,
    GlobalForwardingRuleArgs, TargetHttpProxy, TargetHttpProxyArgs, UrlMap, UrlMapArgs,
};
use sitestack_gcp::storage::{
    Bucket, BucketArgs, BucketIamBinding, BucketIamBindingArgs, BucketWebsiteArgs,
};
use sitestack_gcp::{Provider, ProviderArgs};

pub fn run(ctx: &Session, config: &StackConfig) -> Result<()> {
    let site = SiteSettings::load_with_path_default(config, DEFAULT_GCP_PATH);
    let gcp = GcpSettings::load(config);

    let provider = Provider::new(
        ctx,
        "gcp-provider",
        ProviderArgs {
            project: gcp.project.as_str().into(),
            ..Default::default()
        },
        ResourceOptions::new(),
    )?;
    let options = || ResourceOptions::new().provider(provider.resource());

    let bucket = Bucket::new(
        ctx,
        "bucket",
        BucketArgs {
            location: "US".into(),
            website: Some(BucketWebsiteArgs {
                main_page_suffix: site.index_document.as_str().into(),
                not_found_page: site.error_document.as_str().into(),
            }),
            ..Default::default()
        },
        options(),
    )?;

    BucketIamBinding::new(
        ctx,
        "bucket-iam-binding",
        BucketIamBindingArgs {
            bucket: bucket.name().into(),
            role: "roles/storage.objectViewer".into(),
            members: vec!["allUsers"].into(),
        },
        options(),
    )?;

    GoogleCloudFolder::new(
        ctx,
        "synced-folder",
        GoogleCloudFolderArgs {
            path: site.path.as_str().into(),
            bucket_name: bucket.name().into(),
        },
        ResourceOptions::new(),
    )?;

    let backend = BackendBucket::new(
        ctx,
        "backend-bucket",
        BackendBucketArgs {
            bucket_name: bucket.name().into(),
            enable_cdn: true.into(),
            ..Default::default()
        },
        options(),
    )?;

    let ip = GlobalAddress::new(ctx, "ip", GlobalAddressArgs::default(), options())?;

    let url_map = UrlMap::new(
        ctx,
        "url-map",
        UrlMapArgs {
            default_service: backend.self_link().into(),
            ..Default::default()
        },
        options(),
    )?;

    let proxy = TargetHttpProxy::new(
        ctx,
        "http-proxy",
        TargetHttpProxyArgs {
            url_map: url_map.self_link().into(),
            ..Default::default()
        },
        options(),
    )?;

    GlobalForwardingRule::new(
        ctx,
        "http-forwarding-rule",
        GlobalForwardingRuleArgs {
            ip_address: ip.address().into(),
            ip_protocol: "TCP".into(),
            port_range: "80".into(),
            target: proxy.self_link().into(),
            ..Default::default()
        },
        options(),
    )?;

    let index_document = site.index_document.clone();
    ctx.export(
        "originURL",
        bucket.name().apply(move |name| {
            format!("https://storage.googleapis.com/{}/{}", name, index_document)
        }),
    );
    ctx.export("cdnURL", ip.address().wrap("http://", ""));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testing::{deploy, project_dir};
    use sitestack_config::StackConfig;

    #[tokio::test]
    async fn test_apply_end_to_end() {
        let dir = project_dir();
        let deployment = deploy("static-website-gcp", StackConfig::new(), dir.path()).await;
        assert!(
            deployment.result.is_success(),
            "{:?}",
            deployment.result.failed
        );

        let origin = deployment.outputs["originURL"].as_str().unwrap();
        assert!(origin.starts_with("https://storage.googleapis.com/bucket-"));
        assert!(origin.ends_with("/index.html"));
        let cdn = deployment.outputs["cdnURL"].as_str().unwrap();
        assert!(cdn.starts_with("http://34."));

        let folder = deployment.plan.find("synced-folder").unwrap();
        assert_eq!(folder.details["path"], "./site");
    }

    #[tokio::test]
    async fn test_project_comes_from_config() {
        let dir = project_dir();
        let config = StackConfig::from_pairs([("gcpProject", "my-project")]);
        let deployment = deploy("static-website-gcp", config, dir.path()).await;
        assert!(deployment.result.is_success());

        let backend = deployment.plan.find("url-map").unwrap();
        assert!(
            backend.details["defaultService"]
                .starts_with("https://www.googleapis.com/compute/v1/projects/my-project/global/")
        );
    }

    #[tokio::test]
    async fn test_missing_site_folder_fails_only_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = deploy("static-website-gcp", StackConfig::new(), dir.path()).await;
        assert_eq!(deployment.result.failed.len(), 1);
        assert!(deployment.result.failed[0].urn.ends_with("::synced-folder"));
        assert!(deployment.outputs.contains_key("cdnURL"));
    }
}
