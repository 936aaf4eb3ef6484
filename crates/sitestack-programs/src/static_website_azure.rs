//! Static website on Azure
//!
//! Storage account static website synced from `path`, served through an
//! Azure CDN endpoint bound to `<subdomain>.<domain>` via a CNAME in an
//! existing DNS zone.

use sitestack_azure::cdn::{
    COMPRESSED_CONTENT_TYPES, CustomDomain, CustomDomainArgs, DeepCreatedOriginArgs, Endpoint,
    EndpointArgs, Profile, ProfileArgs, normalize_host_name,
};
use sitestack_azure::network::{RecordSet, RecordSetArgs, sub_resource};
use sitestack_azure::{
    GetResourceGroupArgs, ResourceGroup, ResourceGroupArgs, SkuArgs, StaticWebsiteArgs,
    StorageAccount, StorageAccountArgs, StorageAccountStaticWebsite, get_resource_group,
};
use sitestack_config::{DomainSettings, SiteSettings, StackConfig};
use sitestack_engine::{
    AzureBlobFolder, AzureBlobFolderArgs, ResourceOptions, Result, Session, literal,
};

pub fn run(ctx: &Session, config: &StackConfig) -> Result<()> {
    let site = SiteSettings::load(config);
    let domain = DomainSettings::load(config)?;
    let zone_group = config.require("zoneResourceGroupName")?;
    let domain_name = domain.domain_name();

    let group = ResourceGroup::new(
        ctx,
        "resource-group",
        ResourceGroupArgs::default(),
        ResourceOptions::new(),
    )?;

    let account = StorageAccount::new(
        ctx,
        "account",
        StorageAccountArgs {
            resource_group_name: group.name().into(),
            kind: "StorageV2".into(),
            sku: SkuArgs {
                name: "Standard_LRS".into(),
            },
            ..Default::default()
        },
        ResourceOptions::new(),
    )?;

    let website = StorageAccountStaticWebsite::new(
        ctx,
        "website",
        StaticWebsiteArgs {
            resource_group_name: group.name().into(),
            account_name: account.name().into(),
            index_document: site.index_document.as_str().into(),
            error404_document: site.error_document.as_str().into(),
        },
        ResourceOptions::new(),
    )?;

    AzureBlobFolder::new(
        ctx,
        "synced-folder",
        AzureBlobFolderArgs {
            path: site.path.as_str().into(),
            resource_group_name: group.name().into(),
            storage_account_name: account.name().into(),
            container_name: website.container_name().into(),
        },
        ResourceOptions::new(),
    )?;

    let profile = Profile::new(
        ctx,
        "profile",
        ProfileArgs {
            resource_group_name: group.name().into(),
            sku: SkuArgs {
                name: "Standard_Microsoft".into(),
            },
        },
        ResourceOptions::new(),
    )?;

    let origin_hostname = account.web_hostname();
    let endpoint = Endpoint::new(
        ctx,
        "endpoint",
        EndpointArgs {
            resource_group_name: group.name().into(),
            profile_name: profile.name().into(),
            is_http_allowed: true.into(),
            is_https_allowed: true.into(),
            is_compression_enabled: true.into(),
            content_types_to_compress: COMPRESSED_CONTENT_TYPES.to_vec().into(),
            origin_host_header: (&origin_hostname).into(),
            origins: vec![DeepCreatedOriginArgs {
                name: account.name().into(),
                host_name: (&origin_hostname).into(),
            }],
        },
        ResourceOptions::new(),
    )?;

    let dns_group = get_resource_group(
        ctx,
        GetResourceGroupArgs {
            resource_group_name: zone_group.into(),
        },
    );

    let cname = RecordSet::new(
        ctx,
        "cname",
        RecordSetArgs {
            resource_group_name: dns_group.apply(|g| g.name).into(),
            relative_record_set_name: domain.subdomain.as_str().into(),
            zone_name: domain.domain.as_str().into(),
            record_type: "CNAME".into(),
            target_resource: sub_resource(endpoint.id()),
            ..Default::default()
        },
        ResourceOptions::new(),
    )?;

    CustomDomain::new(
        ctx,
        "domain",
        CustomDomainArgs {
            resource_group_name: group.name().into(),
            profile_name: profile.name().into(),
            endpoint_name: endpoint.name().into(),
            host_name: cname.fqdn().apply(|fqdn| normalize_host_name(&fqdn)).into(),
        },
        ResourceOptions::new(),
    )?;

    ctx.export("originURL", origin_hostname.wrap("http://", ""));
    ctx.export("originHostname", origin_hostname);
    ctx.export("cdnURL", endpoint.host_name().wrap("https://", ""));
    ctx.export("cdnHostname", endpoint.host_name());
    ctx.export("domainURL", literal(format!("http://{}", domain_name)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{deploy, project_dir};
    use sitestack_config::ConfigError;
    use sitestack_engine::{EngineError, LocalEngine};
    use std::sync::Arc;

    fn config() -> StackConfig {
        StackConfig::from_pairs([
            ("domain", "example.com"),
            ("subdomain", "www"),
            ("zoneResourceGroupName", "dns"),
        ])
    }

    #[test]
    fn test_zone_resource_group_is_required() {
        let ctx = Session::new("site", "dev", Arc::new(LocalEngine::new(StackConfig::new())));
        let config = StackConfig::from_pairs([("domain", "example.com"), ("subdomain", "www")]);
        let err = run(&ctx, &config).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::MissingRequired(ref key)) if key == "zoneResourceGroupName"
        ));
    }

    #[tokio::test]
    async fn test_apply_end_to_end() {
        let dir = project_dir();
        let deployment = deploy("static-website-azure", config(), dir.path()).await;
        assert!(
            deployment.result.is_success(),
            "{:?}",
            deployment.result.failed
        );

        let origin = deployment.outputs["originHostname"].as_str().unwrap();
        assert!(origin.starts_with("account"));
        assert!(origin.ends_with(".z13.web.core.windows.net"));
        assert_eq!(deployment.outputs["originURL"], format!("http://{}", origin));
        let cdn = deployment.outputs["cdnHostname"].as_str().unwrap();
        assert!(cdn.starts_with("endpoint-") && cdn.ends_with(".azureedge.net"));
        assert_eq!(deployment.outputs["cdnURL"], format!("https://{}", cdn));
        assert_eq!(deployment.outputs["domainURL"], "http://www.example.com");

        let domain = deployment.plan.find("domain").unwrap();
        assert_eq!(domain.details["hostName"], "www.example.com");
    }
}
