//! Serverless site on Azure
//!
//! A storage static website plus a consumption-plan function app. The
//! function package is archived from `apiPath` into a blob the app runs
//! from, and the site learns the API address from a generated
//! `config.json`.
//!
//! `serverless-azure` keeps the package container private and hands the
//! app a read-only SAS URL valid for `sasValidityDays` from the session
//! clock. `serverless-azure-public` makes the container public instead.
//! A SAS that cannot be produced fails the function app and whatever
//! needs its host name; the rest of the stack still deploys.

use sitestack_azure::sas::format_timestamp;
use sitestack_azure::web::{
    AppServicePlan, AppServicePlanArgs, CONSUMPTION_SKU, CorsSettingsArgs, NameValuePairArgs,
    SiteConfigArgs, SkuDescriptionArgs, WebApp, WebAppArgs,
};
use sitestack_azure::{
    Blob, BlobArgs, BlobContainer, BlobContainerArgs, ListServiceSasArgs, PublicAccess,
    ResourceGroup, ResourceGroupArgs, SkuArgs, StaticWebsiteArgs, StorageAccount,
    StorageAccountArgs, StorageAccountStaticWebsite, list_storage_account_service_sas,
    signed_blob_url, validity_window,
};
use sitestack_config::{ServerlessSettings, SiteSettings, StackConfig};
use sitestack_engine::{
    Asset, AzureBlobFolder, AzureBlobFolderArgs, Output, OutputError, ResourceOptions, Result,
    Session,
};

const NODE_VERSION: &str = "~14";
const FUNCTIONS_VERSION: &str = "~3";

/// Body of the `config.json` the site fetches at runtime
pub fn config_body(api_host: &str) -> String {
    format!("{{ \"api\": \"https://{}/api\" }}", api_host)
}

/// Private package container, SAS-signed package URL
pub fn run(ctx: &Session, config: &StackConfig) -> Result<()> {
    declare(ctx, config, PackageAccess::Signed)
}

/// Public package container, unsigned package URL
pub fn run_public(ctx: &Session, config: &StackConfig) -> Result<()> {
    declare(ctx, config, PackageAccess::Public)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PackageAccess {
    Signed,
    Public,
}

fn declare(ctx: &Session, config: &StackConfig, access: PackageAccess) -> Result<()> {
    let site = SiteSettings::load(config);
    let serverless = ServerlessSettings::load(config)?;

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

    let public_access = match access {
        PackageAccess::Signed => PublicAccess::None,
        PackageAccess::Public => PublicAccess::Container,
    };
    let container = BlobContainer::new(
        ctx,
        "container",
        BlobContainerArgs {
            account_name: account.name().into(),
            resource_group_name: group.name().into(),
            public_access: public_access.into(),
            ..Default::default()
        },
        ResourceOptions::new(),
    )?;

    let sas_token = match access {
        PackageAccess::Signed => read_token(ctx, &group, &account, &container, &serverless),
        PackageAccess::Public => Output::known(String::new()),
    };

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

    let plan = AppServicePlan::new(
        ctx,
        "plan",
        AppServicePlanArgs {
            resource_group_name: group.name().into(),
            kind: "Linux".into(),
            sku: SkuDescriptionArgs {
                name: CONSUMPTION_SKU.0.into(),
                tier: CONSUMPTION_SKU.1.into(),
            },
        },
        ResourceOptions::new(),
    )?;

    let package = Blob::new(
        ctx,
        "blob",
        BlobArgs {
            account_name: account.name().into(),
            resource_group_name: group.name().into(),
            container_name: container.name().into(),
            source: Asset::file_archive(serverless.api_path.as_str()).into(),
            ..Default::default()
        },
        ResourceOptions::new(),
    )?;

    let package_url = Output::all([account.name(), container.name(), package.name(), sas_token])
        .try_apply(|parts| match parts.as_slice() {
            [account, container, blob, token] => {
                Ok(signed_blob_url(account, container, blob, token))
            }
            other => Err(OutputError::derivation(format!(
                "package URL needs 4 parts, got {}",
                other.len()
            ))),
        });

    let app = WebApp::new(
        ctx,
        "function-app",
        WebAppArgs {
            resource_group_name: group.name().into(),
            kind: "FunctionApp".into(),
            server_farm_id: plan.id().into(),
            site_config: SiteConfigArgs {
                app_settings: vec![
                    NameValuePairArgs::new("runtime", "node"),
                    NameValuePairArgs::new("FUNCTIONS_WORKER_RUNTIME", "node"),
                    NameValuePairArgs::new("WEBSITE_RUN_FROM_PACKAGE", package_url),
                    NameValuePairArgs::new("WEBSITE_NODE_DEFAULT_VERSION", NODE_VERSION),
                    NameValuePairArgs::new("FUNCTIONS_EXTENSION_VERSION", FUNCTIONS_VERSION),
                ],
                cors: Some(CorsSettingsArgs {
                    allowed_origins: vec!["*"].into(),
                }),
            },
        },
        ResourceOptions::new(),
    )?;

    let api_host = app.default_host_name();
    Blob::new(
        ctx,
        "config.json",
        BlobArgs {
            account_name: account.name().into(),
            resource_group_name: group.name().into(),
            container_name: website.container_name().into(),
            source: api_host.apply(|host| Asset::string(config_body(&host))).into(),
            content_type: "application/json".into(),
            ..Default::default()
        },
        ResourceOptions::new(),
    )?;

    ctx.export("originURL", account.web_endpoint());
    ctx.export("originHostname", account.web_hostname());
    ctx.export("apiURL", api_host.wrap("https://", "/api"));
    ctx.export("apiHostname", api_host);
    Ok(())
}

/// Read-only container SAS for the package, valid from the session clock.
/// Failures stay on the token.
fn read_token(
    ctx: &Session,
    group: &ResourceGroup,
    account: &StorageAccount,
    container: &BlobContainer,
    serverless: &ServerlessSettings,
) -> Output<String> {
    let (start, expiry) = match validity_window(ctx.now(), serverless.sas_validity_days) {
        Ok(window) => window,
        Err(e) => return Output::failed(OutputError::derivation(e.to_string())),
    };
    let resource = account
        .name()
        .zip(&container.name())
        .apply(|(account, container)| format!("/blob/{}/{}", account, container));

    list_storage_account_service_sas(
        ctx,
        ListServiceSasArgs {
            resource_group_name: group.name().into(),
            account_name: account.name().into(),
            canonicalized_resource: resource.into(),
            resource: "c".into(),
            permissions: "r".into(),
            protocols: "https".into(),
            shared_access_start_time: format_timestamp(&start).into(),
            shared_access_expiry_time: format_timestamp(&expiry).into(),
            cache_control: "max-age=5".into(),
            content_disposition: "inline".into(),
            content_encoding: "deflate".into(),
            content_type: "application/json".into(),
        },
    )
}
