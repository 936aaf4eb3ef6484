//! CDN profiles, endpoints and custom domains

use crate::error::{AzureError, Result};
use crate::provider::arm_id;
use serde_json::Value;
use sitestack_engine::{Args, CreateRequest, Input, Output, PropertyMap, resource_handle};

/// Content types the static site endpoints compress
pub const COMPRESSED_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "text/css",
    "application/javascript",
    "application/json",
    "image/svg+xml",
    "font/woff",
    "font/woff2",
];

#[derive(Clone, Debug, Default)]
pub struct ProfileArgs {
    pub resource_group_name: Input,
    pub sku: crate::storage::SkuArgs,
}

impl From<ProfileArgs> for Args {
    fn from(args: ProfileArgs) -> Self {
        Args::new()
            .with("resourceGroupName", args.resource_group_name)
            .with("sku", args.sku)
    }
}

resource_handle!(
    /// A CDN profile
    Profile,
    "azure-native:cdn:Profile",
    ProfileArgs
);

impl Profile {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }
}

#[derive(Clone, Debug, Default)]
pub struct DeepCreatedOriginArgs {
    pub name: Input,
    pub host_name: Input,
}

impl From<DeepCreatedOriginArgs> for Input {
    fn from(args: DeepCreatedOriginArgs) -> Self {
        Input::object([("name", args.name), ("hostName", args.host_name)])
    }
}

#[derive(Clone, Debug, Default)]
pub struct EndpointArgs {
    pub resource_group_name: Input,
    pub profile_name: Input,
    pub is_http_allowed: Input,
    pub is_https_allowed: Input,
    pub is_compression_enabled: Input,
    pub content_types_to_compress: Input,
    pub origin_host_header: Input,
    pub origins: Vec<DeepCreatedOriginArgs>,
}

impl From<EndpointArgs> for Args {
    fn from(args: EndpointArgs) -> Self {
        Args::new()
            .with("resourceGroupName", args.resource_group_name)
            .with("profileName", args.profile_name)
            .with("isHttpAllowed", args.is_http_allowed)
            .with("isHttpsAllowed", args.is_https_allowed)
            .with("isCompressionEnabled", args.is_compression_enabled)
            .with("contentTypesToCompress", args.content_types_to_compress)
            .with("originHostHeader", args.origin_host_header)
            .with("origins", args.origins)
    }
}

resource_handle!(
    /// A CDN endpoint in front of an origin
    Endpoint,
    "azure-native:cdn:Endpoint",
    EndpointArgs
);

impl Endpoint {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }

    /// `<name>.azureedge.net`
    pub fn host_name(&self) -> Output<String> {
        self.resource.string("hostName")
    }
}

#[derive(Clone, Debug, Default)]
pub struct CustomDomainArgs {
    pub resource_group_name: Input,
    pub profile_name: Input,
    pub endpoint_name: Input,
    pub host_name: Input,
}

impl From<CustomDomainArgs> for Args {
    fn from(args: CustomDomainArgs) -> Self {
        Args::new()
            .with("resourceGroupName", args.resource_group_name)
            .with("profileName", args.profile_name)
            .with("endpointName", args.endpoint_name)
            .with("hostName", args.host_name)
    }
}

resource_handle!(
    /// Binds a custom host name to a CDN endpoint
    CustomDomain,
    "azure-native:cdn:CustomDomain",
    CustomDomainArgs
);

impl CustomDomain {
    pub fn host_name(&self) -> Output<String> {
        self.resource.string("hostName")
    }
}

/// Joins the non-empty labels of a domain, dropping stray or trailing dots
pub fn normalize_host_name(raw: &str) -> String {
    raw.split('.')
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

fn valid_host_name(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn profile_id(request: &CreateRequest) -> Result<String> {
    Ok(arm_id(
        request.require_str("resourceGroupName")?,
        "Microsoft.Cdn/profiles",
        request.require_str("profileName")?,
    ))
}

pub(crate) fn create_profile(request: &CreateRequest) -> Result<PropertyMap> {
    let group = request.require_str("resourceGroupName")?;
    let sku = request
        .inputs
        .get("sku")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| AzureError::InvalidSku("missing sku name".to_string()))?;
    if !sku.starts_with("Standard_") && !sku.starts_with("Premium_") {
        return Err(AzureError::InvalidSku(sku.to_string()));
    }
    let name = request.physical_name("profileName");

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(arm_id(group, "Microsoft.Cdn/profiles", &name)),
    );
    outputs.insert("location".to_string(), Value::from("Global"));
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}

pub(crate) fn create_endpoint(request: &CreateRequest) -> Result<PropertyMap> {
    let origins = request
        .inputs
        .get("origins")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for origin in origins {
        let host = origin
            .get("hostName")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !valid_host_name(host) {
            return Err(AzureError::InvalidHostName(host.to_string()));
        }
    }
    if origins.is_empty() {
        return Err(AzureError::InvalidHostName("no origins".to_string()));
    }
    let name = request.physical_name("endpointName");

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(format!("{}/endpoints/{}", profile_id(request)?, name)),
    );
    outputs.insert(
        "hostName".to_string(),
        Value::from(format!("{}.azureedge.net", name)),
    );
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}

pub(crate) fn create_custom_domain(request: &CreateRequest) -> Result<PropertyMap> {
    let host = request.require_str("hostName")?;
    if !valid_host_name(host) {
        return Err(AzureError::InvalidHostName(host.to_string()));
    }
    let endpoint = request.require_str("endpointName")?;
    let name = request.physical_name("customDomainName");

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(format!(
            "{}/endpoints/{}/customDomains/{}",
            profile_id(request)?,
            endpoint,
            name
        )),
    );
    outputs.insert("validationData".to_string(), Value::Null);
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}
