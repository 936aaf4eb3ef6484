//! Storage accounts, containers, blobs and service SAS tokens

use crate::error::{AzureError, Result};
use crate::provider::arm_id;
use crate::sas::{ServiceSas, SharedKeySigner, parse_timestamp, simulated_account_key};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitestack_engine::{
    Args, Asset, CreateRequest, Input, InvokeRequest, Output, OutputError, PropertyMap, Session,
    name_suffix, resource_handle,
};
use std::path::Path;

pub const LIST_SERVICE_SAS: &str = "azure-native:storage:listStorageAccountServiceSAS";

/// Container the static website feature serves from
pub const WEB_CONTAINER: &str = "$web";

const SKUS: &[&str] = &[
    "Standard_LRS",
    "Standard_GRS",
    "Standard_RAGRS",
    "Standard_ZRS",
    "Premium_LRS",
];

#[derive(Clone, Debug, Default)]
pub struct SkuArgs {
    pub name: Input,
}

impl From<SkuArgs> for Input {
    fn from(args: SkuArgs) -> Self {
        Input::object([("name", args.name)])
    }
}

#[derive(Clone, Debug, Default)]
pub struct StorageAccountArgs {
    pub account_name: Input,
    pub resource_group_name: Input,
    pub kind: Input,
    pub sku: SkuArgs,
    pub location: Input,
}

impl From<StorageAccountArgs> for Args {
    fn from(args: StorageAccountArgs) -> Self {
        Args::new()
            .with("accountName", args.account_name)
            .with("resourceGroupName", args.resource_group_name)
            .with("kind", args.kind)
            .with("sku", args.sku)
            .with("location", args.location)
    }
}

/// Service endpoints of a storage account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryEndpoints {
    pub blob: String,
    pub web: String,
}

resource_handle!(
    /// A general purpose v2 storage account
    StorageAccount,
    "azure-native:storage:StorageAccount",
    StorageAccountArgs
);

impl StorageAccount {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }

    pub fn primary_endpoints(&self) -> Output<PrimaryEndpoints> {
        self.resource.output("primaryEndpoints").decode()
    }

    /// `https://<account>.z13.web.core.windows.net/`
    pub fn web_endpoint(&self) -> Output<String> {
        self.primary_endpoints().apply(|endpoints| endpoints.web)
    }

    /// Host name of the static website endpoint
    pub fn web_hostname(&self) -> Output<String> {
        self.web_endpoint().try_apply(|endpoint| hostname_of(&endpoint))
    }
}

/// Host part of an absolute URL
pub fn hostname_of(raw: &str) -> std::result::Result<String, OutputError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| OutputError::derivation(format!("invalid URL '{}': {}", raw, e)))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| OutputError::derivation(format!("URL '{}' has no host", raw)))
}

#[derive(Clone, Debug, Default)]
pub struct StaticWebsiteArgs {
    pub account_name: Input,
    pub resource_group_name: Input,
    pub index_document: Input,
    pub error404_document: Input,
}

impl From<StaticWebsiteArgs> for Args {
    fn from(args: StaticWebsiteArgs) -> Self {
        Args::new()
            .with("accountName", args.account_name)
            .with("resourceGroupName", args.resource_group_name)
            .with("indexDocument", args.index_document)
            .with("error404Document", args.error404_document)
    }
}

resource_handle!(
    /// Enables static website hosting on a storage account
    StorageAccountStaticWebsite,
    "azure-native:storage:StorageAccountStaticWebsite",
    StaticWebsiteArgs
);

impl StorageAccountStaticWebsite {
    /// Always `$web`
    pub fn container_name(&self) -> Output<String> {
        self.resource.string("containerName")
    }
}

/// Anonymous read access level of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicAccess {
    None,
    Container,
    Blob,
}

impl PublicAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicAccess::None => "None",
            PublicAccess::Container => "Container",
            PublicAccess::Blob => "Blob",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "None" => Some(PublicAccess::None),
            "Container" => Some(PublicAccess::Container),
            "Blob" => Some(PublicAccess::Blob),
            _ => None,
        }
    }
}

impl From<PublicAccess> for Input {
    fn from(access: PublicAccess) -> Self {
        Input::from(access.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlobContainerArgs {
    pub account_name: Input,
    pub resource_group_name: Input,
    pub container_name: Input,
    pub public_access: Input,
}

impl From<BlobContainerArgs> for Args {
    fn from(args: BlobContainerArgs) -> Self {
        Args::new()
            .with("accountName", args.account_name)
            .with("resourceGroupName", args.resource_group_name)
            .with("containerName", args.container_name)
            .with("publicAccess", args.public_access)
    }
}

resource_handle!(
    /// A blob container
    BlobContainer,
    "azure-native:storage:BlobContainer",
    BlobContainerArgs
);

impl BlobContainer {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlobArgs {
    pub account_name: Input,
    pub resource_group_name: Input,
    pub container_name: Input,
    /// Defaults to the resource's logical name
    pub blob_name: Input,
    pub source: Input,
    pub content_type: Input,
}

impl From<BlobArgs> for Args {
    fn from(args: BlobArgs) -> Self {
        Args::new()
            .with("accountName", args.account_name)
            .with("resourceGroupName", args.resource_group_name)
            .with("containerName", args.container_name)
            .with("blobName", args.blob_name)
            .with("source", args.source)
            .with("contentType", args.content_type)
    }
}

resource_handle!(
    /// A single block blob uploaded from an asset
    Blob,
    "azure-native:storage:Blob",
    BlobArgs
);

impl Blob {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }

    pub fn url(&self) -> Output<String> {
        self.resource.string("url")
    }
}

/// Arguments of `listStorageAccountServiceSAS`
#[derive(Clone, Debug, Default)]
pub struct ListServiceSasArgs {
    pub resource_group_name: Input,
    pub account_name: Input,
    pub canonicalized_resource: Input,
    /// "c" or "b"
    pub resource: Input,
    pub permissions: Input,
    pub protocols: Input,
    pub shared_access_start_time: Input,
    pub shared_access_expiry_time: Input,
    pub cache_control: Input,
    pub content_disposition: Input,
    pub content_encoding: Input,
    pub content_type: Input,
}

impl From<ListServiceSasArgs> for Args {
    fn from(args: ListServiceSasArgs) -> Self {
        Args::new()
            .with("resourceGroupName", args.resource_group_name)
            .with("accountName", args.account_name)
            .with("canonicalizedResource", args.canonicalized_resource)
            .with("resource", args.resource)
            .with("permissions", args.permissions)
            .with("protocols", args.protocols)
            .with("sharedAccessStartTime", args.shared_access_start_time)
            .with("sharedAccessExpiryTime", args.shared_access_expiry_time)
            .with("cacheControl", args.cache_control)
            .with("contentDisposition", args.content_disposition)
            .with("contentEncoding", args.content_encoding)
            .with("contentType", args.content_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListServiceSasResult {
    pub service_sas_token: String,
}

/// Asks the storage service for a SAS token once every argument is known
pub fn list_storage_account_service_sas(
    ctx: &Session,
    args: ListServiceSasArgs,
) -> Output<String> {
    ctx.invoke(LIST_SERVICE_SAS, args.into())
        .decode::<ListServiceSasResult>()
        .apply(|result| result.service_sas_token)
}

fn storage_id(request: &CreateRequest, account: &str) -> Result<String> {
    let group = request.require_str("resourceGroupName")?;
    Ok(arm_id(
        group,
        "Microsoft.Storage/storageAccounts",
        account,
    ))
}

fn valid_account_name(name: &str) -> bool {
    (3..=24).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Storage account names allow no dashes, so the generated name is the
/// lowercased alphanumerics of the logical name plus the suffix
fn account_name(request: &CreateRequest) -> String {
    if let Some(name) = request.input_str("accountName").filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let suffix = name_suffix(&request.urn);
    let stem: String = request
        .name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(24 - suffix.len())
        .collect();
    format!("{}{}", stem, suffix)
}

pub(crate) fn create_storage_account(request: &CreateRequest, location: &str) -> Result<PropertyMap> {
    let name = account_name(request);
    if !valid_account_name(&name) {
        return Err(AzureError::InvalidAccountName(name));
    }
    let sku = request
        .inputs
        .get("sku")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("Standard_LRS");
    if !SKUS.contains(&sku) {
        return Err(AzureError::InvalidSku(sku.to_string()));
    }

    let mut outputs = request.inputs.clone();
    outputs.insert("id".to_string(), Value::from(storage_id(request, &name)?));
    outputs.insert(
        "location".to_string(),
        Value::from(request.input_str("location").unwrap_or(location)),
    );
    outputs.insert(
        "kind".to_string(),
        Value::from(request.input_str("kind").unwrap_or("StorageV2")),
    );
    outputs.insert(
        "primaryEndpoints".to_string(),
        serde_json::json!({
            "blob": format!("https://{}.blob.core.windows.net/", name),
            "web": format!("https://{}.z13.web.core.windows.net/", name),
            "dfs": format!("https://{}.dfs.core.windows.net/", name),
            "file": format!("https://{}.file.core.windows.net/", name),
            "queue": format!("https://{}.queue.core.windows.net/", name),
            "table": format!("https://{}.table.core.windows.net/", name),
        }),
    );
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}

pub(crate) fn create_static_website(request: &CreateRequest) -> Result<PropertyMap> {
    let account = request.require_str("accountName")?;
    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(format!("{}/staticWebsite", storage_id(request, account)?)),
    );
    outputs.insert("containerName".to_string(), Value::from(WEB_CONTAINER));
    Ok(outputs)
}

pub(crate) fn create_blob_container(request: &CreateRequest) -> Result<PropertyMap> {
    let account = request.require_str("accountName")?;
    let access = request.input_str("publicAccess").unwrap_or("None");
    if PublicAccess::parse(access).is_none() {
        return Err(AzureError::InvalidPublicAccess(access.to_string()));
    }
    let name = request.physical_name("containerName");

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(format!(
            "{}/blobServices/default/containers/{}",
            storage_id(request, account)?,
            name
        )),
    );
    outputs.insert("publicAccess".to_string(), Value::from(access));
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}

/// Uploads are simulated; archives must still point at a local directory
pub(crate) fn create_blob(request: &CreateRequest, base_dir: &Path) -> Result<PropertyMap> {
    let account = request.require_str("accountName")?;
    let container = request.require_str("containerName")?;
    let name = match request.input_str("blobName") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => request.name.clone(),
    };

    let source = request
        .inputs
        .get("source")
        .and_then(Asset::from_value)
        .ok_or_else(|| AzureError::MissingSource(name.clone()))?;
    let (size, default_type) = match &source {
        Asset::String(text) => (text.len(), "text/plain"),
        Asset::FileArchive(path) => {
            let dir = base_dir.join(path);
            if !dir.is_dir() {
                return Err(AzureError::MissingSource(format!(
                    "{} (archive directory {} not found)",
                    name,
                    dir.display()
                )));
            }
            (0, "application/zip")
        }
    };

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(format!(
            "{}/blobServices/default/containers/{}/blobs/{}",
            storage_id(request, account)?,
            container,
            name
        )),
    );
    outputs.insert(
        "url".to_string(),
        Value::from(crate::sas::blob_url(account, container, &name)),
    );
    outputs.insert(
        "contentType".to_string(),
        Value::from(request.input_str("contentType").unwrap_or(default_type)),
    );
    outputs.insert("contentLength".to_string(), Value::from(size));
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}

fn optional(request: &InvokeRequest, key: &str) -> Option<String> {
    request
        .args
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Signs a service SAS with the account key the simulation hands out
pub(crate) fn list_service_sas(request: &InvokeRequest) -> Result<PropertyMap> {
    let account = request.require_str("accountName")?;
    let start = optional(request, "sharedAccessStartTime")
        .map(|raw| parse_timestamp(&raw))
        .transpose()?;
    let expiry = parse_timestamp(request.require_str("sharedAccessExpiryTime")?)?;

    let sas = ServiceSas {
        canonicalized_resource: request.require_str("canonicalizedResource")?.to_string(),
        resource: request.require_str("resource")?.to_string(),
        permissions: request.require_str("permissions")?.to_string(),
        protocols: optional(request, "protocols"),
        start,
        expiry,
        identifier: optional(request, "identifier"),
        ip_range: optional(request, "ipAddressOrRange"),
        cache_control: optional(request, "cacheControl"),
        content_disposition: optional(request, "contentDisposition"),
        content_encoding: optional(request, "contentEncoding"),
        content_language: optional(request, "contentLanguage"),
        content_type: optional(request, "contentType"),
    };
    let token = SharedKeySigner::new(&simulated_account_key(account))?.sign(&sas)?;

    let mut outputs = PropertyMap::new();
    outputs.insert("serviceSasToken".to_string(), Value::from(token));
    Ok(outputs)
}
