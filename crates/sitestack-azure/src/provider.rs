//! Simulated azure-native provider
//!
//! Generates the names, resource ids and endpoints Azure Resource Manager
//! would report. SAS tokens are really signed, with a per-account key
//! derived from the account name.

use crate::cdn::{self, CustomDomain, Endpoint, Profile};
use crate::error::AzureError;
use crate::network::{self, RecordSet};
use crate::resources::{self, GET_RESOURCE_GROUP, ResourceGroup};
use crate::storage::{
    self, Blob, BlobContainer, LIST_SERVICE_SAS, StorageAccount, StorageAccountStaticWebsite,
};
use crate::web::{self, AppServicePlan, WebApp};
use async_trait::async_trait;
use sitestack_engine::{
    Args, CreateRequest, EngineError, Input, InvokeRequest, PropertyMap, Registration,
    ResourceProvider, require_args, resource_handle,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const PACKAGE: &str = "azure-native";

pub const DEFAULT_LOCATION: &str = "westus2";

/// Subscription every simulated resource id lives under
pub const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

const LOCATIONS: &[&str] = &[
    "eastus",
    "eastus2",
    "westus",
    "westus2",
    "centralus",
    "northeurope",
    "westeurope",
    "uksouth",
    "japaneast",
    "southeastasia",
    "australiaeast",
];

pub fn resource_group_id(group: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", SUBSCRIPTION_ID, group)
}

/// `/subscriptions/<sub>/resourceGroups/<group>/providers/<kind>/<name>`
pub fn arm_id(group: &str, kind: &str, name: &str) -> String {
    format!("{}/providers/{}/{}", resource_group_id(group), kind, name)
}

#[derive(Clone, Debug, Default)]
pub struct ProviderArgs {
    pub location: Input,
}

impl From<ProviderArgs> for Args {
    fn from(args: ProviderArgs) -> Self {
        Args::new().with("location", args.location)
    }
}

resource_handle!(
    /// An explicit azure-native provider instance
    Provider,
    "sitestack:providers:azure-native",
    ProviderArgs
);

/// The `azure-native` package
pub struct AzureProvider {
    /// Archive sources resolve against this directory
    base_dir: PathBuf,
}

impl AzureProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn location<'a>(&self, config: &'a BTreeMap<String, String>) -> Result<&'a str, AzureError> {
        let location = config
            .get("location")
            .map(String::as_str)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCATION);
        if LOCATIONS.contains(&location) {
            Ok(location)
        } else {
            Err(AzureError::InvalidLocation(location.to_string()))
        }
    }

    fn unsupported(token: &str) -> EngineError {
        EngineError::UnsupportedResource {
            provider: PACKAGE.to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl ResourceProvider for AzureProvider {
    fn name(&self) -> &str {
        PACKAGE
    }

    fn display_name(&self) -> &str {
        "Azure"
    }

    fn supports(&self, token: &str) -> bool {
        matches!(
            token,
            ResourceGroup::TOKEN
                | StorageAccount::TOKEN
                | StorageAccountStaticWebsite::TOKEN
                | BlobContainer::TOKEN
                | Blob::TOKEN
                | AppServicePlan::TOKEN
                | WebApp::TOKEN
                | Profile::TOKEN
                | Endpoint::TOKEN
                | CustomDomain::TOKEN
                | RecordSet::TOKEN
        )
    }

    fn check(&self, registration: &Registration) -> sitestack_engine::Result<()> {
        let required: &[&str] = match registration.token.as_str() {
            ResourceGroup::TOKEN => &[],
            StorageAccount::TOKEN | Profile::TOKEN | AppServicePlan::TOKEN => {
                &["resourceGroupName", "sku"]
            }
            StorageAccountStaticWebsite::TOKEN | BlobContainer::TOKEN => {
                &["resourceGroupName", "accountName"]
            }
            Blob::TOKEN => &["resourceGroupName", "accountName", "containerName", "source"],
            WebApp::TOKEN => &["resourceGroupName", "serverFarmId"],
            Endpoint::TOKEN => &["resourceGroupName", "profileName", "origins"],
            CustomDomain::TOKEN => &["resourceGroupName", "profileName", "endpointName", "hostName"],
            RecordSet::TOKEN => &[
                "resourceGroupName",
                "zoneName",
                "relativeRecordSetName",
                "recordType",
            ],
            other => return Err(Self::unsupported(other)),
        };
        require_args(registration, required)
    }

    async fn create(&self, request: &CreateRequest) -> sitestack_engine::Result<PropertyMap> {
        let outputs = match request.token.as_str() {
            ResourceGroup::TOKEN => {
                resources::create_resource_group(request, self.location(&request.config)?)?
            }
            StorageAccount::TOKEN => {
                storage::create_storage_account(request, self.location(&request.config)?)?
            }
            StorageAccountStaticWebsite::TOKEN => storage::create_static_website(request)?,
            BlobContainer::TOKEN => storage::create_blob_container(request)?,
            Blob::TOKEN => storage::create_blob(request, &self.base_dir)?,
            AppServicePlan::TOKEN => web::create_plan(request, self.location(&request.config)?)?,
            WebApp::TOKEN => web::create_web_app(request)?,
            Profile::TOKEN => cdn::create_profile(request)?,
            Endpoint::TOKEN => cdn::create_endpoint(request)?,
            CustomDomain::TOKEN => cdn::create_custom_domain(request)?,
            RecordSet::TOKEN => network::create_record_set(request)?,
            other => return Err(Self::unsupported(other)),
        };
        tracing::debug!(urn = %request.urn, "Simulated Azure resource");
        Ok(outputs)
    }

    async fn invoke(&self, request: &InvokeRequest) -> sitestack_engine::Result<PropertyMap> {
        match request.token.as_str() {
            GET_RESOURCE_GROUP => Ok(resources::lookup_resource_group(
                request,
                self.location(&request.config)?,
            )?),
            LIST_SERVICE_SAS => {
                tracing::debug!(
                    account = request.args.get("accountName").and_then(|v| v.as_str()),
                    "Signing service SAS"
                );
                Ok(storage::list_service_sas(request)?)
            }
            other => Err(Self::unsupported(other)),
        }
    }
}
