//! Azure resources for sitestack
//!
//! Typed handles for the `azure-native` package and a simulated provider
//! that answers for them:
//!
//! - Resource groups and resource group lookups
//! - Storage accounts, the static website container, blob containers and blobs
//! - Service SAS tokens signed with the account key ([`sas`])
//! - Consumption App Service plans and function apps
//! - CDN profiles, endpoints and custom domains
//! - DNS record sets
//!
//! # Example
//!
//! ```ignore
//! use sitestack_azure::{ResourceGroup, ResourceGroupArgs};
//!
//! let group = ResourceGroup::new(&ctx, "resource-group", ResourceGroupArgs::default(), Default::default())?;
//! ctx.export("resourceGroup", group.name());
//! ```

pub mod cdn;
pub mod error;
pub mod network;
pub mod provider;
pub mod resources;
pub mod sas;
pub mod storage;
pub mod web;

pub use error::{AzureError, Result, SasError};
pub use provider::{AzureProvider, DEFAULT_LOCATION, PACKAGE, Provider, ProviderArgs};
pub use resources::{
    GetResourceGroupArgs, GetResourceGroupResult, ResourceGroup, ResourceGroupArgs,
    get_resource_group,
};
pub use sas::{ServiceSas, SharedKeySigner, signed_blob_url, validity_window};
pub use storage::{
    Blob, BlobArgs, BlobContainer, BlobContainerArgs, ListServiceSasArgs, PublicAccess,
    SkuArgs, StaticWebsiteArgs, StorageAccount, StorageAccountArgs, StorageAccountStaticWebsite,
    hostname_of, list_storage_account_service_sas,
};
