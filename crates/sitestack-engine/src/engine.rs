//! Deployment engine
//!
//! [`Engine`] is the seam between the resource graph and whatever actually
//! creates resources. [`LocalEngine`] routes every request to an in-process
//! [`ResourceProvider`] by package.

use crate::error::{EngineError, Result};
use crate::input::PropertyMap;
use crate::provider::{CreateRequest, InvokeRequest, ResourceProvider};
use crate::resource::package_of;
use crate::session::Registration;
use crate::state::ResourceState;
use async_trait::async_trait;
use serde_json::Value;
use sitestack_config::StackConfig;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Package of the built-in provider-instance resources
/// (`sitestack:providers:<package>`)
pub const PROVIDERS_PACKAGE: &str = "sitestack";

#[async_trait]
pub trait Engine: Send + Sync {
    /// Validates a registration; errors here fail the program run
    fn check(&self, registration: &Registration) -> Result<()>;

    async fn create(&self, request: CreateRequest) -> Result<PropertyMap>;

    async fn delete(&self, resource: &ResourceState) -> Result<()>;

    async fn invoke(&self, token: &str, args: &PropertyMap) -> Result<PropertyMap>;
}

/// Runs every provider in-process
pub struct LocalEngine {
    config: StackConfig,
    providers: BTreeMap<String, Arc<dyn ResourceProvider>>,
}

impl LocalEngine {
    pub fn new(config: StackConfig) -> Self {
        let mut providers: BTreeMap<String, Arc<dyn ResourceProvider>> = BTreeMap::new();
        providers.insert(PROVIDERS_PACKAGE.to_string(), Arc::new(ProviderInstances));
        Self { config, providers }
    }

    pub fn with_provider(mut self, provider: impl ResourceProvider + 'static) -> Self {
        self.add_provider(Arc::new(provider));
        self
    }

    pub fn add_provider(&mut self, provider: Arc<dyn ResourceProvider>) {
        tracing::debug!(package = provider.name(), "Registered provider");
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    fn provider_for(&self, token: &str) -> Result<&Arc<dyn ResourceProvider>> {
        let package = package_of(token)?;
        self.providers
            .get(package)
            .ok_or_else(|| EngineError::ProviderNotFound(package.to_string()))
    }

    /// Stack config under `<package>:`, overridden by explicit settings
    fn provider_config(
        &self,
        token: &str,
        explicit: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let mut config = self.config.namespace(package_of(token)?);
        config.extend(explicit);
        Ok(config)
    }
}

#[async_trait]
impl Engine for LocalEngine {
    fn check(&self, registration: &Registration) -> Result<()> {
        self.provider_for(&registration.token)?.check(registration)
    }

    async fn create(&self, mut request: CreateRequest) -> Result<PropertyMap> {
        let provider = self.provider_for(&request.token)?;
        request.config = self.provider_config(&request.token, std::mem::take(&mut request.config))?;
        tracing::info!(urn = %request.urn, provider = provider.display_name(), "Creating resource");
        provider.create(&request).await
    }

    async fn delete(&self, resource: &ResourceState) -> Result<()> {
        let provider = self.provider_for(&resource.token)?;
        tracing::info!(urn = %resource.urn, "Deleting resource");
        provider.delete(resource).await
    }

    async fn invoke(&self, token: &str, args: &PropertyMap) -> Result<PropertyMap> {
        let provider = self.provider_for(token)?;
        let request = InvokeRequest {
            token: token.to_string(),
            args: args.clone(),
            config: self.provider_config(token, BTreeMap::new())?,
        };
        provider.invoke(&request).await
    }
}

/// Explicit provider instances, e.g. a second AWS provider pinned to
/// another region. Their outputs are their settings.
struct ProviderInstances;

#[async_trait]
impl ResourceProvider for ProviderInstances {
    fn name(&self) -> &str {
        PROVIDERS_PACKAGE
    }

    fn display_name(&self) -> &str {
        "Provider instances"
    }

    fn supports(&self, token: &str) -> bool {
        token.starts_with("sitestack:providers:")
    }

    async fn create(&self, request: &CreateRequest) -> Result<PropertyMap> {
        Ok(request.inputs.clone())
    }
}

/// Flattens provider-instance outputs into string settings
pub fn settings_from_outputs(outputs: &PropertyMap) -> BTreeMap<String, String> {
    outputs
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key.clone(), s.clone())),
            Value::Null => None,
            other => Some((key.clone(), other.to_string())),
        })
        .collect()
}
