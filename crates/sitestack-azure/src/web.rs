//! App Service plans and function apps

use crate::error::{AzureError, Result};
use crate::provider::arm_id;
use serde_json::Value;
use sitestack_engine::{Args, CreateRequest, Input, Output, PropertyMap, resource_handle};

/// Consumption (serverless) plan SKU
pub const CONSUMPTION_SKU: (&str, &str) = ("Y1", "Dynamic");

#[derive(Clone, Debug, Default)]
pub struct SkuDescriptionArgs {
    pub name: Input,
    pub tier: Input,
}

impl From<SkuDescriptionArgs> for Input {
    fn from(args: SkuDescriptionArgs) -> Self {
        Input::object([("name", args.name), ("tier", args.tier)])
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppServicePlanArgs {
    pub resource_group_name: Input,
    pub kind: Input,
    pub sku: SkuDescriptionArgs,
}

impl From<AppServicePlanArgs> for Args {
    fn from(args: AppServicePlanArgs) -> Self {
        Args::new()
            .with("resourceGroupName", args.resource_group_name)
            .with("kind", args.kind)
            .with("sku", args.sku)
    }
}

resource_handle!(
    /// Compute plan the function app runs on
    AppServicePlan,
    "azure-native:web:AppServicePlan",
    AppServicePlanArgs
);

impl AppServicePlan {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }
}

#[derive(Clone, Debug, Default)]
pub struct NameValuePairArgs {
    pub name: Input,
    pub value: Input,
}

impl NameValuePairArgs {
    pub fn new(name: impl Into<Input>, value: impl Into<Input>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl From<NameValuePairArgs> for Input {
    fn from(args: NameValuePairArgs) -> Self {
        Input::object([("name", args.name), ("value", args.value)])
    }
}

#[derive(Clone, Debug, Default)]
pub struct CorsSettingsArgs {
    pub allowed_origins: Input,
}

impl From<CorsSettingsArgs> for Input {
    fn from(args: CorsSettingsArgs) -> Self {
        Input::object([("allowedOrigins", args.allowed_origins)])
    }
}

#[derive(Clone, Debug, Default)]
pub struct SiteConfigArgs {
    pub app_settings: Vec<NameValuePairArgs>,
    pub cors: Option<CorsSettingsArgs>,
}

impl From<SiteConfigArgs> for Input {
    fn from(args: SiteConfigArgs) -> Self {
        Input::object([
            ("appSettings", Input::from(args.app_settings)),
            ("cors", args.cors.into()),
        ])
    }
}

#[derive(Clone, Debug, Default)]
pub struct WebAppArgs {
    pub resource_group_name: Input,
    pub kind: Input,
    pub server_farm_id: Input,
    pub site_config: SiteConfigArgs,
}

impl From<WebAppArgs> for Args {
    fn from(args: WebAppArgs) -> Self {
        Args::new()
            .with("resourceGroupName", args.resource_group_name)
            .with("kind", args.kind)
            .with("serverFarmId", args.server_farm_id)
            .with("siteConfig", args.site_config)
    }
}

resource_handle!(
    /// A web or function app
    WebApp,
    "azure-native:web:WebApp",
    WebAppArgs
);

impl WebApp {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }

    /// `<name>.azurewebsites.net`
    pub fn default_host_name(&self) -> Output<String> {
        self.resource.string("defaultHostName")
    }
}

pub(crate) fn create_plan(request: &CreateRequest, location: &str) -> Result<PropertyMap> {
    let group = request.require_str("resourceGroupName")?;
    let sku = request
        .inputs
        .get("sku")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| AzureError::InvalidSku("missing sku name".to_string()))?;
    let name = request.physical_name("name");

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(arm_id(group, "Microsoft.Web/serverfarms", &name)),
    );
    outputs.insert("location".to_string(), Value::from(location));
    outputs.insert(
        "reserved".to_string(),
        Value::from(sku == CONSUMPTION_SKU.0),
    );
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}

fn app_settings(inputs: &PropertyMap) -> impl Iterator<Item = (&str, &str)> {
    inputs
        .get("siteConfig")
        .and_then(|c| c.get("appSettings"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|pair| {
            Some((
                pair.get("name")?.as_str()?,
                pair.get("value")?.as_str()?,
            ))
        })
}

/// The package URL must be an absolute https URL the platform can fetch
pub(crate) fn create_web_app(request: &CreateRequest) -> Result<PropertyMap> {
    let group = request.require_str("resourceGroupName")?;
    request.require_str("serverFarmId")?;
    for (key, value) in app_settings(&request.inputs) {
        if key == "WEBSITE_RUN_FROM_PACKAGE" && value != "1" {
            let parsed = url::Url::parse(value)
                .map_err(|_| AzureError::InvalidHostName(value.to_string()))?;
            if parsed.scheme() != "https" {
                return Err(AzureError::InvalidHostName(value.to_string()));
            }
        }
    }
    let name = request.physical_name("name");

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(arm_id(group, "Microsoft.Web/sites", &name)),
    );
    outputs.insert(
        "defaultHostName".to_string(),
        Value::from(format!("{}.azurewebsites.net", name)),
    );
    outputs.insert("state".to_string(), Value::from("Running"));
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitestack_engine::Urn;
    use std::collections::BTreeMap;

    fn request(token: &str, name: &str, inputs: Value) -> CreateRequest {
        let Value::Object(inputs) = inputs else {
            panic!("object expected");
        };
        CreateRequest {
            urn: Urn::new("dev", "site", token, name),
            token: token.to_string(),
            name: name.to_string(),
            inputs,
            config: BTreeMap::new(),
        }
    }

    #[test]
    fn test_consumption_plan() {
        let outputs = create_plan(
            &request(
                AppServicePlan::TOKEN,
                "plan",
                serde_json::json!({ "resourceGroupName": "rg", "sku": { "name": "Y1", "tier": "Dynamic" } }),
            ),
            "westus2",
        )
        .unwrap();
        assert_eq!(outputs["reserved"], true);
        assert!(
            outputs["id"]
                .as_str()
                .unwrap()
                .contains("/providers/Microsoft.Web/serverfarms/plan-")
        );
    }

    #[test]
    fn test_function_app_host_name() {
        let outputs = create_web_app(&request(
            WebApp::TOKEN,
            "function-app",
            serde_json::json!({
                "resourceGroupName": "rg",
                "kind": "FunctionApp",
                "serverFarmId": "/subscriptions/x/plan",
                "siteConfig": { "appSettings": [
                    { "name": "WEBSITE_RUN_FROM_PACKAGE", "value": "https://a.blob.core.windows.net/c/b?sig=x" }
                ]}
            }),
        ))
        .unwrap();
        let name = outputs["name"].as_str().unwrap();
        assert_eq!(
            outputs["defaultHostName"],
            format!("{}.azurewebsites.net", name)
        );
    }

    #[test]
    fn test_package_url_must_be_https() {
        let err = create_web_app(&request(
            WebApp::TOKEN,
            "function-app",
            serde_json::json!({
                "resourceGroupName": "rg",
                "serverFarmId": "/subscriptions/x/plan",
                "siteConfig": { "appSettings": [
                    { "name": "WEBSITE_RUN_FROM_PACKAGE", "value": "http://insecure/blob" }
                ]}
            }),
        ))
        .unwrap_err();
        assert!(matches!(err, AzureError::InvalidHostName(_)));
    }

    #[test]
    fn test_site_config_shape() {
        let args: Args = WebAppArgs {
            site_config: SiteConfigArgs {
                app_settings: vec![NameValuePairArgs::new("runtime", "node")],
                cors: Some(CorsSettingsArgs {
                    allowed_origins: vec!["*"].into(),
                }),
            },
            ..Default::default()
        }
        .into();
        assert!(matches!(args.get("siteConfig"), Some(Input::Object(_))));
    }
}
