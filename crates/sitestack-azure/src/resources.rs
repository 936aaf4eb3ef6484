//! Resource groups

use crate::error::Result;
use crate::provider::{SUBSCRIPTION_ID, resource_group_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitestack_engine::{
    Args, CreateRequest, Input, InvokeRequest, Output, PropertyMap, Session, resource_handle,
};

pub const GET_RESOURCE_GROUP: &str = "azure-native:resources:getResourceGroup";

#[derive(Clone, Debug, Default)]
pub struct ResourceGroupArgs {
    pub resource_group_name: Input,
    pub location: Input,
}

impl From<ResourceGroupArgs> for Args {
    fn from(args: ResourceGroupArgs) -> Self {
        Args::new()
            .with("resourceGroupName", args.resource_group_name)
            .with("location", args.location)
    }
}

resource_handle!(
    /// A resource group holding the program's Azure resources
    ResourceGroup,
    "azure-native:resources:ResourceGroup",
    ResourceGroupArgs
);

impl ResourceGroup {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }

    pub fn location(&self) -> Output<String> {
        self.resource.string("location")
    }
}

#[derive(Clone, Debug, Default)]
pub struct GetResourceGroupArgs {
    pub resource_group_name: Input,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResourceGroupResult {
    pub id: String,
    pub name: String,
    pub location: String,
}

/// Looks up an existing resource group, e.g. the one holding a DNS zone
pub fn get_resource_group(ctx: &Session, args: GetResourceGroupArgs) -> Output<GetResourceGroupResult> {
    ctx.invoke(
        GET_RESOURCE_GROUP,
        Args::new().with("resourceGroupName", args.resource_group_name),
    )
    .decode()
}

pub(crate) fn create_resource_group(request: &CreateRequest, location: &str) -> Result<PropertyMap> {
    let name = request.physical_name("resourceGroupName");
    let location = request.input_str("location").unwrap_or(location);

    let mut outputs = request.inputs.clone();
    outputs.insert("id".to_string(), Value::from(resource_group_id(&name)));
    outputs.insert("name".to_string(), Value::from(name));
    outputs.insert("location".to_string(), Value::from(location));
    outputs.insert("subscriptionId".to_string(), Value::from(SUBSCRIPTION_ID));
    Ok(outputs)
}

pub(crate) fn lookup_resource_group(request: &InvokeRequest, location: &str) -> Result<PropertyMap> {
    let name = request.require_str("resourceGroupName")?;
    let mut outputs = PropertyMap::new();
    outputs.insert("id".to_string(), Value::from(resource_group_id(name)));
    outputs.insert("name".to_string(), Value::from(name));
    outputs.insert("location".to_string(), Value::from(location));
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitestack_engine::Urn;
    use std::collections::BTreeMap;

    #[test]
    fn test_generated_name() {
        let request = CreateRequest {
            urn: Urn::new("dev", "site", ResourceGroup::TOKEN, "resource-group"),
            token: ResourceGroup::TOKEN.to_string(),
            name: "resource-group".to_string(),
            inputs: PropertyMap::new(),
            config: BTreeMap::new(),
        };
        let outputs = create_resource_group(&request, "westus2").unwrap();
        let name = outputs["name"].as_str().unwrap();
        assert!(name.starts_with("resource-group-"));
        assert_eq!(outputs["location"], "westus2");
        assert!(
            outputs["id"]
                .as_str()
                .unwrap()
                .ends_with(&format!("/resourceGroups/{}", name))
        );
    }

    #[test]
    fn test_lookup() {
        let Value::Object(args) = serde_json::json!({ "resourceGroupName": "dns" }) else {
            unreachable!()
        };
        let request = InvokeRequest {
            token: GET_RESOURCE_GROUP.to_string(),
            args,
            config: BTreeMap::new(),
        };
        let group = lookup_resource_group(&request, "westus2").unwrap();
        assert_eq!(group["name"], "dns");
    }
}
