//! DNS record sets in Azure DNS zones

use crate::error::{AzureError, Result};
use crate::provider::arm_id;
use serde_json::Value;
use sitestack_engine::{Args, CreateRequest, Input, Output, PropertyMap, resource_handle};

#[derive(Clone, Debug, Default)]
pub struct RecordSetArgs {
    pub resource_group_name: Input,
    pub zone_name: Input,
    pub relative_record_set_name: Input,
    /// "A", "CNAME", ...
    pub record_type: Input,
    pub ttl: Input,
    /// Alias target, see [`sub_resource`]
    pub target_resource: Input,
    pub cname_record: Input,
}

impl From<RecordSetArgs> for Args {
    fn from(args: RecordSetArgs) -> Self {
        Args::new()
            .with("resourceGroupName", args.resource_group_name)
            .with("zoneName", args.zone_name)
            .with("relativeRecordSetName", args.relative_record_set_name)
            .with("recordType", args.record_type)
            .with("ttl", args.ttl)
            .with("targetResource", args.target_resource)
            .with("cnameRecord", args.cname_record)
    }
}

/// `{ id }` reference to another Azure resource
pub fn sub_resource(id: impl Into<Input>) -> Input {
    Input::object([("id", id.into())])
}

resource_handle!(
    /// A record set in an existing DNS zone
    RecordSet,
    "azure-native:network:RecordSet",
    RecordSetArgs
);

impl RecordSet {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }

    /// Fully qualified, with the trailing dot
    pub fn fqdn(&self) -> Output<String> {
        self.resource.string("fqdn")
    }
}

pub(crate) fn create_record_set(request: &CreateRequest) -> Result<PropertyMap> {
    let group = request.require_str("resourceGroupName")?;
    let zone = request.require_str("zoneName")?.trim_end_matches('.');
    let relative = request.require_str("relativeRecordSetName")?;
    let record_type = request.require_str("recordType")?;

    let has_target = request
        .inputs
        .get("targetResource")
        .and_then(|t| t.get("id"))
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    let has_cname = request
        .inputs
        .get("cnameRecord")
        .is_some_and(|c| !c.is_null());
    if !has_target && !has_cname {
        return Err(AzureError::EmptyRecordSet(format!("{}.{}", relative, zone)));
    }

    let fqdn = if relative == "@" {
        format!("{}.", zone)
    } else {
        format!("{}.{}.", relative, zone)
    };

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(format!(
            "{}/{}/{}",
            arm_id(group, "Microsoft.Network/dnsZones", zone),
            record_type,
            relative
        )),
    );
    outputs.insert("name".to_string(), Value::from(relative));
    outputs.insert("fqdn".to_string(), Value::from(fqdn));
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitestack_engine::Urn;
    use std::collections::BTreeMap;

    fn request(inputs: Value) -> CreateRequest {
        let Value::Object(inputs) = inputs else {
            panic!("object expected");
        };
        CreateRequest {
            urn: Urn::new("dev", "site", RecordSet::TOKEN, "cname"),
            token: RecordSet::TOKEN.to_string(),
            name: "cname".to_string(),
            inputs,
            config: BTreeMap::new(),
        }
    }

    #[test]
    fn test_alias_record_fqdn() {
        let outputs = create_record_set(&request(serde_json::json!({
            "resourceGroupName": "dns",
            "zoneName": "example.com",
            "relativeRecordSetName": "www",
            "recordType": "CNAME",
            "targetResource": { "id": "/subscriptions/x/endpoints/e" }
        })))
        .unwrap();
        assert_eq!(outputs["fqdn"], "www.example.com.");
        assert_eq!(outputs["name"], "www");
    }

    #[test]
    fn test_empty_record_set() {
        let err = create_record_set(&request(serde_json::json!({
            "resourceGroupName": "dns",
            "zoneName": "example.com",
            "relativeRecordSetName": "www",
            "recordType": "CNAME"
        })))
        .unwrap_err();
        assert!(matches!(err, AzureError::EmptyRecordSet(_)));
    }
}
