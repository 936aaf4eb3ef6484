//! Route 53 records and hosted zone lookups

use crate::error::{AwsError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitestack_engine::{
    Args, CreateRequest, Input, InvokeRequest, Output, PropertyMap, Session, resource_handle,
    stable_id,
};

pub const GET_ZONE: &str = "aws:route53/getZone:getZone";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Txt,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::Aaaa),
            "CNAME" => Some(RecordType::Cname),
            "MX" => Some(RecordType::Mx),
            "NS" => Some(RecordType::Ns),
            "TXT" => Some(RecordType::Txt),
            _ => None,
        }
    }
}

impl From<RecordType> for Input {
    fn from(record_type: RecordType) -> Self {
        Input::from(record_type.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordArgs {
    pub zone_id: Input,
    pub name: Input,
    pub record_type: Input,
    pub ttl: Input,
    pub records: Input,
    pub aliases: Vec<RecordAliasArgs>,
}

/// Points a record at another AWS resource (e.g. a distribution)
#[derive(Clone, Debug, Default)]
pub struct RecordAliasArgs {
    pub name: Input,
    pub zone_id: Input,
    pub evaluate_target_health: Input,
}

impl From<RecordAliasArgs> for Input {
    fn from(args: RecordAliasArgs) -> Self {
        Input::object([
            ("name", args.name),
            ("zoneId", args.zone_id),
            ("evaluateTargetHealth", args.evaluate_target_health),
        ])
    }
}

impl From<RecordArgs> for Args {
    fn from(args: RecordArgs) -> Self {
        let aliases = if args.aliases.is_empty() {
            Input::Absent
        } else {
            Input::from(args.aliases)
        };
        Args::new()
            .with("zoneId", args.zone_id)
            .with("name", args.name)
            .with("type", args.record_type)
            .with("ttl", args.ttl)
            .with("records", args.records)
            .with("aliases", aliases)
    }
}

resource_handle!(
    /// A DNS record in a hosted zone
    Record,
    "aws:route53/record:Record",
    RecordArgs
);

impl Record {
    pub fn fqdn(&self) -> Output<String> {
        self.resource.string("fqdn")
    }

    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }
}

#[derive(Clone, Debug, Default)]
pub struct GetZoneArgs {
    pub name: Input,
    pub private_zone: Input,
}

impl From<GetZoneArgs> for Args {
    fn from(args: GetZoneArgs) -> Self {
        Args::new()
            .with("name", args.name)
            .with("privateZone", args.private_zone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetZoneResult {
    pub id: String,
    pub zone_id: String,
    pub name: String,
    #[serde(default)]
    pub name_servers: Vec<String>,
}

/// Looks up an existing hosted zone by name
pub fn get_zone(ctx: &Session, args: GetZoneArgs) -> Output<GetZoneResult> {
    ctx.invoke(GET_ZONE, args.into()).decode()
}

/// Zone id the simulated provider reports for `name`
pub fn zone_id_for(name: &str) -> String {
    format!(
        "Z{}",
        stable_id(name.trim_end_matches('.'), 13).to_uppercase()
    )
}

pub(crate) fn lookup_zone(request: &InvokeRequest) -> Result<PropertyMap> {
    let name = request.require_str("name")?.trim_end_matches('.');
    if !name.contains('.') {
        return Err(AwsError::ZoneNotFound(name.to_string()));
    }
    let zone_id = zone_id_for(name);
    let mut outputs = PropertyMap::new();
    outputs.insert("id".to_string(), Value::from(zone_id.as_str()));
    outputs.insert("zoneId".to_string(), Value::from(zone_id.as_str()));
    outputs.insert("name".to_string(), Value::from(name));
    outputs.insert(
        "nameServers".to_string(),
        Value::from(
            (1..=4)
                .map(|i| format!("ns-{}.awsdns-{}.net", stable_id(&format!("{}{}", name, i), 3), i))
                .collect::<Vec<_>>(),
        ),
    );
    Ok(outputs)
}

/// Creates a record; `zone_name` is the hosted zone's name when known
pub(crate) fn create_record(request: &CreateRequest, zone_name: Option<&str>) -> Result<PropertyMap> {
    let name = request.require_str("name")?.trim_end_matches('.');
    request.require_str("zoneId")?;
    let raw_type = request.require_str("type")?;
    if RecordType::parse(raw_type).is_none() {
        return Err(AwsError::InvalidRecordType(raw_type.to_string()));
    }

    let has_records = request
        .inputs
        .get("records")
        .and_then(Value::as_array)
        .is_some_and(|r| !r.is_empty());
    let has_aliases = request
        .inputs
        .get("aliases")
        .and_then(Value::as_array)
        .is_some_and(|a| !a.is_empty());
    if !has_records && !has_aliases {
        return Err(AwsError::EmptyRecord(name.to_string()));
    }

    let fqdn = match zone_name {
        Some(zone) if name != zone && !name.ends_with(&format!(".{}", zone)) => {
            format!("{}.{}", name, zone)
        }
        _ => name.to_string(),
    };

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(format!(
            "{}_{}_{}",
            request.require_str("zoneId")?,
            fqdn,
            raw_type
        )),
    );
    outputs.insert("fqdn".to_string(), Value::from(fqdn));
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitestack_engine::{EngineError, Urn};
    use std::collections::BTreeMap;

    fn request(inputs: Value) -> CreateRequest {
        let Value::Object(inputs) = inputs else {
            panic!("object expected");
        };
        CreateRequest {
            urn: Urn::new("dev", "site", Record::TOKEN, "record"),
            token: Record::TOKEN.to_string(),
            name: "record".to_string(),
            inputs,
            config: BTreeMap::new(),
        }
    }

    #[test]
    fn test_lookup_zone() {
        let Value::Object(args) = serde_json::json!({ "name": "example.com." }) else {
            unreachable!()
        };
        let request = InvokeRequest {
            token: GET_ZONE.to_string(),
            args,
            config: BTreeMap::new(),
        };
        let zone = lookup_zone(&request).unwrap();
        assert_eq!(zone["zoneId"], zone_id_for("example.com"));
        assert_eq!(zone["name"], "example.com");
        assert!(zone_id_for("example.com").starts_with('Z'));
        assert_eq!(zone_id_for("example.com").len(), 14);
    }

    #[test]
    fn test_alias_record_fqdn() {
        let outputs = create_record(
            &request(serde_json::json!({
                "zoneId": "Z1",
                "name": "www",
                "type": "A",
                "aliases": [{ "name": "d1.cloudfront.net", "zoneId": "Z2FDTNDATAQYW2" }]
            })),
            Some("example.com"),
        )
        .unwrap();
        assert_eq!(outputs["fqdn"], "www.example.com");

        let outputs = create_record(
            &request(serde_json::json!({
                "zoneId": "Z1",
                "name": "_abc.www.example.com.",
                "type": "CNAME",
                "records": ["_x.acm-validations.aws."]
            })),
            Some("example.com"),
        )
        .unwrap();
        assert_eq!(outputs["fqdn"], "_abc.www.example.com");
    }

    #[test]
    fn test_record_validation() {
        let empty = create_record(
            &request(serde_json::json!({ "zoneId": "Z1", "name": "www", "type": "A" })),
            None,
        );
        assert!(matches!(empty, Err(AwsError::EmptyRecord(_))));

        let bad_type = create_record(
            &request(serde_json::json!({
                "zoneId": "Z1", "name": "www", "type": "SPF", "records": ["x"]
            })),
            None,
        );
        assert!(matches!(bad_type, Err(AwsError::InvalidRecordType(_))));

        let missing = create_record(&request(serde_json::json!({ "name": "www" })), None);
        assert!(matches!(
            missing,
            Err(AwsError::Engine(EngineError::InvalidArgument { .. }))
        ));
    }
}
