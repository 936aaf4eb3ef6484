//! Global external HTTP load balancing in front of a bucket
//!
//! The chain is backend bucket <- URL map <- target proxy <- forwarding
//! rule, each link referring to the previous one by self link.

use crate::error::{GcpError, Result};
use serde_json::Value;
use sitestack_engine::{Args, CreateRequest, Input, Output, PropertyMap, resource_handle, stable_id};
use std::net::Ipv4Addr;

const COMPUTE_API: &str = "https://www.googleapis.com/compute/v1/projects/";

/// Self link of a global compute resource
pub fn global_self_link(project: &str, collection: &str, name: &str) -> String {
    format!("{}{}/global/{}/{}", COMPUTE_API, project, collection, name)
}

#[derive(Clone, Debug, Default)]
pub struct BackendBucketArgs {
    pub name: Input,
    pub bucket_name: Input,
    pub enable_cdn: Input,
}

impl From<BackendBucketArgs> for Args {
    fn from(args: BackendBucketArgs) -> Self {
        Args::new()
            .with("name", args.name)
            .with("bucketName", args.bucket_name)
            .with("enableCdn", args.enable_cdn)
    }
}

resource_handle!(
    /// Serves a bucket through the load balancer, optionally with Cloud CDN
    BackendBucket,
    "gcp:compute/backendBucket:BackendBucket",
    BackendBucketArgs
);

impl BackendBucket {
    pub fn self_link(&self) -> Output<String> {
        self.resource.string("selfLink")
    }
}

#[derive(Clone, Debug, Default)]
pub struct GlobalAddressArgs {
    pub name: Input,
}

impl From<GlobalAddressArgs> for Args {
    fn from(args: GlobalAddressArgs) -> Self {
        Args::new().with("name", args.name)
    }
}

resource_handle!(
    /// A reserved global external IPv4 address
    GlobalAddress,
    "gcp:compute/globalAddress:GlobalAddress",
    GlobalAddressArgs
);

impl GlobalAddress {
    pub fn address(&self) -> Output<String> {
        self.resource.string("address")
    }
}

#[derive(Clone, Debug, Default)]
pub struct UrlMapArgs {
    pub name: Input,
    pub default_service: Input,
}

impl From<UrlMapArgs> for Args {
    fn from(args: UrlMapArgs) -> Self {
        Args::new()
            .with("name", args.name)
            .with("defaultService", args.default_service)
    }
}

resource_handle!(
    /// Routes every request to one default backend
    UrlMap,
    "gcp:compute/uRLMap:URLMap",
    UrlMapArgs
);

impl UrlMap {
    pub fn self_link(&self) -> Output<String> {
        self.resource.string("selfLink")
    }
}

#[derive(Clone, Debug, Default)]
pub struct TargetHttpProxyArgs {
    pub name: Input,
    pub url_map: Input,
}

impl From<TargetHttpProxyArgs> for Args {
    fn from(args: TargetHttpProxyArgs) -> Self {
        Args::new()
            .with("name", args.name)
            .with("urlMap", args.url_map)
    }
}

resource_handle!(
    /// HTTP proxy consulting a URL map
    TargetHttpProxy,
    "gcp:compute/targetHttpProxy:TargetHttpProxy",
    TargetHttpProxyArgs
);

impl TargetHttpProxy {
    pub fn self_link(&self) -> Output<String> {
        self.resource.string("selfLink")
    }
}

#[derive(Clone, Debug, Default)]
pub struct GlobalForwardingRuleArgs {
    pub name: Input,
    pub ip_address: Input,
    pub ip_protocol: Input,
    pub port_range: Input,
    pub target: Input,
}

impl From<GlobalForwardingRuleArgs> for Args {
    fn from(args: GlobalForwardingRuleArgs) -> Self {
        Args::new()
            .with("name", args.name)
            .with("ipAddress", args.ip_address)
            .with("ipProtocol", args.ip_protocol)
            .with("portRange", args.port_range)
            .with("target", args.target)
    }
}

resource_handle!(
    /// Sends traffic for an address and port range to a target proxy
    GlobalForwardingRule,
    "gcp:compute/globalForwardingRule:GlobalForwardingRule",
    GlobalForwardingRuleArgs
);

impl GlobalForwardingRule {
    pub fn ip_address(&self) -> Output<String> {
        self.resource.string("ipAddress")
    }
}

/// Stable public address in 34.0.0.0/8 for a resource
pub fn simulated_address(seed: &str) -> Ipv4Addr {
    let hex = stable_id(seed, 6);
    let octet = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    Ipv4Addr::new(34, octet(0), octet(2), octet(4).clamp(1, 254))
}

fn parse_port_range(raw: &str) -> Option<(u16, u16)> {
    let (low, high) = raw.split_once('-').unwrap_or((raw, raw));
    let low: u16 = low.trim().parse().ok()?;
    let high: u16 = high.trim().parse().ok()?;
    (low > 0 && low <= high).then_some((low, high))
}

fn require_self_link<'a>(request: &'a CreateRequest, key: &str) -> Result<&'a str> {
    let link = request.require_str(key)?;
    if link.starts_with(COMPUTE_API) {
        Ok(link)
    } else {
        Err(GcpError::InvalidSelfLink(link.to_string()))
    }
}

fn with_self_link(
    request: &CreateRequest,
    project: &str,
    collection: &str,
) -> PropertyMap {
    let name = request.physical_name("name");
    let mut outputs = request.inputs.clone();
    outputs.insert(
        "selfLink".to_string(),
        Value::from(global_self_link(project, collection, &name)),
    );
    outputs.insert(
        "id".to_string(),
        Value::from(format!("projects/{}/global/{}/{}", project, collection, name)),
    );
    outputs.insert("name".to_string(), Value::from(name));
    outputs
}

pub(crate) fn create_backend_bucket(request: &CreateRequest, project: &str) -> Result<PropertyMap> {
    request.require_str("bucketName")?;
    let mut outputs = with_self_link(request, project, "backendBuckets");
    outputs
        .entry("enableCdn")
        .or_insert_with(|| Value::from(false));
    Ok(outputs)
}

pub(crate) fn create_global_address(request: &CreateRequest, project: &str) -> Result<PropertyMap> {
    let mut outputs = with_self_link(request, project, "addresses");
    outputs.insert(
        "address".to_string(),
        Value::from(simulated_address(request.urn.as_str()).to_string()),
    );
    outputs.insert("addressType".to_string(), Value::from("EXTERNAL"));
    Ok(outputs)
}

pub(crate) fn create_url_map(request: &CreateRequest, project: &str) -> Result<PropertyMap> {
    require_self_link(request, "defaultService")?;
    Ok(with_self_link(request, project, "urlMaps"))
}

pub(crate) fn create_http_proxy(request: &CreateRequest, project: &str) -> Result<PropertyMap> {
    require_self_link(request, "urlMap")?;
    Ok(with_self_link(request, project, "targetHttpProxies"))
}

pub(crate) fn create_forwarding_rule(request: &CreateRequest, project: &str) -> Result<PropertyMap> {
    require_self_link(request, "target")?;
    let protocol = request.input_str("ipProtocol").unwrap_or("TCP");
    if !matches!(protocol, "TCP" | "UDP") {
        return Err(GcpError::InvalidProtocol(protocol.to_string()));
    }
    let ports = request.require_str("portRange")?;
    if parse_port_range(ports).is_none() {
        return Err(GcpError::InvalidPortRange(ports.to_string()));
    }
    let address = match request.input_str("ipAddress") {
        Some(raw) => raw
            .parse::<Ipv4Addr>()
            .map_err(|_| GcpError::InvalidAddress(raw.to_string()))?,
        None => simulated_address(request.urn.as_str()),
    };

    let mut outputs = with_self_link(request, project, "forwardingRules");
    outputs.insert("ipAddress".to_string(), Value::from(address.to_string()));
    outputs.insert("ipProtocol".to_string(), Value::from(protocol));
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
    fn test_simulated_address_is_stable() {
        let first = simulated_address("urn:a");
        assert_eq!(first, simulated_address("urn:a"));
        assert_eq!(first.octets()[0], 34);
        assert_ne!(first.octets()[3], 0);
    }

    #[test]
    fn test_port_range() {
        assert_eq!(parse_port_range("80"), Some((80, 80)));
        assert_eq!(parse_port_range("8000-8080"), Some((8000, 8080)));
        assert_eq!(parse_port_range("0"), None);
        assert_eq!(parse_port_range("90-80"), None);
        assert_eq!(parse_port_range("http"), None);
    }

    #[test]
    fn test_load_balancer_chain() {
        let backend = create_backend_bucket(
            &request(
                BackendBucket::TOKEN,
                "backend-bucket",
                serde_json::json!({ "bucketName": "b", "enableCdn": true }),
            ),
            "proj",
        )
        .unwrap();
        let backend_link = backend["selfLink"].as_str().unwrap();
        assert!(backend_link.starts_with(
            "https://www.googleapis.com/compute/v1/projects/proj/global/backendBuckets/backend-bucket-"
        ));

        let url_map = create_url_map(
            &request(
                UrlMap::TOKEN,
                "url-map",
                serde_json::json!({ "defaultService": backend_link }),
            ),
            "proj",
        )
        .unwrap();
        let proxy = create_http_proxy(
            &request(
                TargetHttpProxy::TOKEN,
                "http-proxy",
                serde_json::json!({ "urlMap": url_map["selfLink"] }),
            ),
            "proj",
        )
        .unwrap();
        let rule = create_forwarding_rule(
            &request(
                GlobalForwardingRule::TOKEN,
                "http-forwarding-rule",
                serde_json::json!({
                    "ipAddress": "34.1.2.3",
                    "ipProtocol": "TCP",
                    "portRange": "80",
                    "target": proxy["selfLink"],
                }),
            ),
            "proj",
        )
        .unwrap();
        assert_eq!(rule["ipAddress"], "34.1.2.3");
    }

    #[test]
    fn test_forwarding_rule_rejects_bad_address() {
        let err = create_forwarding_rule(
            &request(
                GlobalForwardingRule::TOKEN,
                "rule",
                serde_json::json!({
                    "ipAddress": "ip.address",
                    "portRange": "80",
                    "target": global_self_link("p", "targetHttpProxies", "x"),
                }),
            ),
            "p",
        )
        .unwrap_err();
        assert!(matches!(err, GcpError::InvalidAddress(_)));
    }

    #[test]
    fn test_url_map_needs_self_link() {
        let err = create_url_map(
            &request(UrlMap::TOKEN, "url-map", serde_json::json!({ "defaultService": "backend" })),
            "p",
        )
        .unwrap_err();
        assert!(matches!(err, GcpError::InvalidSelfLink(_)));
    }
}
