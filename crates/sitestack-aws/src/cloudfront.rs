//! CloudFront distributions

use crate::acm::{ACCOUNT_ID, arn_region};
use crate::error::{AwsError, Result};
use serde_json::Value;
use sitestack_engine::{Args, CreateRequest, Input, Output, PropertyMap, resource_handle, stable_id};

/// Hosted zone every CloudFront domain lives in (alias targets use it)
pub const HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

#[derive(Clone, Debug, Default)]
pub struct DistributionArgs {
    pub enabled: Input,
    pub origins: Vec<OriginArgs>,
    pub default_cache_behavior: CacheBehaviorArgs,
    pub price_class: Input,
    pub custom_error_responses: Vec<CustomErrorResponseArgs>,
    pub restrictions: RestrictionsArgs,
    pub aliases: Input,
    pub viewer_certificate: ViewerCertificateArgs,
}

#[derive(Clone, Debug, Default)]
pub struct OriginArgs {
    pub origin_id: Input,
    pub domain_name: Input,
    pub custom_origin_config: Option<CustomOriginConfigArgs>,
}

#[derive(Clone, Debug, Default)]
pub struct CustomOriginConfigArgs {
    pub origin_protocol_policy: Input,
    pub http_port: Input,
    pub https_port: Input,
    pub origin_ssl_protocols: Input,
}

#[derive(Clone, Debug, Default)]
pub struct CacheBehaviorArgs {
    pub target_origin_id: Input,
    pub viewer_protocol_policy: Input,
    pub allowed_methods: Input,
    pub cached_methods: Input,
    pub default_ttl: Input,
    pub max_ttl: Input,
    pub min_ttl: Input,
    pub forwarded_values: Option<ForwardedValuesArgs>,
}

#[derive(Clone, Debug, Default)]
pub struct ForwardedValuesArgs {
    pub query_string: Input,
    /// "all", "none" or "whitelist"
    pub cookies_forward: Input,
}

#[derive(Clone, Debug, Default)]
pub struct CustomErrorResponseArgs {
    pub error_code: Input,
    pub response_code: Input,
    pub response_page_path: Input,
}

#[derive(Clone, Debug, Default)]
pub struct RestrictionsArgs {
    pub restriction_type: Input,
}

#[derive(Clone, Debug, Default)]
pub struct ViewerCertificateArgs {
    pub cloudfront_default_certificate: Input,
    pub acm_certificate_arn: Input,
    pub ssl_support_method: Input,
}

impl From<CustomOriginConfigArgs> for Input {
    fn from(args: CustomOriginConfigArgs) -> Self {
        Input::object([
            ("originProtocolPolicy", args.origin_protocol_policy),
            ("httpPort", args.http_port),
            ("httpsPort", args.https_port),
            ("originSslProtocols", args.origin_ssl_protocols),
        ])
    }
}

impl From<OriginArgs> for Input {
    fn from(args: OriginArgs) -> Self {
        Input::object([
            ("originId", args.origin_id),
            ("domainName", args.domain_name),
            ("customOriginConfig", args.custom_origin_config.into()),
        ])
    }
}

impl From<ForwardedValuesArgs> for Input {
    fn from(args: ForwardedValuesArgs) -> Self {
        Input::object([
            ("queryString", args.query_string),
            (
                "cookies",
                Input::object([("forward", args.cookies_forward)]),
            ),
        ])
    }
}

impl From<CacheBehaviorArgs> for Input {
    fn from(args: CacheBehaviorArgs) -> Self {
        Input::object([
            ("targetOriginId", args.target_origin_id),
            ("viewerProtocolPolicy", args.viewer_protocol_policy),
            ("allowedMethods", args.allowed_methods),
            ("cachedMethods", args.cached_methods),
            ("defaultTtl", args.default_ttl),
            ("maxTtl", args.max_ttl),
            ("minTtl", args.min_ttl),
            ("forwardedValues", args.forwarded_values.into()),
        ])
    }
}

impl From<CustomErrorResponseArgs> for Input {
    fn from(args: CustomErrorResponseArgs) -> Self {
        Input::object([
            ("errorCode", args.error_code),
            ("responseCode", args.response_code),
            ("responsePagePath", args.response_page_path),
        ])
    }
}

impl From<RestrictionsArgs> for Input {
    fn from(args: RestrictionsArgs) -> Self {
        Input::object([(
            "geoRestriction",
            Input::object([("restrictionType", args.restriction_type)]),
        )])
    }
}

impl From<ViewerCertificateArgs> for Input {
    fn from(args: ViewerCertificateArgs) -> Self {
        Input::object([
            (
                "cloudfrontDefaultCertificate",
                args.cloudfront_default_certificate,
            ),
            ("acmCertificateArn", args.acm_certificate_arn),
            ("sslSupportMethod", args.ssl_support_method),
        ])
    }
}

impl From<DistributionArgs> for Args {
    fn from(args: DistributionArgs) -> Self {
        Args::new()
            .with("enabled", args.enabled)
            .with("origins", args.origins)
            .with("defaultCacheBehavior", args.default_cache_behavior)
            .with("priceClass", args.price_class)
            .with("customErrorResponses", args.custom_error_responses)
            .with("restrictions", args.restrictions)
            .with("aliases", args.aliases)
            .with("viewerCertificate", args.viewer_certificate)
    }
}

resource_handle!(
    /// A CloudFront CDN distribution
    Distribution,
    "aws:cloudfront/distribution:Distribution",
    DistributionArgs
);

impl Distribution {
    /// `d<id>.cloudfront.net`
    pub fn domain_name(&self) -> Output<String> {
        self.resource.string("domainName")
    }

    pub fn hosted_zone_id(&self) -> Output<String> {
        self.resource.string("hostedZoneId")
    }

    pub fn arn(&self) -> Output<String> {
        self.resource.string("arn")
    }
}

fn origin_ids(inputs: &PropertyMap) -> Vec<&str> {
    inputs
        .get("origins")
        .and_then(Value::as_array)
        .map(|origins| {
            origins
                .iter()
                .filter_map(|o| o.get("originId").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn create_distribution(request: &CreateRequest) -> Result<PropertyMap> {
    let origins = origin_ids(&request.inputs);
    let target = request
        .inputs
        .get("defaultCacheBehavior")
        .and_then(|b| b.get("targetOriginId"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !origins.contains(&target) {
        return Err(AwsError::UnknownOrigin(target.to_string()));
    }

    if let Some(arn) = request
        .inputs
        .get("viewerCertificate")
        .and_then(|c| c.get("acmCertificateArn"))
        .and_then(Value::as_str)
    {
        let region = arn_region(arn).unwrap_or_default();
        if region != "us-east-1" {
            return Err(AwsError::CertificateRegion {
                arn: arn.to_string(),
                region: region.to_string(),
            });
        }
    }

    let seed = request.urn.as_str();
    let id = format!("E{}", stable_id(seed, 13).to_uppercase());
    let domain = format!("d{}.cloudfront.net", stable_id(&format!("domain:{}", seed), 13));

    let mut outputs = request.inputs.clone();
    outputs.insert("id".to_string(), Value::from(id.as_str()));
    outputs.insert(
        "arn".to_string(),
        Value::from(format!(
            "arn:aws:cloudfront::{}:distribution/{}",
            ACCOUNT_ID, id
        )),
    );
    outputs.insert("domainName".to_string(), Value::from(domain));
    outputs.insert("hostedZoneId".to_string(), Value::from(HOSTED_ZONE_ID));
    outputs.insert("status".to_string(), Value::from("Deployed"));
    Ok(outputs)
}
