//! S3 buckets

use crate::error::{AwsError, Result};
use serde_json::Value;
use sitestack_engine::{Args, CreateRequest, Input, Output, PropertyMap, resource_handle};

const CANNED_ACLS: &[&str] = &[
    "private",
    "public-read",
    "public-read-write",
    "authenticated-read",
];

#[derive(Clone, Debug, Default)]
pub struct BucketArgs {
    /// Explicit bucket name; generated from the resource name when absent
    pub bucket: Input,
    pub acl: Input,
    pub website: Option<BucketWebsiteArgs>,
    pub force_destroy: Input,
}

#[derive(Clone, Debug, Default)]
pub struct BucketWebsiteArgs {
    pub index_document: Input,
    pub error_document: Input,
}

impl From<BucketWebsiteArgs> for Input {
    fn from(args: BucketWebsiteArgs) -> Self {
        Input::object([
            ("indexDocument", args.index_document),
            ("errorDocument", args.error_document),
        ])
    }
}

impl From<BucketArgs> for Args {
    fn from(args: BucketArgs) -> Self {
        Args::new()
            .with("bucket", args.bucket)
            .with("acl", args.acl)
            .with("website", args.website)
            .with("forceDestroy", args.force_destroy)
    }
}

resource_handle!(
    /// An S3 bucket, optionally configured for website hosting
    Bucket,
    "aws:s3/bucket:Bucket",
    BucketArgs
);

impl Bucket {
    pub fn bucket(&self) -> Output<String> {
        self.resource.string("bucket")
    }

    pub fn arn(&self) -> Output<String> {
        self.resource.string("arn")
    }

    /// Website endpoint hostname, without scheme
    pub fn website_endpoint(&self) -> Output<String> {
        self.resource.string("websiteEndpoint")
    }

    pub fn bucket_regional_domain_name(&self) -> Output<String> {
        self.resource.string("bucketRegionalDomainName")
    }
}

pub(crate) fn create_bucket(request: &CreateRequest, region: &str) -> Result<PropertyMap> {
    let bucket = request.physical_name("bucket");
    let acl = request.input_str("acl").unwrap_or("private");
    if !CANNED_ACLS.contains(&acl) {
        return Err(AwsError::InvalidAcl(acl.to_string()));
    }

    let mut outputs = request.inputs.clone();
    outputs.insert("id".to_string(), Value::from(bucket.as_str()));
    outputs.insert("bucket".to_string(), Value::from(bucket.as_str()));
    outputs.insert("acl".to_string(), Value::from(acl));
    outputs.insert("region".to_string(), Value::from(region));
    outputs.insert(
        "arn".to_string(),
        Value::from(format!("arn:aws:s3:::{}", bucket)),
    );
    outputs.insert(
        "bucketRegionalDomainName".to_string(),
        Value::from(format!("{}.s3.{}.amazonaws.com", bucket, region)),
    );
    if request.inputs.get("website").is_some_and(Value::is_object) {
        outputs.insert(
            "websiteEndpoint".to_string(),
            Value::from(format!("{}.s3-website-{}.amazonaws.com", bucket, region)),
        );
        outputs.insert(
            "websiteDomain".to_string(),
            Value::from(format!("s3-website-{}.amazonaws.com", region)),
        );
    }
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
            urn: Urn::new("dev", "site", Bucket::TOKEN, "bucket"),
            token: Bucket::TOKEN.to_string(),
            name: "bucket".to_string(),
            inputs,
            config: BTreeMap::new(),
        }
    }

    #[test]
    fn test_website_bucket() {
        let outputs = create_bucket(
            &request(serde_json::json!({
                "acl": "public-read",
                "website": { "indexDocument": "index.html", "errorDocument": "error.html" }
            })),
            "us-west-2",
        )
        .unwrap();

        let bucket = outputs["bucket"].as_str().unwrap();
        assert!(bucket.starts_with("bucket-"));
        assert_eq!(
            outputs["websiteEndpoint"],
            format!("{}.s3-website-us-west-2.amazonaws.com", bucket)
        );
        assert_eq!(outputs["arn"], format!("arn:aws:s3:::{}", bucket));
    }

    #[test]
    fn test_plain_bucket_has_no_website_endpoint() {
        let outputs =
            create_bucket(&request(serde_json::json!({ "bucket": "logs" })), "us-east-1").unwrap();
        assert_eq!(outputs["bucket"], "logs");
        assert!(!outputs.contains_key("websiteEndpoint"));
    }

    #[test]
    fn test_invalid_acl() {
        let err = create_bucket(&request(serde_json::json!({ "acl": "everyone" })), "us-east-1")
            .unwrap_err();
        assert!(matches!(err, AwsError::InvalidAcl(ref acl) if acl == "everyone"));
    }
}
