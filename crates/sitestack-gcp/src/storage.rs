//! Cloud Storage buckets and bucket IAM bindings

use crate::error::{GcpError, Result};
use serde_json::Value;
use sitestack_engine::{Args, CreateRequest, Input, Output, PropertyMap, resource_handle};

const MULTI_REGIONS: &[&str] = &["US", "EU", "ASIA"];

/// Principals allowed in a binding besides the `kind:` prefixed ones
const SPECIAL_MEMBERS: &[&str] = &["allUsers", "allAuthenticatedUsers"];

const MEMBER_KINDS: &[&str] = &["user", "serviceAccount", "group", "domain", "projectViewer"];

#[derive(Clone, Debug, Default)]
pub struct BucketArgs {
    pub name: Input,
    /// Multi-region ("US") or region ("us-central1")
    pub location: Input,
    pub website: Option<BucketWebsiteArgs>,
    pub force_destroy: Input,
}

#[derive(Clone, Debug, Default)]
pub struct BucketWebsiteArgs {
    pub main_page_suffix: Input,
    pub not_found_page: Input,
}

impl From<BucketWebsiteArgs> for Input {
    fn from(args: BucketWebsiteArgs) -> Self {
        Input::object([
            ("mainPageSuffix", args.main_page_suffix),
            ("notFoundPage", args.not_found_page),
        ])
    }
}

impl From<BucketArgs> for Args {
    fn from(args: BucketArgs) -> Self {
        Args::new()
            .with("name", args.name)
            .with("location", args.location)
            .with("website", args.website)
            .with("forceDestroy", args.force_destroy)
    }
}

resource_handle!(
    /// A Cloud Storage bucket
    Bucket,
    "gcp:storage/bucket:Bucket",
    BucketArgs
);

impl Bucket {
    pub fn name(&self) -> Output<String> {
        self.resource.string("name")
    }

    /// `gs://<name>`
    pub fn url(&self) -> Output<String> {
        self.resource.string("url")
    }

    pub fn self_link(&self) -> Output<String> {
        self.resource.string("selfLink")
    }
}

#[derive(Clone, Debug, Default)]
pub struct BucketIamBindingArgs {
    pub bucket: Input,
    pub role: Input,
    pub members: Input,
}

impl From<BucketIamBindingArgs> for Args {
    fn from(args: BucketIamBindingArgs) -> Self {
        Args::new()
            .with("bucket", args.bucket)
            .with("role", args.role)
            .with("members", args.members)
    }
}

resource_handle!(
    /// Grants one role on a bucket to a set of members
    BucketIamBinding,
    "gcp:storage/bucketIAMBinding:BucketIAMBinding",
    BucketIamBindingArgs
);

impl BucketIamBinding {
    pub fn etag(&self) -> Output<String> {
        self.resource.string("etag")
    }
}

fn valid_bucket_name(name: &str) -> bool {
    (3..=63).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.' || c == '_')
        && name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric())
}

fn valid_location(location: &str) -> bool {
    MULTI_REGIONS.contains(&location)
        || (location.contains('-')
            && location
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
}

fn valid_member(member: &str) -> bool {
    if SPECIAL_MEMBERS.contains(&member) {
        return true;
    }
    match member.split_once(':') {
        Some((kind, principal)) => MEMBER_KINDS.contains(&kind) && !principal.is_empty(),
        None => false,
    }
}

pub(crate) fn create_bucket(request: &CreateRequest, project: &str) -> Result<PropertyMap> {
    let name = request.physical_name("name");
    if !valid_bucket_name(&name) {
        return Err(GcpError::InvalidBucketName(name));
    }
    let location = request.input_str("location").unwrap_or("US");
    if !valid_location(location) {
        return Err(GcpError::InvalidLocation(location.to_string()));
    }

    let mut outputs = request.inputs.clone();
    outputs.insert("id".to_string(), Value::from(name.as_str()));
    outputs.insert("location".to_string(), Value::from(location.to_uppercase()));
    outputs.insert("project".to_string(), Value::from(project));
    outputs.insert("url".to_string(), Value::from(format!("gs://{}", name)));
    outputs.insert(
        "selfLink".to_string(),
        Value::from(format!("https://www.googleapis.com/storage/v1/b/{}", name)),
    );
    outputs.insert("name".to_string(), Value::from(name));
    Ok(outputs)
}

pub(crate) fn create_binding(request: &CreateRequest) -> Result<PropertyMap> {
    let bucket = request.require_str("bucket")?;
    let role = request.require_str("role")?;
    if !role.starts_with("roles/") || role.len() <= "roles/".len() {
        return Err(GcpError::InvalidRole(role.to_string()));
    }
    let members: Vec<&str> = request
        .inputs
        .get("members")
        .and_then(Value::as_array)
        .map(|members| members.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if members.is_empty() {
        return Err(GcpError::InvalidMember("no members".to_string()));
    }
    if let Some(bad) = members.iter().find(|m| !valid_member(m)) {
        return Err(GcpError::InvalidMember(bad.to_string()));
    }

    let mut outputs = request.inputs.clone();
    outputs.insert(
        "id".to_string(),
        Value::from(format!("b/{}/{}", bucket, role)),
    );
    outputs.insert(
        "etag".to_string(),
        Value::from(sitestack_engine::stable_id(request.urn.as_str(), 12)),
    );
    Ok(outputs)
}
