//! ACM certificates

use crate::error::{AwsError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitestack_engine::{
    Args, CreateRequest, Input, Output, OutputError, PropertyMap, resource_handle, stable_id,
};

/// Placeholder account used in simulated ARNs
pub(crate) const ACCOUNT_ID: &str = "123456789012";

#[derive(Clone, Debug, Default)]
pub struct CertificateArgs {
    pub domain_name: Input,
    /// "DNS" or "EMAIL"
    pub validation_method: Input,
    pub subject_alternative_names: Input,
}

impl From<CertificateArgs> for Args {
    fn from(args: CertificateArgs) -> Self {
        Args::new()
            .with("domainName", args.domain_name)
            .with("validationMethod", args.validation_method)
            .with("subjectAlternativeNames", args.subject_alternative_names)
    }
}

/// DNS record that proves control of a certificate's domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainValidationOption {
    pub domain_name: String,
    pub resource_record_name: String,
    pub resource_record_type: String,
    pub resource_record_value: String,
}

resource_handle!(
    /// A TLS certificate issued by ACM
    Certificate,
    "aws:acm/certificate:Certificate",
    CertificateArgs
);

impl Certificate {
    pub fn arn(&self) -> Output<String> {
        self.resource.string("arn")
    }

    pub fn domain_validation_options(&self) -> Output<Vec<DomainValidationOption>> {
        self.resource.output("domainValidationOptions").decode()
    }

    /// The validation record of the primary domain
    pub fn first_validation_option(&self) -> Output<DomainValidationOption> {
        let urn = self.urn().to_string();
        self.domain_validation_options().try_apply(move |options| {
            options.into_iter().next().ok_or_else(|| {
                OutputError::derivation(format!("{} has no domain validation options", urn))
            })
        })
    }
}

/// Region encoded in an ARN (`arn:aws:<service>:<region>:...`)
pub fn arn_region(arn: &str) -> Option<&str> {
    arn.split(':').nth(3).filter(|r| !r.is_empty())
}

fn validation_option(domain: &str) -> Value {
    let name_token = stable_id(&format!("name:{}", domain), 32);
    let value_token = stable_id(&format!("value:{}", domain), 32);
    serde_json::json!({
        "domainName": domain,
        "resourceRecordName": format!("_{}.{}.", name_token, domain),
        "resourceRecordType": "CNAME",
        "resourceRecordValue": format!("_{}.acm-validations.aws.", value_token),
    })
}

pub(crate) fn create_certificate(request: &CreateRequest, region: &str) -> Result<PropertyMap> {
    let domain = request.require_str("domainName")?;
    let method = request.input_str("validationMethod").unwrap_or("DNS");
    if method != "DNS" && method != "EMAIL" {
        return Err(AwsError::InvalidValidationMethod(method.to_string()));
    }

    let mut domains = vec![domain.to_string()];
    if let Some(Value::Array(names)) = request.inputs.get("subjectAlternativeNames") {
        domains.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
    }

    let certificate_id = stable_id(request.urn.as_str(), 32);
    let arn = format!(
        "arn:aws:acm:{}:{}:certificate/{}-{}-{}-{}-{}",
        region,
        ACCOUNT_ID,
        &certificate_id[0..8],
        &certificate_id[8..12],
        &certificate_id[12..16],
        &certificate_id[16..20],
        &certificate_id[20..32],
    );

    let mut outputs = request.inputs.clone();
    outputs.insert("id".to_string(), Value::from(arn.as_str()));
    outputs.insert("arn".to_string(), Value::from(arn));
    outputs.insert("status".to_string(), Value::from("PENDING_VALIDATION"));
    outputs.insert("validationMethod".to_string(), Value::from(method));
    let options = if method == "DNS" {
        domains.iter().map(|d| validation_option(d)).collect()
    } else {
        Vec::new()
    };
    outputs.insert("domainValidationOptions".to_string(), Value::Array(options));
    Ok(outputs)
}
