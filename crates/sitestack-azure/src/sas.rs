//! Service shared access signatures
//!
//! Signs blob service SAS tokens with the storage account's Shared Key
//! (service version 2018-11-09). A token grants the listed permissions on
//! one container or blob for a bounded time window.

use crate::error::SasError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const SAS_VERSION: &str = "2018-11-09";

const PERMISSION_ORDER: &str = "racwdl";

type HmacSha256 = Hmac<Sha256>;

/// Parameters of a blob service SAS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSas {
    /// `/blob/<account>/<container>[/<blob>]`
    pub canonicalized_resource: String,
    /// "c" (container) or "b" (blob)
    pub resource: String,
    pub permissions: String,
    pub protocols: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub expiry: DateTime<Utc>,
    pub identifier: Option<String>,
    pub ip_range: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
}

impl ServiceSas {
    /// Read-only access to a whole container over https
    pub fn read_container(
        account: &str,
        container: &str,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            canonicalized_resource: format!("/blob/{}/{}", account, container),
            resource: "c".to_string(),
            permissions: "r".to_string(),
            protocols: Some("https".to_string()),
            start: Some(start),
            expiry,
            identifier: None,
            ip_range: None,
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            content_language: None,
            content_type: None,
        }
    }

    pub fn validate(&self) -> Result<(), SasError> {
        if self.resource != "c" && self.resource != "b" {
            return Err(SasError::Unsupported {
                field: "resource",
                value: self.resource.clone(),
            });
        }
        if self.permissions.is_empty()
            || !self.permissions.chars().all(|c| PERMISSION_ORDER.contains(c))
        {
            return Err(SasError::Unsupported {
                field: "permissions",
                value: self.permissions.clone(),
            });
        }
        if let Some(protocols) = &self.protocols {
            if protocols != "https" && protocols != "https,http" {
                return Err(SasError::Unsupported {
                    field: "protocols",
                    value: protocols.clone(),
                });
            }
        }
        if let Some(start) = self.start {
            if self.expiry <= start {
                return Err(SasError::InvalidWindow {
                    start: format_timestamp(&start),
                    expiry: format_timestamp(&self.expiry),
                });
            }
        }
        Ok(())
    }

    /// Newline-joined fields the signature covers
    pub fn string_to_sign(&self) -> String {
        let start = self.start.as_ref().map(format_timestamp).unwrap_or_default();
        let expiry = format_timestamp(&self.expiry);
        [
            self.permissions.as_str(),
            start.as_str(),
            expiry.as_str(),
            self.canonicalized_resource.as_str(),
            opt(&self.identifier),
            opt(&self.ip_range),
            opt(&self.protocols),
            SAS_VERSION,
            self.resource.as_str(),
            "", // snapshot time
            opt(&self.cache_control),
            opt(&self.content_disposition),
            opt(&self.content_encoding),
            opt(&self.content_language),
            opt(&self.content_type),
        ]
        .join("\n")
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// Signs SAS tokens with a storage account key
pub struct SharedKeySigner {
    key: Vec<u8>,
}

impl SharedKeySigner {
    /// `account_key` is the base64 key as shown by the portal
    pub fn new(account_key: &str) -> Result<Self, SasError> {
        let key = STANDARD
            .decode(account_key.trim())
            .map_err(|e| SasError::InvalidAccountKey(e.to_string()))?;
        if key.is_empty() {
            return Err(SasError::InvalidAccountKey("empty key".to_string()));
        }
        Ok(Self { key })
    }

    pub fn signature(&self, sas: &ServiceSas) -> Result<String, SasError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| SasError::InvalidAccountKey(e.to_string()))?;
        mac.update(sas.string_to_sign().as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Query string token, without the leading `?`
    pub fn sign(&self, sas: &ServiceSas) -> Result<String, SasError> {
        sas.validate()?;
        let signature = self.signature(sas)?;

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("sv", SAS_VERSION);
        if let Some(start) = &sas.start {
            query.append_pair("st", &format_timestamp(start));
        }
        query.append_pair("se", &format_timestamp(&sas.expiry));
        query.append_pair("sr", &sas.resource);
        query.append_pair("sp", &sas.permissions);
        let optional = [
            ("sip", &sas.ip_range),
            ("si", &sas.identifier),
            ("spr", &sas.protocols),
            ("rscc", &sas.cache_control),
            ("rscd", &sas.content_disposition),
            ("rsce", &sas.content_encoding),
            ("rscl", &sas.content_language),
            ("rsct", &sas.content_type),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                query.append_pair(key, value);
            }
        }
        query.append_pair("sig", &signature);
        Ok(query.finish())
    }
}

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SasError> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| SasError::InvalidTimestamp(raw.to_string()))
}

/// Validity window starting at `now`
pub fn validity_window(
    now: DateTime<Utc>,
    days: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SasError> {
    Duration::try_days(i64::from(days))
        .and_then(|span| now.checked_add_signed(span))
        .map(|expiry| (now, expiry))
        .ok_or(SasError::ExpiryOutOfRange(days))
}

/// `https://<account>.blob.core.windows.net/<container>/<blob>`
pub fn blob_url(account: &str, container: &str, blob: &str) -> String {
    format!(
        "https://{}.blob.core.windows.net/{}/{}",
        account, container, blob
    )
}

/// Blob URL carrying a SAS token; a public blob needs no token
pub fn signed_blob_url(account: &str, container: &str, blob: &str, token: &str) -> String {
    let url = blob_url(account, container, blob);
    if token.is_empty() {
        url
    } else {
        format!("{}?{}", url, token)
    }
}

/// Account key the simulated provider reports for `account`
pub fn simulated_account_key(account: &str) -> String {
    let mut key = Sha256::digest(format!("sitestack:key1:{}", account).as_bytes()).to_vec();
    key.extend_from_slice(&Sha256::digest(format!("sitestack:key2:{}", account).as_bytes()));
    STANDARD.encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const KEY: &str = "c2VjcmV0LWtleS1mb3ItdGVzdHM=";

    fn sas() -> ServiceSas {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let expiry = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        ServiceSas {
            cache_control: Some("max-age=5".to_string()),
            content_disposition: Some("inline".to_string()),
            content_encoding: Some("deflate".to_string()),
            content_type: Some("application/json".to_string()),
            ..ServiceSas::read_container("acct1", "site", start, expiry)
        }
    }

    #[test]
    fn test_string_to_sign() {
        assert_eq!(
            sas().string_to_sign(),
            "r\n2021-01-01T00:00:00Z\n2030-01-01T00:00:00Z\n/blob/acct1/site\n\n\nhttps\n\
             2018-11-09\nc\n\nmax-age=5\ninline\ndeflate\n\napplication/json"
        );
    }

    #[test]
    fn test_signature_known_answer() {
        let signer = SharedKeySigner::new(KEY).unwrap();
        assert_eq!(
            signer.signature(&sas()).unwrap(),
            "wxnwPhK8Ujjt4eQAJEEbrIdTQEb1PXkt6oSbJP7pTfY="
        );
    }

    #[test]
    fn test_token_query() {
        let signer = SharedKeySigner::new(KEY).unwrap();
        let token = signer.sign(&sas()).unwrap();
        assert_eq!(
            token,
            "sv=2018-11-09&st=2021-01-01T00%3A00%3A00Z&se=2030-01-01T00%3A00%3A00Z\
             &sr=c&sp=r&spr=https&rscc=max-age%3D5&rscd=inline&rsce=deflate\
             &rsct=application%2Fjson&sig=wxnwPhK8Ujjt4eQAJEEbrIdTQEb1PXkt6oSbJP7pTfY%3D"
        );
    }

    #[test]
    fn test_invalid_key() {
        assert!(matches!(
            SharedKeySigner::new("not base64!"),
            Err(SasError::InvalidAccountKey(_))
        ));
        assert!(matches!(
            SharedKeySigner::new(""),
            Err(SasError::InvalidAccountKey(_))
        ));
    }

    #[test]
    fn test_window_must_be_positive() {
        let mut params = sas();
        params.expiry = params.start.unwrap();
        let signer = SharedKeySigner::new(KEY).unwrap();
        assert!(matches!(
            signer.sign(&params),
            Err(SasError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_unsupported_permissions() {
        let mut params = sas();
        params.permissions = "rx".to_string();
        assert!(matches!(
            params.validate(),
            Err(SasError::Unsupported { field: "permissions", .. })
        ));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("2030-01-01").unwrap(),
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-05-06T07:08:09Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
        );
        assert!(parse_timestamp("tomorrow").is_err());
    }

    #[test]
    fn test_validity_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let (start, expiry) = validity_window(now, 365).unwrap();
        assert_eq!(start, now);
        assert_eq!(format_timestamp(&expiry), "2027-03-01T12:00:00Z");
        assert_eq!(
            validity_window(now, u32::MAX),
            Err(SasError::ExpiryOutOfRange(u32::MAX))
        );
    }

    #[test]
    fn test_signed_blob_url() {
        assert_eq!(
            signed_blob_url("acct1", "site", "index.html", "sig=abc"),
            "https://acct1.blob.core.windows.net/site/index.html?sig=abc"
        );
        assert_eq!(
            signed_blob_url("acct1", "site", "index.html", ""),
            "https://acct1.blob.core.windows.net/site/index.html"
        );
    }

    #[test]
    fn test_simulated_key_is_usable() {
        let key = simulated_account_key("acct1");
        assert_eq!(key, simulated_account_key("acct1"));
        assert_ne!(key, simulated_account_key("acct2"));
        assert!(SharedKeySigner::new(&key).is_ok());
    }
}
