//! Folder sync components
//!
//! `synced-folder:index:*` resources upload every file under a local
//! directory into a bucket or blob container. The local engine enumerates
//! the files and reports what would be uploaded.

use crate::error::{EngineError, Result};
use crate::input::{Args, Input, PropertyMap};
use crate::provider::{CreateRequest, ResourceProvider, require_args};
use crate::session::Registration;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const SYNCED_FOLDER_PACKAGE: &str = "synced-folder";

pub const S3_BUCKET_FOLDER: &str = "synced-folder:index:S3BucketFolder";
pub const AZURE_BLOB_FOLDER: &str = "synced-folder:index:AzureBlobFolder";
pub const GOOGLE_CLOUD_FOLDER: &str = "synced-folder:index:GoogleCloudFolder";

#[derive(Clone, Debug, Default)]
pub struct S3BucketFolderArgs {
    pub path: Input,
    pub bucket_name: Input,
    pub acl: Input,
}

impl From<S3BucketFolderArgs> for Args {
    fn from(args: S3BucketFolderArgs) -> Self {
        Args::new()
            .with("path", args.path)
            .with("bucketName", args.bucket_name)
            .with("acl", args.acl)
    }
}

#[derive(Clone, Debug, Default)]
pub struct AzureBlobFolderArgs {
    pub path: Input,
    pub resource_group_name: Input,
    pub storage_account_name: Input,
    pub container_name: Input,
}

impl From<AzureBlobFolderArgs> for Args {
    fn from(args: AzureBlobFolderArgs) -> Self {
        Args::new()
            .with("path", args.path)
            .with("resourceGroupName", args.resource_group_name)
            .with("storageAccountName", args.storage_account_name)
            .with("containerName", args.container_name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GoogleCloudFolderArgs {
    pub path: Input,
    pub bucket_name: Input,
}

impl From<GoogleCloudFolderArgs> for Args {
    fn from(args: GoogleCloudFolderArgs) -> Self {
        Args::new()
            .with("path", args.path)
            .with("bucketName", args.bucket_name)
    }
}

crate::resource_handle!(
    /// Uploads a local folder into an S3 bucket
    S3BucketFolder,
    "synced-folder:index:S3BucketFolder",
    S3BucketFolderArgs
);

crate::resource_handle!(
    /// Uploads a local folder into an Azure blob container
    AzureBlobFolder,
    "synced-folder:index:AzureBlobFolder",
    AzureBlobFolderArgs
);

crate::resource_handle!(
    /// Uploads a local folder into a Cloud Storage bucket
    GoogleCloudFolder,
    "synced-folder:index:GoogleCloudFolder",
    GoogleCloudFolderArgs
);

/// Resolves folder paths relative to the project root
pub struct SyncedFolderProvider {
    base_dir: PathBuf,
}

impl SyncedFolderProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Destination argument each component writes into
fn destination_key(token: &str) -> Option<&'static str> {
    match token {
        S3_BUCKET_FOLDER => Some("bucketName"),
        AZURE_BLOB_FOLDER => Some("containerName"),
        GOOGLE_CLOUD_FOLDER => Some("bucketName"),
        _ => None,
    }
}

/// Files under `dir`, relative and sorted. Glob metacharacters in `dir`
/// match literally.
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = glob::glob(&pattern).map_err(|e| {
        EngineError::ProviderError(format!("invalid folder pattern {}: {}", pattern, e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EngineError::ProviderError(e.to_string()))?;
        if !path.is_file() {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(dir) {
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    files.sort();
    Ok(files)
}

#[async_trait]
impl ResourceProvider for SyncedFolderProvider {
    fn name(&self) -> &str {
        SYNCED_FOLDER_PACKAGE
    }

    fn display_name(&self) -> &str {
        "Synced folder"
    }

    fn supports(&self, token: &str) -> bool {
        destination_key(token).is_some()
    }

    fn check(&self, registration: &Registration) -> Result<()> {
        let Some(destination) = destination_key(&registration.token) else {
            return Err(EngineError::UnsupportedResource {
                provider: self.name().to_string(),
                token: registration.token.clone(),
            });
        };
        require_args(registration, &["path", destination])
    }

    async fn create(&self, request: &CreateRequest) -> Result<PropertyMap> {
        let path = request.require_str("path")?;
        let dir = self.resolve_path(path);
        if !dir.is_dir() {
            return Err(EngineError::InvalidArgument {
                token: request.token.clone(),
                argument: "path".to_string(),
                reason: format!("{} is not a directory", dir.display()),
            });
        }

        let files = list_files(&dir)?;
        tracing::debug!(folder = %dir.display(), files = files.len(), "Syncing folder");

        let mut outputs = request.inputs.clone();
        outputs.insert("fileCount".to_string(), Value::from(files.len()));
        outputs.insert(
            "files".to_string(),
            Value::Array(files.into_iter().map(Value::from).collect()),
        );
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Urn;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn request(path: &str) -> CreateRequest {
        let mut inputs = PropertyMap::new();
        inputs.insert("path".to_string(), Value::from(path));
        inputs.insert("bucketName".to_string(), Value::from("site-1234567"));
        CreateRequest {
            urn: Urn::new("dev", "site", S3_BUCKET_FOLDER, "bucket-folder"),
            token: S3_BUCKET_FOLDER.to_string(),
            name: "bucket-folder".to_string(),
            inputs,
            config: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_lists_nested_files() {
        let temp = tempdir().unwrap();
        let www = temp.path().join("www");
        std::fs::create_dir_all(www.join("css")).unwrap();
        std::fs::write(www.join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(www.join("css/site.css"), "body {}").unwrap();

        let provider = SyncedFolderProvider::new(temp.path());
        let outputs = provider.create(&request("./www")).await.unwrap();
        assert_eq!(outputs["fileCount"], 2);
        assert_eq!(
            outputs["files"],
            serde_json::json!(["css/site.css", "index.html"])
        );
        assert_eq!(outputs["bucketName"], "site-1234567");
    }

    #[tokio::test]
    async fn test_bracketed_folder_name_is_literal() {
        let temp = tempdir().unwrap();
        let literal = temp.path().join("site[1]");
        std::fs::create_dir_all(&literal).unwrap();
        std::fs::write(literal.join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(literal.join("error.html"), "<h1>404</h1>").unwrap();
        // Would match `site[1]/**/*` if the brackets were a character class
        std::fs::create_dir_all(temp.path().join("site1")).unwrap();
        std::fs::write(temp.path().join("site1/other.html"), "x").unwrap();

        let files = list_files(&literal).unwrap();
        assert_eq!(files, vec!["error.html", "index.html"]);

        let provider = SyncedFolderProvider::new(temp.path());
        let outputs = provider.create(&request("./site[1]")).await.unwrap();
        assert_eq!(outputs["fileCount"], 2);
    }

    #[tokio::test]
    async fn test_missing_folder_fails() {
        let temp = tempdir().unwrap();
        let provider = SyncedFolderProvider::new(temp.path());
        let err = provider.create(&request("./nope")).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { ref argument, .. } if argument == "path"
        ));
    }

    #[test]
    fn test_handle_tokens_match_constants() {
        assert_eq!(S3BucketFolder::TOKEN, S3_BUCKET_FOLDER);
        assert_eq!(AzureBlobFolder::TOKEN, AZURE_BLOB_FOLDER);
        assert_eq!(GoogleCloudFolder::TOKEN, GOOGLE_CLOUD_FOLDER);
    }

    #[test]
    fn test_check_requires_destination() {
        let provider = SyncedFolderProvider::new(".");
        let registration = Registration {
            urn: Urn::new("dev", "site", GOOGLE_CLOUD_FOLDER, "folder"),
            token: GOOGLE_CLOUD_FOLDER.to_string(),
            args: GoogleCloudFolderArgs {
                path: "./site".into(),
                ..Default::default()
            }
            .into(),
            options: Default::default(),
        };
        assert!(matches!(
            provider.check(&registration),
            Err(EngineError::InvalidArgument { ref argument, .. }) if argument == "bucketName"
        ));
    }

    #[test]
    fn test_supported_tokens() {
        let provider = SyncedFolderProvider::new(".");
        assert!(provider.supports(AZURE_BLOB_FOLDER));
        assert!(provider.supports(GOOGLE_CLOUD_FOLDER));
        assert!(!provider.supports("synced-folder:index:Other"));
    }
}
