//! sitestack resource engine
//!
//! Programs declare resources against a [`Session`]. Declarations return
//! immediately with handles whose attributes are deferred [`Output`]s; the
//! [`deploy`] driver later resolves the graph through an [`Engine`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              program (per cloud)             │
//! │   session.register(..) / output.apply(..)    │
//! └─────────────────┬────────────────────────────┘
//!                   │ ResourceGraph
//! ┌─────────────────▼────────────────────────────┐
//! │              sitestack-engine                │
//! │  ┌──────────────┐  ┌──────────────┐          │
//! │  │ deploy       │  │ state        │          │
//! │  │ preview/apply│  │ stacks/*.json│          │
//! │  └──────┬───────┘  └──────────────┘          │
//! │  ┌──────▼──────────────────────────────┐     │
//! │  │ trait Engine / LocalEngine          │     │
//! │  └──────┬──────────────────────────────┘     │
//! └─────────┼────────────────────────────────────┘
//!           │ trait ResourceProvider
//! ┌─────────▼──────┐ ┌───────────────┐ ┌─────────┐
//! │ aws            │ │ azure-native  │ │ gcp     │
//! └────────────────┘ └───────────────┘ └─────────┘
//! ```

pub mod action;
pub mod deploy;
pub mod engine;
pub mod error;
pub mod handle;
pub mod input;
pub mod output;
pub mod provider;
pub mod resource;
pub mod session;
pub mod state;
pub mod synced;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use deploy::{Deployment, Preview, apply, destroy, display_value, preview};
pub use engine::{Engine, LocalEngine, PROVIDERS_PACKAGE, settings_from_outputs};
pub use error::{EngineError, OutputError, OutputResult, Result};
pub use input::{ASSET_KEY, Args, Asset, Input, PropertyMap, input_str};
pub use output::Output;
pub use provider::{
    CreateRequest, InvokeRequest, ResourceProvider, name_suffix, physical_name, require_args,
    stable_id,
};
pub use resource::{Resource, ResourceOptions, Urn, package_of};
pub use session::{Registration, ResourceGraph, Session, literal};
pub use state::{ResourceState, ResourceStatus, StackState, StateLock, StateManager};
pub use synced::{
    AZURE_BLOB_FOLDER, AzureBlobFolder, AzureBlobFolderArgs, GOOGLE_CLOUD_FOLDER,
    GoogleCloudFolder, GoogleCloudFolderArgs, S3_BUCKET_FOLDER, S3BucketFolder,
    S3BucketFolderArgs, SyncedFolderProvider,
};
