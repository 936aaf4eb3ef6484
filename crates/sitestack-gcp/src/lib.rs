//! GCP resources for sitestack
//!
//! - **Cloud Storage**: [`storage::Bucket`] with website settings and
//!   [`storage::BucketIamBinding`]
//! - **Load balancing**: [`compute::BackendBucket`], [`compute::GlobalAddress`],
//!   [`compute::UrlMap`], [`compute::TargetHttpProxy`] and
//!   [`compute::GlobalForwardingRule`]
//! - [`GcpProvider`]: the simulated `gcp` package

pub mod compute;
pub mod error;
pub mod provider;
pub mod storage;

pub use error::{GcpError, Result};
pub use provider::{DEFAULT_PROJECT, GcpProvider, PACKAGE, Provider, ProviderArgs};
