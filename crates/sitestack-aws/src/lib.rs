//! AWS resources for sitestack
//!
//! Typed declarations for the AWS resources the static website program
//! uses, plus [`AwsProvider`], the simulated `aws` package run by the local
//! engine.
//!
//! # Resources
//!
//! - **S3**: [`s3::Bucket`] with website hosting
//! - **ACM**: [`acm::Certificate`] with DNS validation
//! - **Route 53**: [`route53::Record`] and the [`route53::get_zone`] lookup
//! - **CloudFront**: [`cloudfront::Distribution`]
//! - [`Provider`]: explicit provider instance pinned to a region
//!
//! # Example
//!
//! ```ignore
//! use sitestack_aws::s3::{Bucket, BucketArgs, BucketWebsiteArgs};
//!
//! let bucket = Bucket::new(
//!     &ctx,
//!     "bucket",
//!     BucketArgs {
//!         acl: "public-read".into(),
//!         website: Some(BucketWebsiteArgs {
//!             index_document: "index.html".into(),
//!             error_document: "error.html".into(),
//!         }),
//!         ..Default::default()
//!     },
//!     ResourceOptions::new(),
//! )?;
//! ctx.export("originURL", bucket.website_endpoint().wrap("http://", ""));
//! ```

pub mod acm;
pub mod cloudfront;
pub mod error;
pub mod provider;
pub mod route53;
pub mod s3;

pub use error::{AwsError, Result};
pub use provider::{AwsProvider, DEFAULT_REGION, PACKAGE, Provider, ProviderArgs};
