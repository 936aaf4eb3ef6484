//! sitestack programs
//!
//! Each program declares one cloud topology against a [`Session`]:
//!
//! | program | topology |
//! |---|---|
//! | `static-website-aws` | S3 website bucket, ACM certificate, CloudFront, Route 53 |
//! | `static-website-azure` | Storage static website, CDN endpoint, DNS CNAME, custom domain |
//! | `static-website-gcp` | Cloud Storage bucket behind a global HTTP load balancer |
//! | `serverless-azure` | Static website plus a function app run from a SAS-signed package |
//! | `serverless-azure-public` | As above, with a public code container and no SAS |
//!
//! A program only describes resources; [`sitestack_engine::apply`] creates
//! them.

pub mod serverless_azure;
pub mod static_website_aws;
pub mod static_website_azure;
pub mod static_website_gcp;

use sitestack_aws::AwsProvider;
use sitestack_azure::AzureProvider;
use sitestack_config::StackConfig;
use sitestack_engine::{LocalEngine, Session, SyncedFolderProvider};
use sitestack_gcp::GcpProvider;
use std::fmt;
use std::path::Path;

/// Declares a program's resources and exports
pub type DeclareFn = fn(&Session, &StackConfig) -> sitestack_engine::Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cloud {
    Aws,
    Azure,
    Gcp,
}

impl fmt::Display for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cloud::Aws => write!(f, "aws"),
            Cloud::Azure => write!(f, "azure"),
            Cloud::Gcp => write!(f, "gcp"),
        }
    }
}

pub struct Program {
    pub name: &'static str,
    pub description: &'static str,
    pub cloud: Cloud,
    pub declare: DeclareFn,
}

impl Program {
    /// Declares everything into `ctx`. A failing declaration is returned
    /// unchanged.
    pub fn run(&self, ctx: &Session, config: &StackConfig) -> sitestack_engine::Result<()> {
        tracing::info!(program = self.name, stack = ctx.stack(), "Running program");
        (self.declare)(ctx, config)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("name", &self.name)
            .field("cloud", &self.cloud)
            .finish()
    }
}

pub const PROGRAMS: &[Program] = &[
    Program {
        name: "static-website-aws",
        description: "S3 website behind CloudFront with an ACM certificate and a Route 53 alias",
        cloud: Cloud::Aws,
        declare: static_website_aws::run,
    },
    Program {
        name: "static-website-azure",
        description: "Storage static website behind Azure CDN with a custom domain",
        cloud: Cloud::Azure,
        declare: static_website_azure::run,
    },
    Program {
        name: "static-website-gcp",
        description: "Cloud Storage website behind a global HTTP load balancer with Cloud CDN",
        cloud: Cloud::Gcp,
        declare: static_website_gcp::run,
    },
    Program {
        name: "serverless-azure",
        description: "Static website plus a function app loaded from a private, SAS-signed package",
        cloud: Cloud::Azure,
        declare: serverless_azure::run,
    },
    Program {
        name: "serverless-azure-public",
        description: "Static website plus a function app loaded from a public package container",
        cloud: Cloud::Azure,
        declare: serverless_azure::run_public,
    },
];

pub fn find(name: &str) -> Option<&'static Program> {
    PROGRAMS.iter().find(|p| p.name == name)
}

/// Engine with every simulated provider; local paths resolve against
/// `base_dir`
pub fn local_engine(config: StackConfig, base_dir: &Path) -> LocalEngine {
    LocalEngine::new(config)
        .with_provider(AwsProvider::new())
        .with_provider(AzureProvider::new(base_dir))
        .with_provider(GcpProvider::new())
        .with_provider(SyncedFolderProvider::new(base_dir))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_names_are_unique() {
        for program in PROGRAMS {
            assert_eq!(
                PROGRAMS.iter().filter(|p| p.name == program.name).count(),
                1
            );
        }
        assert_eq!(find("serverless-azure").unwrap().cloud, Cloud::Azure);
        assert!(find("static-website-ibm").is_none());
    }

    #[test]
    fn test_local_engine_packages() {
        let engine = local_engine(StackConfig::new(), Path::new("."));
        let packages: Vec<&str> = engine.packages().collect();
        for package in ["aws", "azure-native", "gcp", "synced-folder", "sitestack"] {
            assert!(packages.contains(&package), "missing {}", package);
        }
    }
}
