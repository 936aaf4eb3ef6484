//! sitestack configuration
//!
//! Discovers the project's `stack.kdl`, parses stacks and their config, and
//! exposes the typed settings every program reads (with their defaults).

pub mod config;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod settings;

pub use config::{StackConfig, parse_override, parse_overrides};
pub use discovery::{
    LOCAL_STACK_FILE, LoadedStack, PROJECT_DIR, STACK_FILE, find_project_root,
    find_project_root_from, global_config_path, load_project, load_stack_config,
};
pub use error::{ConfigError, Result};
pub use parser::{Project, StackDefinition, parse_project_str};
pub use settings::{DomainSettings, GcpSettings, ServerlessSettings, SiteSettings};
