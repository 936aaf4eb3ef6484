//! Project root discovery and loading

use crate::config::StackConfig;
use crate::error::{ConfigError, Result};
use crate::parser::{Project, parse_project_str};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const STACK_FILE: &str = "stack.kdl";
pub const LOCAL_STACK_FILE: &str = "stack.local.kdl";
pub const PROJECT_DIR: &str = ".sitestack";
const GLOBAL_CONFIG_FILE: &str = "config.kdl";

/// Finds the project root.
///
/// 1. `SITESTACK_PROJECT_ROOT`
/// 2. Walking up from the current directory, the first directory holding
///    `stack.kdl` or `.sitestack/stack.kdl`
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("SITESTACK_PROJECT_ROOT") {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking SITESTACK_PROJECT_ROOT");
        if stack_file_in(&path).is_some() {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
    }

    let start_dir = std::env::current_dir()?;
    find_project_root_from(&start_dir)
}

pub fn find_project_root_from(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        if stack_file_in(&current).is_some() {
            info!(project_root = %current.display(), "Found project root");
            return Ok(current);
        }
        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(ConfigError::ProjectRootNotFound(start_dir.to_path_buf()))
}

fn stack_file_in(dir: &Path) -> Option<PathBuf> {
    [dir.join(STACK_FILE), dir.join(PROJECT_DIR).join(STACK_FILE)]
        .into_iter()
        .find(|p| p.is_file())
}

/// Global defaults file (`~/.config/sitestack/config.kdl`)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sitestack").join(GLOBAL_CONFIG_FILE))
}

/// Loads the project at `root`.
///
/// Read order (later wins): global config.kdl -> stack.kdl -> stack.local.kdl
#[tracing::instrument(skip(root), fields(root = %root.display()))]
pub fn load_project(root: &Path) -> Result<Project> {
    let stack_file =
        stack_file_in(root).ok_or_else(|| ConfigError::ProjectRootNotFound(root.to_path_buf()))?;

    let mut project = Project::default();
    if let Some(global) = global_config_path().filter(|p| p.is_file()) {
        debug!(path = %global.display(), "Loading global config");
        project.merge(read_project_file(&global)?);
    }

    project.merge(read_project_file(&stack_file)?);

    let local = stack_file.with_file_name(LOCAL_STACK_FILE);
    if local.is_file() {
        debug!(path = %local.display(), "Applying local override");
        project.merge(read_project_file(&local)?);
    }

    if project.name.is_empty() {
        project.name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
    }

    info!(
        project = %project.name,
        stacks = project.stacks.len(),
        "Project loaded"
    );
    Ok(project)
}

/// A stack picked from a loaded project, with its effective config
#[derive(Debug, Clone)]
pub struct LoadedStack {
    pub project: Project,
    pub stack: String,
    pub config: StackConfig,
}

/// Loads the project, selects a stack (see [`Project::select_stack`]) and
/// resolves its effective config, applying command line overrides last.
pub fn load_stack_config(
    root: &Path,
    requested: Option<&str>,
    overrides: &StackConfig,
) -> Result<LoadedStack> {
    let project = load_project(root)?;
    let stack = project.select_stack(requested)?;
    let mut config = project.stack_config(&stack);
    config.merge(overrides);
    debug!(stack = %stack, overrides = overrides.len(), "Stack config resolved");
    Ok(LoadedStack {
        project,
        stack,
        config,
    })
}

fn read_project_file(path: &Path) -> Result<Project> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_project_str(&content)
}
