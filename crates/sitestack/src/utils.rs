use colored::Colorize;
use serde_json::Value;
use sitestack_config::{LOCAL_STACK_FILE, LoadedStack, PROJECT_DIR, STACK_FILE, StackConfig};
use sitestack_engine::{
    ActionType, ApplyResult, LocalEngine, OutputError, Plan, Session, StateManager, display_value,
};
use sitestack_programs::Program;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a command needs to know about the selected stack
pub struct StackContext {
    pub root: PathBuf,
    pub project: String,
    pub stack: String,
    pub program: &'static Program,
    pub config: StackConfig,
}

impl StackContext {
    pub fn state_manager(&self) -> StateManager {
        StateManager::new(&self.root, &self.stack)
    }

    pub fn engine(&self) -> LocalEngine {
        sitestack_programs::local_engine(self.config.clone(), &self.root)
    }

    /// Runs the program into a fresh session
    pub fn declare(&self) -> anyhow::Result<Session> {
        let session = Session::new(&self.project, &self.stack, Arc::new(self.engine()));
        self.program.run(&session, &self.config)?;
        Ok(session)
    }
}

/// Finds the project, picks the stack and resolves its config.
///
/// The stack is the requested one, else the only stack in the file, else
/// `dev`. `overrides` are `key=value` pairs applied last.
pub fn load_stack(requested: Option<String>, overrides: &[String]) -> anyhow::Result<StackContext> {
    let root = sitestack_config::find_project_root()?;
    let overrides = sitestack_config::parse_overrides(overrides)?;
    let LoadedStack {
        project,
        stack,
        config,
    } = sitestack_config::load_stack_config(&root, requested.as_deref(), &overrides)?;

    let program_name = project.program_for(&stack)?;
    let program = sitestack_programs::find(program_name).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown program '{}'\nhint: `sitestack programs` lists the available ones",
            program_name
        )
    })?;

    tracing::debug!(stack = %stack, program = program.name, "Stack selected");
    Ok(StackContext {
        root,
        project: project.name,
        stack,
        program,
        config,
    })
}

/// Prints which stack files were read
pub fn print_loaded_config_files(project_root: &Path) {
    println!("Config files:");

    for dir in [project_root.to_path_buf(), project_root.join(PROJECT_DIR)] {
        let stack_kdl = dir.join(STACK_FILE);
        if stack_kdl.is_file() {
            println!("  • {}", stack_kdl.display().to_string().cyan());
        }
        let local_kdl = dir.join(LOCAL_STACK_FILE);
        if local_kdl.is_file() {
            println!(
                "  • {} (local override)",
                local_kdl.display().to_string().cyan()
            );
        }
    }
}

pub fn print_header(ctx: &StackContext) {
    print_loaded_config_files(&ctx.root);
    println!("Stack: {}", ctx.stack.cyan());
    println!("Program: {} ({})", ctx.program.name.cyan(), ctx.program.cloud);
}

pub fn print_plan(plan: &Plan) {
    println!();
    println!("{}", "Resources:".bold());
    for action in &plan.actions {
        let line = format!(
            "  {} {} ({})",
            action.action_type.symbol(),
            action.name,
            action.token
        );
        let line = match action.action_type {
            ActionType::Create => line.green(),
            ActionType::Update => line.yellow(),
            ActionType::Delete => line.red(),
            ActionType::NoOp => line.dimmed(),
        };
        println!("{}", line);
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

pub fn print_outputs(outputs: &BTreeMap<String, Value>, errors: &BTreeMap<String, OutputError>) {
    if outputs.is_empty() && errors.is_empty() {
        return;
    }
    println!();
    println!("{}", "Outputs:".bold());
    let width = outputs
        .keys()
        .chain(errors.keys())
        .map(String::len)
        .max()
        .unwrap_or(0);
    for (name, value) in outputs {
        println!("  {:width$}  {}", name, display_value(value).cyan(), width = width);
    }
    for (name, error) in errors {
        let shown = match error {
            OutputError::Unknown => error.to_string().dimmed(),
            other => other.to_string().red(),
        };
        println!("  {:width$}  {}", name, shown, width = width);
    }
}

pub fn print_failures(result: &ApplyResult) {
    for failure in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.urn,
            failure.error.as_deref().unwrap_or("failed")
        );
    }
    for skipped in &result.skipped {
        println!(
            "  {} {}: {}",
            "-".yellow(),
            skipped.urn,
            skipped.error.as_deref().unwrap_or("skipped")
        );
    }
}
