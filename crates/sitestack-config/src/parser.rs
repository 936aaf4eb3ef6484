//! stack.kdl parser

use crate::config::StackConfig;
use crate::error::{ConfigError, Result};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::collections::BTreeMap;

/// A parsed stack file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    /// Program used by stacks that do not name their own
    pub program: Option<String>,
    /// Config shared by every stack
    pub config: StackConfig,
    pub stacks: BTreeMap<String, StackDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackDefinition {
    pub name: String,
    pub program: Option<String>,
    pub config: StackConfig,
}

impl Project {
    /// Effective config of `stack`: project-level values overlaid with the
    /// stack's own.
    pub fn stack_config(&self, stack: &str) -> StackConfig {
        let mut config = self.config.clone();
        if let Some(definition) = self.stacks.get(stack) {
            config.merge(&definition.config);
        }
        config
    }

    pub fn program_for(&self, stack: &str) -> Result<&str> {
        self.stacks
            .get(stack)
            .and_then(|s| s.program.as_deref())
            .or(self.program.as_deref())
            .ok_or_else(|| ConfigError::ProgramNotSet(stack.to_string()))
    }

    /// Picks the stack to operate on: the explicit name, else the only
    /// declared stack, else `dev`.
    pub fn select_stack(&self, requested: Option<&str>) -> Result<String> {
        if let Some(name) = requested {
            if self.stacks.is_empty() || self.stacks.contains_key(name) {
                return Ok(name.to_string());
            }
            return Err(ConfigError::StackNotFound {
                stack: name.to_string(),
                available: self.stacks.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }
        if self.stacks.len() == 1 {
            if let Some(name) = self.stacks.keys().next() {
                return Ok(name.clone());
            }
        }
        Ok("dev".to_string())
    }

    /// Overlays another parsed file (e.g. stack.local.kdl) onto this one.
    pub fn merge(&mut self, other: Project) {
        if !other.name.is_empty() {
            self.name = other.name;
        }
        if other.program.is_some() {
            self.program = other.program;
        }
        self.config.merge(&other.config);
        for (name, definition) in other.stacks {
            match self.stacks.get_mut(&name) {
                Some(existing) => {
                    if definition.program.is_some() {
                        existing.program = definition.program;
                    }
                    existing.config.merge(&definition.config);
                }
                None => {
                    self.stacks.insert(name, definition);
                }
            }
        }
    }
}

/// Parses stack.kdl content
pub fn parse_project_str(content: &str) -> Result<Project> {
    let doc: KdlDocument = content.parse()?;
    let mut project = Project::default();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                project.name = first_string(node)
                    .ok_or_else(|| {
                        ConfigError::InvalidStackFile("project requires a name".to_string())
                    })?
                    .to_string();
            }
            "program" => {
                project.program = first_string(node).map(str::to_string);
            }
            "config" => {
                project.config.merge(&parse_config_block(node));
            }
            "stack" => {
                let stack = parse_stack(node)?;
                project.stacks.insert(stack.name.clone(), stack);
            }
            other => {
                tracing::debug!(node = other, "Skipping unknown node in stack file");
            }
        }
    }

    Ok(project)
}

fn parse_stack(node: &KdlNode) -> Result<StackDefinition> {
    let name = first_string(node)
        .ok_or_else(|| ConfigError::InvalidStackFile("stack requires a name".to_string()))?
        .to_string();

    let mut stack = StackDefinition {
        name,
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "program" => stack.program = first_string(child).map(str::to_string),
                "config" => stack.config.merge(&parse_config_block(child)),
                _ => {}
            }
        }
    }

    Ok(stack)
}

fn parse_config_block(node: &KdlNode) -> StackConfig {
    let mut config = StackConfig::new();
    if let Some(children) = node.children() {
        for entry in children.nodes() {
            let key = entry.name().value();
            if let Some(value) = entry.entries().first().and_then(|e| value_to_string(e.value())) {
                config.set(key, value);
            }
        }
    }
    config
}

fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}

fn value_to_string(value: &KdlValue) -> Option<String> {
    match value {
        KdlValue::String(s) => Some(s.clone()),
        KdlValue::Integer(i) => Some(i.to_string()),
        KdlValue::Float(f) => Some(f.to_string()),
        KdlValue::Bool(b) => Some(b.to_string()),
        KdlValue::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
project "my-site"
program "static-website-aws"

config {
    indexDocument "home.html"
}

stack "dev" {
    config {
        domain "example.com"
        subdomain "dev"
        "aws:region" "us-west-2"
        sasValidityDays 30
    }
}

stack "prod" {
    program "static-website-azure"
    config {
        subdomain "www"
    }
}
"#;

    #[test]
    fn test_parse_project() {
        let project = parse_project_str(SAMPLE).unwrap();
        assert_eq!(project.name, "my-site");
        assert_eq!(project.program.as_deref(), Some("static-website-aws"));
        assert_eq!(project.stacks.len(), 2);

        let dev = project.stack_config("dev");
        assert_eq!(dev.get("indexDocument"), Some("home.html"));
        assert_eq!(dev.get("aws:region"), Some("us-west-2"));
        assert_eq!(dev.get("sasValidityDays"), Some("30"));
    }

    #[test]
    fn test_program_resolution() {
        let project = parse_project_str(SAMPLE).unwrap();
        assert_eq!(project.program_for("dev").unwrap(), "static-website-aws");
        assert_eq!(project.program_for("prod").unwrap(), "static-website-azure");

        let bare = parse_project_str("project \"x\"").unwrap();
        assert!(matches!(
            bare.program_for("dev"),
            Err(ConfigError::ProgramNotSet(_))
        ));
    }

    #[test]
    fn test_select_stack() {
        let project = parse_project_str(SAMPLE).unwrap();
        assert_eq!(project.select_stack(Some("prod")).unwrap(), "prod");
        assert!(matches!(
            project.select_stack(Some("qa")),
            Err(ConfigError::StackNotFound { .. })
        ));
        // Two stacks and no explicit choice falls back to dev
        assert_eq!(project.select_stack(None).unwrap(), "dev");

        let single = parse_project_str("stack \"staging\"").unwrap();
        assert_eq!(single.select_stack(None).unwrap(), "staging");
    }

    #[test]
    fn test_merge_local_override() {
        let mut project = parse_project_str(SAMPLE).unwrap();
        let local = parse_project_str(
            r#"
stack "dev" {
    config {
        subdomain "me"
    }
}
"#,
        )
        .unwrap();
        project.merge(local);

        let dev = project.stack_config("dev");
        assert_eq!(dev.get("subdomain"), Some("me"));
        assert_eq!(dev.get("domain"), Some("example.com"));
        assert_eq!(project.name, "my-site");
    }

    #[test]
    fn test_invalid_kdl() {
        assert!(matches!(
            parse_project_str("stack {"),
            Err(ConfigError::KdlParse(_))
        ));
    }
}
