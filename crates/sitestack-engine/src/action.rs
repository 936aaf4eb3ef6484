//! Planned and applied changes to a stack

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A change to a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// URN of the resource
    pub urn: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Type token (e.g. "aws:s3/bucket:Bucket")
    pub token: String,

    /// Logical name
    pub name: String,

    /// Description of the action
    pub description: String,

    /// Inputs as far as they are known, rendered for display
    pub details: BTreeMap<String, String>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        urn: impl Into<String>,
        token: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let token = token.into();
        let name = name.into();
        let description = format!("{} {} ({})", action_type.verb(), name, token);
        Self {
            urn: urn.into(),
            action_type,
            token,
            name,
            description,
            details: BTreeMap::new(),
        }
    }

    pub fn with_details(mut self, details: BTreeMap<String, String>) -> Self {
        self.details = details;
        self
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource that is no longer declared
    Delete,
    /// No changes needed
    NoOp,
}

impl ActionType {
    fn verb(&self) -> &'static str {
        match self {
            ActionType::Create => "Create",
            ActionType::Update => "Update",
            ActionType::Delete => "Delete",
            ActionType::NoOp => "Keep",
        }
    }

    /// Marker shown in front of a resource in the preview table
    pub fn symbol(&self) -> &'static str {
        match self {
            ActionType::Create => "+",
            ActionType::Update => "~",
            ActionType::Delete => "-",
            ActionType::NoOp => " ",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Resources left alone because something they depend on failed
    pub skipped: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every resource was applied
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn add_success(&mut self, urn: String, message: String) {
        self.succeeded.push(ActionResult {
            urn,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, urn: String, error: String) {
        self.failed.push(ActionResult {
            urn,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }

    pub fn add_skipped(&mut self, urn: String, reason: String) {
        self.skipped.push(ActionResult {
            urn,
            success: false,
            message: String::new(),
            error: Some(reason),
        });
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// URN of the resource the action touched
    pub urn: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Result message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Every action a deployment would take, in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in declaration order, deletions last
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    /// Create a plan from actions
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Create an empty plan
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Actions of the given type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Action for the resource with this logical name
    pub fn find(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Count actions by type
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    /// Resources to create
    pub create: usize,
    /// Resources to update
    pub update: usize,
    /// Resources to delete
    pub delete: usize,
    /// Resources left as they are
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(kind: ActionType, name: &str) -> Action {
        Action::new(kind, format!("urn::{}", name), "aws:s3/bucket:Bucket", name)
    }

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(vec![
            action(ActionType::Create, "bucket"),
            action(ActionType::Create, "cdn"),
            action(ActionType::NoOp, "zone"),
            action(ActionType::Delete, "old"),
        ]);
        assert!(plan.has_changes);
        assert_eq!(
            plan.summary().to_string(),
            "2 to create, 0 to update, 1 to delete, 1 unchanged"
        );
        assert_eq!(plan.find("cdn").unwrap().description, "Create cdn (aws:s3/bucket:Bucket)");
    }

    #[test]
    fn test_noop_plan_has_no_changes() {
        let plan = Plan::new(vec![action(ActionType::NoOp, "bucket")]);
        assert!(!plan.has_changes);
        assert!(!Plan::empty().has_changes);
    }

    #[test]
    fn test_apply_result_success() {
        let mut result = ApplyResult::new();
        result.add_success("a".into(), "created".into());
        assert!(result.is_success());
        result.add_skipped("b".into(), "dependency failed".into());
        assert!(!result.is_success());
        result.add_failure("c".into(), "boom".into());
        assert_eq!(result.failed[0].urn, "c");
        assert_eq!(result.failed[0].error.as_deref(), Some("boom"));
        assert!(!result.failed[0].success);
        assert_eq!(result.skipped[0].error.as_deref(), Some("dependency failed"));
    }
}
