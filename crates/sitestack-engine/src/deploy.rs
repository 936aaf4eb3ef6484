//! Preview, apply and destroy
//!
//! Every declared resource becomes one step. Steps run concurrently and
//! each waits only on the outputs it actually needs, so independent
//! resources proceed while a failed one holds back just its dependents.

use crate::action::{Action, ActionType, ApplyResult, Plan};
use crate::engine::{Engine, settings_from_outputs};
use crate::error::{OutputError, OutputResult, Result};
use crate::input::{Args, Input, PropertyMap, describe_unresolved};
use crate::provider::CreateRequest;
use crate::session::{PendingResource, Registration, ResourceGraph};
use crate::state::{ResourceState, ResourceStatus, StackState};
use chrono::Utc;
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// What a deployment would do
#[derive(Debug)]
pub struct Preview {
    pub plan: Plan,
    /// Exports already known before apply
    pub outputs: BTreeMap<String, Value>,
    /// Exports that are not known yet, or would fail
    pub unresolved: BTreeMap<String, OutputError>,
}

/// What a deployment did
#[derive(Debug)]
pub struct Deployment {
    pub plan: Plan,
    pub result: ApplyResult,
    pub outputs: BTreeMap<String, Value>,
    /// Exports that could not be resolved, e.g. because a resource failed
    pub output_errors: BTreeMap<String, OutputError>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Preview,
    Apply,
}

enum Outcome {
    Unchanged,
    Applied(ResourceState),
    Failed(ResourceState, String),
    Skipped(String),
    /// Preview only
    Planned,
}

struct Step {
    action: Action,
    outcome: Outcome,
}

/// Computes the plan without creating anything. Values only known after
/// apply stay unknown.
pub async fn preview(graph: ResourceGraph, state: &StackState) -> Result<Preview> {
    let ResourceGraph {
        resources,
        exports,
        engine,
        ..
    } = graph;

    let declared = declared_urns(&resources);
    let steps = join_all(
        resources
            .into_iter()
            .map(|pending| run_step(Mode::Preview, engine.as_ref(), pending, state)),
    )
    .await;

    let mut actions: Vec<Action> = steps.into_iter().map(|s| s.action).collect();
    actions.extend(stale_actions(state, &declared));

    let (outputs, unresolved) = resolve_exports(&exports).await;
    Ok(Preview {
        plan: Plan::new(actions),
        outputs,
        unresolved,
    })
}

/// Creates or updates every declared resource, deletes resources that are
/// no longer declared and records the result in `state`.
///
/// A failing resource does not abort the run: its dependents are skipped
/// and everything else is applied.
pub async fn apply(graph: ResourceGraph, state: &mut StackState) -> Result<Deployment> {
    let started = Instant::now();
    let ResourceGraph {
        resources,
        exports,
        engine,
        ..
    } = graph;

    let declared = declared_urns(&resources);
    let steps = {
        let prior: &StackState = state;
        join_all(
            resources
                .into_iter()
                .map(|pending| run_step(Mode::Apply, engine.as_ref(), pending, prior)),
        )
        .await
    };

    let mut result = ApplyResult::new();
    let mut actions = Vec::with_capacity(steps.len());
    for step in steps {
        let urn = step.action.urn.clone();
        match step.outcome {
            Outcome::Unchanged => result.add_success(urn, "unchanged".to_string()),
            Outcome::Applied(resource) => {
                result.add_success(urn, format!("{}d", step.action.action_type));
                state.set_resource(resource);
            }
            Outcome::Failed(resource, error) => {
                tracing::error!(urn = %urn, error = %error, "Resource failed");
                result.add_failure(urn, error);
                state.set_resource(resource);
            }
            Outcome::Skipped(reason) => {
                tracing::warn!(urn = %urn, reason = %reason, "Resource skipped");
                result.add_skipped(urn, reason);
            }
            Outcome::Planned => {}
        }
        actions.push(step.action);
    }

    for action in stale_actions(state, &declared) {
        let Some(resource) = state.get_resource(&action.urn).cloned() else {
            continue;
        };
        match engine.delete(&resource).await {
            Ok(()) => {
                state.remove_resource(&action.urn);
                result.add_success(action.urn.clone(), "deleted".to_string());
            }
            Err(e) => result.add_failure(action.urn.clone(), e.to_string()),
        }
        actions.push(action);
    }

    let (outputs, output_errors) = resolve_exports(&exports).await;
    state.outputs = outputs.clone();
    state.updated_at = Utc::now();
    result.duration_ms = started.elapsed().as_millis() as u64;

    Ok(Deployment {
        plan: Plan::new(actions),
        result,
        outputs,
        output_errors,
    })
}

/// Deletes every resource recorded in `state`, newest first
pub async fn destroy(engine: &dyn Engine, state: &mut StackState) -> Result<ApplyResult> {
    let started = Instant::now();
    let mut resources: Vec<ResourceState> = state.resources.values().cloned().collect();
    resources.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut result = ApplyResult::new();
    for resource in resources {
        match engine.delete(&resource).await {
            Ok(()) => {
                state.remove_resource(&resource.urn);
                result.add_success(resource.urn, "deleted".to_string());
            }
            Err(e) => result.add_failure(resource.urn, e.to_string()),
        }
    }
    if state.resources.is_empty() {
        state.outputs.clear();
    }
    result.duration_ms = started.elapsed().as_millis() as u64;
    Ok(result)
}

fn declared_urns(resources: &[PendingResource]) -> BTreeSet<String> {
    resources
        .iter()
        .map(|r| r.registration.urn.to_string())
        .collect()
}

fn stale_actions(state: &StackState, declared: &BTreeSet<String>) -> Vec<Action> {
    state
        .resources
        .values()
        .filter(|r| !declared.contains(&r.urn))
        .map(|r| Action::new(ActionType::Delete, &r.urn, &r.token, &r.name))
        .collect()
}

async fn run_step(
    mode: Mode,
    engine: &dyn Engine,
    pending: PendingResource,
    state: &StackState,
) -> Step {
    let PendingResource { registration, slot } = pending;
    let prior = state.get_resource(registration.urn.as_str());

    let (step, outputs) = resolve_step(mode, engine, &registration, prior).await;
    // The receiver is gone when nothing reads this resource's outputs
    let _ = slot.send(outputs);
    step
}

async fn resolve_step(
    mode: Mode,
    engine: &dyn Engine,
    registration: &Registration,
    prior: Option<&ResourceState>,
) -> (Step, OutputResult<PropertyMap>) {
    let urn = registration.urn.to_string();
    let kind = if prior.is_some() {
        ActionType::Update
    } else {
        ActionType::Create
    };
    let action = |kind| Action::new(kind, &urn, &registration.token, registration.name());

    for dependency in &registration.options.depends_on {
        if let Err(e) = dependency.state().resolve().await {
            if !e.is_unknown() {
                let step = Step {
                    action: action(kind),
                    outcome: Outcome::Skipped(e.to_string()),
                };
                return (step, Err(e));
            }
        }
    }

    let provider_config = match &registration.options.provider {
        Some(provider) => match provider.state().resolve().await {
            Ok(outputs) => settings_from_outputs(&outputs),
            Err(e) if e.is_unknown() => Default::default(),
            Err(e) => {
                let step = Step {
                    action: action(kind),
                    outcome: Outcome::Skipped(e.to_string()),
                };
                return (step, Err(e));
            }
        },
        None => Default::default(),
    };

    let (inputs, details, failure) = resolve_args(&registration.args).await;

    if let Some(error) = failure {
        // An input derived for this resource (e.g. a signed URL) failed on
        // its own: the resource fails instead of being skipped
        if mode == Mode::Apply && !error.is_unknown() && !error.is_inherited() {
            let reason = format!("invalid input: {}", error);
            let record = ResourceState::new(&urn, &registration.token, registration.name())
                .with_status(ResourceStatus::Failed);
            let step = Step {
                action: action(kind).with_details(details),
                outcome: Outcome::Failed(record, reason.clone()),
            };
            return (step, Err(OutputError::Upstream { urn, reason }));
        }
        if mode == Mode::Apply || !error.is_unknown() {
            let step = Step {
                action: action(kind).with_details(details),
                outcome: Outcome::Skipped(error.to_string()),
            };
            return (step, Err(error));
        }
    }

    let inputs_known = inputs.is_some();
    if let (Some(prior), Some(inputs)) = (prior, inputs.as_ref()) {
        if prior.status == ResourceStatus::Ready && prior.inputs == *inputs {
            let step = Step {
                action: action(ActionType::NoOp).with_details(details),
                outcome: Outcome::Unchanged,
            };
            return (step, Ok(prior.outputs.clone()));
        }
    }

    if mode == Mode::Preview || !inputs_known {
        let step = Step {
            action: action(kind).with_details(details),
            outcome: Outcome::Planned,
        };
        return (step, Err(OutputError::Unknown));
    }

    let inputs = inputs.unwrap_or_default();
    let request = CreateRequest {
        urn: registration.urn.clone(),
        token: registration.token.clone(),
        name: registration.name().to_string(),
        inputs: inputs.clone(),
        config: provider_config,
    };

    let now = Utc::now();
    let mut record = ResourceState::new(&urn, &registration.token, registration.name())
        .with_inputs(inputs);
    if let Some(prior) = prior {
        record.created_at = prior.created_at;
    }
    record.updated_at = now;

    match engine.create(request).await {
        Ok(outputs) => {
            let record = record.with_outputs(outputs.clone());
            let step = Step {
                action: action(kind).with_details(details),
                outcome: Outcome::Applied(record),
            };
            (step, Ok(outputs))
        }
        Err(e) => {
            let reason = e.to_string();
            let record = record.with_status(ResourceStatus::Failed);
            let step = Step {
                action: action(kind).with_details(details),
                outcome: Outcome::Failed(record, reason.clone()),
            };
            (step, Err(OutputError::Upstream { urn, reason }))
        }
    }
}

/// Resolves every argument. Returns the inputs when all are known, the
/// per-argument display values, and the first failure in key order.
async fn resolve_args(
    args: &Args,
) -> (
    Option<PropertyMap>,
    BTreeMap<String, String>,
    Option<OutputError>,
) {
    let mut inputs = PropertyMap::new();
    let mut details = BTreeMap::new();
    let mut failure: Option<OutputError> = None;

    for (key, input) in args.iter() {
        match input.resolve().await {
            Ok(value) => {
                details.insert(key.clone(), display_value(&value));
                inputs.insert(key.clone(), value);
            }
            Err(e) => {
                details.insert(key.clone(), describe_unresolved(&e));
                // A real failure outranks an unknown value
                let replace = match &failure {
                    None => true,
                    Some(current) => current.is_unknown() && !e.is_unknown(),
                };
                if replace {
                    failure = Some(e);
                }
            }
        }
    }

    let inputs = failure.is_none().then_some(inputs);
    (inputs, details, failure)
}

async fn resolve_exports(
    exports: &[(String, Input)],
) -> (BTreeMap<String, Value>, BTreeMap<String, OutputError>) {
    let mut outputs = BTreeMap::new();
    let mut errors = BTreeMap::new();
    for (name, input) in exports {
        match input.resolve().await {
            Ok(value) => {
                outputs.insert(name.clone(), value);
            }
            Err(e) => {
                errors.insert(name.clone(), e);
            }
        }
    }
    (outputs, errors)
}

/// Renders a value for the preview table; strings are shown unquoted
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use crate::error::EngineError;
    use crate::provider::{ResourceProvider, physical_name};
    use crate::resource::ResourceOptions;
    use crate::session::Session;
    use async_trait::async_trait;
    use sitestack_config::StackConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test provider: `test:index:Thing` echoes its inputs plus a generated
    /// name; a `fail` input makes creation fail.
    struct Things {
        creates: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ResourceProvider for Things {
        fn name(&self) -> &str {
            "test"
        }

        fn display_name(&self) -> &str {
            "Test"
        }

        fn supports(&self, token: &str) -> bool {
            token == "test:index:Thing"
        }

        async fn create(&self, request: &CreateRequest) -> Result<PropertyMap> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if request.inputs.contains_key("fail") {
                return Err(EngineError::ProviderError("quota exceeded".to_string()));
            }
            let mut outputs = request.inputs.clone();
            outputs.insert(
                "name".to_string(),
                Value::from(physical_name(&request.urn)),
            );
            if let Some(region) = request.config.get("region") {
                outputs.insert("region".to_string(), Value::from(region.as_str()));
            }
            Ok(outputs)
        }
    }

    fn session(creates: &Arc<AtomicUsize>) -> Session {
        let engine = LocalEngine::new(StackConfig::from_pairs([("test:region", "us-west-2")]))
            .with_provider(Things {
                creates: Arc::clone(creates),
            });
        Session::new("site", "dev", Arc::new(engine))
    }

    fn declare_chain(ctx: &Session, fail_first: bool) {
        let mut args = Args::new().with("size", 1);
        if fail_first {
            args.set("fail", true);
        }
        let first = ctx
            .register("test:index:Thing", "first", args, ResourceOptions::new())
            .unwrap();
        ctx.register(
            "test:index:Thing",
            "second",
            Args::new().with("parent", first.string("name")),
            ResourceOptions::new(),
        )
        .unwrap();
        ctx.register(
            "test:index:Thing",
            "independent",
            Args::new().with("size", 2),
            ResourceOptions::new(),
        )
        .unwrap();
        ctx.export("parentName", first.string("name"));
        ctx.export("url", first.string("name").wrap("https://", "/"));
        ctx.export("static", "fixed");
    }

    #[tokio::test]
    async fn test_preview_marks_unknowns() {
        let creates = Arc::new(AtomicUsize::new(0));
        let ctx = session(&creates);
        declare_chain(&ctx, false);

        let preview = preview(ctx.into_graph(), &StackState::new("site", "dev"))
            .await
            .unwrap();
        assert_eq!(creates.load(Ordering::SeqCst), 0);
        assert_eq!(preview.plan.summary().create, 3);
        assert_eq!(
            preview.plan.find("second").unwrap().details["parent"],
            "(known after apply)"
        );
        assert_eq!(preview.outputs["static"], "fixed");
        assert!(preview.unresolved["url"].is_unknown());
    }

    #[tokio::test]
    async fn test_apply_then_noop() {
        let creates = Arc::new(AtomicUsize::new(0));
        let mut state = StackState::new("site", "dev");

        let ctx = session(&creates);
        declare_chain(&ctx, false);
        let deployment = apply(ctx.into_graph(), &mut state).await.unwrap();
        assert!(deployment.result.is_success());
        assert_eq!(creates.load(Ordering::SeqCst), 3);
        let name = deployment.outputs["parentName"].as_str().unwrap().to_string();
        assert!(name.starts_with("first-"));
        assert_eq!(deployment.outputs["url"], format!("https://{}/", name));
        assert_eq!(state.resources.len(), 3);
        assert_eq!(state.outputs["parentName"], name.as_str());

        // Same program again: nothing changes, outputs come from state
        let ctx = session(&creates);
        declare_chain(&ctx, false);
        let preview = preview(ctx.into_graph(), &state).await.unwrap();
        assert!(!preview.plan.has_changes);
        assert_eq!(preview.outputs["parentName"], name.as_str());

        let ctx = session(&creates);
        declare_chain(&ctx, false);
        let deployment = apply(ctx.into_graph(), &mut state).await.unwrap();
        assert_eq!(deployment.plan.summary().no_change, 3);
        assert_eq!(creates.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_skips_only_dependents() {
        let creates = Arc::new(AtomicUsize::new(0));
        let mut state = StackState::new("site", "dev");
        let ctx = session(&creates);
        declare_chain(&ctx, true);

        let deployment = apply(ctx.into_graph(), &mut state).await.unwrap();
        assert!(!deployment.result.is_success());
        assert_eq!(deployment.result.failed.len(), 1);
        assert_eq!(deployment.result.skipped.len(), 1);
        assert_eq!(deployment.result.succeeded.len(), 1);
        assert!(matches!(
            deployment.output_errors["parentName"],
            OutputError::Upstream { ref reason, .. } if reason.contains("quota exceeded")
        ));
        assert_eq!(deployment.outputs["static"], "fixed");

        let failed = state
            .resources
            .values()
            .find(|r| r.name == "first")
            .unwrap();
        assert_eq!(failed.status, ResourceStatus::Failed);
    }

    #[tokio::test]
    async fn test_failed_derivation_fails_the_resource() {
        let creates = Arc::new(AtomicUsize::new(0));
        let mut state = StackState::new("site", "dev");
        let ctx = session(&creates);
        let first = ctx
            .register("test:index:Thing", "first", Args::new(), ResourceOptions::new())
            .unwrap();
        let signed = first.string("name").try_apply(|_| {
            Err::<String, _>(OutputError::Invoke {
                token: "test:index:sign".to_string(),
                message: "bad key".to_string(),
            })
        });
        ctx.register(
            "test:index:Thing",
            "consumer",
            Args::new().with("url", signed),
            ResourceOptions::new(),
        )
        .unwrap();

        let deployment = apply(ctx.into_graph(), &mut state).await.unwrap();
        assert_eq!(deployment.result.succeeded.len(), 1);
        assert_eq!(deployment.result.failed.len(), 1);
        assert!(deployment.result.skipped.is_empty());
        assert!(deployment.result.failed[0].urn.ends_with("::consumer"));
        assert!(
            deployment.result.failed[0]
                .error
                .as_deref()
                .unwrap_or_default()
                .contains("bad key")
        );
    }

    #[tokio::test]
    async fn test_removed_resources_are_deleted() {
        let creates = Arc::new(AtomicUsize::new(0));
        let mut state = StackState::new("site", "dev");
        let ctx = session(&creates);
        declare_chain(&ctx, false);
        apply(ctx.into_graph(), &mut state).await.unwrap();

        let ctx = session(&creates);
        ctx.register(
            "test:index:Thing",
            "independent",
            Args::new().with("size", 2),
            ResourceOptions::new(),
        )
        .unwrap();
        let preview = preview(ctx.into_graph(), &state).await.unwrap();
        assert_eq!(preview.plan.summary().delete, 2);

        let ctx = session(&creates);
        ctx.register(
            "test:index:Thing",
            "independent",
            Args::new().with("size", 2),
            ResourceOptions::new(),
        )
        .unwrap();
        apply(ctx.into_graph(), &mut state).await.unwrap();
        assert_eq!(state.resources.len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_provider_overrides_config() {
        let creates = Arc::new(AtomicUsize::new(0));
        let ctx = session(&creates);
        let east = ctx
            .register(
                "sitestack:providers:test",
                "east",
                Args::new().with("region", "us-east-1"),
                ResourceOptions::new(),
            )
            .unwrap();
        let pinned = ctx
            .register(
                "test:index:Thing",
                "pinned",
                Args::new(),
                ResourceOptions::new().provider(&east),
            )
            .unwrap();
        let default = ctx
            .register("test:index:Thing", "default", Args::new(), ResourceOptions::new())
            .unwrap();
        ctx.export("pinned", pinned.string("region"));
        ctx.export("default", default.string("region"));

        let mut state = StackState::new("site", "dev");
        let deployment = apply(ctx.into_graph(), &mut state).await.unwrap();
        assert_eq!(deployment.outputs["pinned"], "us-east-1");
        assert_eq!(deployment.outputs["default"], "us-west-2");
    }

    #[tokio::test]
    async fn test_destroy_empties_state() {
        let creates = Arc::new(AtomicUsize::new(0));
        let ctx = session(&creates);
        declare_chain(&ctx, false);
        let engine = Arc::clone(&ctx.into_graph().engine);

        let ctx = session(&creates);
        declare_chain(&ctx, false);
        let mut state = StackState::new("site", "dev");
        apply(ctx.into_graph(), &mut state).await.unwrap();

        let result = destroy(engine.as_ref(), &mut state).await.unwrap();
        assert_eq!(result.succeeded.len(), 3);
        assert!(state.is_empty());
        assert!(state.outputs.is_empty());
    }
}
