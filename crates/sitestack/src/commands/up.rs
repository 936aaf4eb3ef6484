use crate::utils::{self, StackContext};
use colored::Colorize;
use sitestack_engine::{Deployment, Session, StateManager};

pub async fn handle(ctx: &StackContext, yes: bool) -> anyhow::Result<()> {
    println!("{}", "Deploying stack...".blue().bold());
    utils::print_header(ctx);
    let manager = ctx.state_manager();

    // Without --yes only the plan is shown
    if !yes {
        let state = manager.load(&ctx.project).await?;
        let preview = sitestack_engine::preview(ctx.declare()?.into_graph(), &state).await?;
        utils::print_plan(&preview.plan);
        if preview.plan.has_changes {
            println!();
            println!("{}", "Warning: resources will be created, updated or deleted.".yellow());
            println!("Run again with --yes to apply");
        }
        return Ok(());
    }

    let session = ctx.declare()?;
    let lock = manager.acquire_lock().await?;
    let deployment = apply(ctx, &manager, session).await;
    lock.release().await?;
    let deployment = deployment?;

    utils::print_plan(&deployment.plan);
    let result = &deployment.result;
    if !result.is_success() {
        println!();
        println!("{}", "Failures:".red().bold());
        utils::print_failures(result);
    }
    utils::print_outputs(&deployment.outputs, &deployment.output_errors);

    println!();
    if result.is_success() {
        println!(
            "{} {} resources in {}ms",
            "✓".green(),
            result.succeeded.len(),
            result.duration_ms
        );
        Ok(())
    } else {
        anyhow::bail!(
            "{} resource(s) failed, {} skipped",
            result.failed.len(),
            result.skipped.len()
        )
    }
}

/// Applies and records the state, also when some resources failed
async fn apply(
    ctx: &StackContext,
    manager: &StateManager,
    session: Session,
) -> anyhow::Result<Deployment> {
    let mut state = manager.load(&ctx.project).await?;
    let deployment = sitestack_engine::apply(session.into_graph(), &mut state).await?;
    manager.save(&state).await?;
    tracing::info!(
        stack = %ctx.stack,
        succeeded = deployment.result.succeeded.len(),
        failed = deployment.result.failed.len(),
        "Deployment finished"
    );
    Ok(deployment)
}
