use crate::utils::{self, StackContext};
use colored::Colorize;

pub async fn handle(ctx: &StackContext, yes: bool) -> anyhow::Result<()> {
    println!("{}", "Destroying stack...".yellow().bold());
    utils::print_header(ctx);

    let manager = ctx.state_manager();
    let lock = manager.acquire_lock().await?;
    let outcome = destroy(ctx, &manager, yes).await;
    lock.release().await?;
    outcome
}

async fn destroy(
    ctx: &StackContext,
    manager: &sitestack_engine::StateManager,
    yes: bool,
) -> anyhow::Result<()> {
    let mut state = manager.load(&ctx.project).await?;
    if state.is_empty() {
        println!("Nothing to destroy");
        return Ok(());
    }

    println!();
    println!("{}", format!("Resources ({}):", state.resources.len()).bold());
    for resource in state.resources.values() {
        println!("  - {} ({})", resource.name.red(), resource.token);
    }

    if !yes {
        println!();
        println!("{}", "Warning: every resource above will be deleted.".yellow());
        println!("Run again with --yes to destroy");
        return Ok(());
    }

    let engine = ctx.engine();
    let result = sitestack_engine::destroy(&engine, &mut state).await?;
    manager.save(&state).await?;

    println!();
    if result.failed.is_empty() {
        println!(
            "{} Deleted {} resources in {}ms",
            "✓".green(),
            result.succeeded.len(),
            result.duration_ms
        );
        Ok(())
    } else {
        utils::print_failures(&result);
        anyhow::bail!("{} resource(s) could not be deleted", result.failed.len())
    }
}
