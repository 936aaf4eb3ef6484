use crate::utils::{self, StackContext};
use colored::Colorize;

pub async fn handle(ctx: &StackContext) -> anyhow::Result<()> {
    println!("{}", "Previewing stack...".blue().bold());
    utils::print_header(ctx);

    let session = ctx.declare()?;
    let state = ctx.state_manager().load(&ctx.project).await?;
    let preview = sitestack_engine::preview(session.into_graph(), &state).await?;

    utils::print_plan(&preview.plan);
    utils::print_outputs(&preview.outputs, &preview.unresolved);
    Ok(())
}
