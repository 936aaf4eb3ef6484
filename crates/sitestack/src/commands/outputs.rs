use crate::utils::{self, StackContext};
use std::collections::BTreeMap;

pub async fn handle(ctx: &StackContext, json: bool) -> anyhow::Result<()> {
    let state = ctx.state_manager().load(&ctx.project).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state.outputs)?);
        return Ok(());
    }

    if state.outputs.is_empty() {
        println!("No outputs for stack '{}'. Run `sitestack up` first.", ctx.stack);
        return Ok(());
    }
    utils::print_outputs(&state.outputs, &BTreeMap::new());
    Ok(())
}
