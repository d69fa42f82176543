use crate::utils;
use colored::Colorize;
use std::path::Path;
use tcflow_cloud::Plan;

pub async fn handle(file: Option<&Path>, prune: bool) -> anyhow::Result<()> {
    println!("{}", "実行計画を作成中...".blue());
    let (path, desired) = utils::load_resources(file)?;
    utils::print_loaded_resources_file(&path, &desired);

    let provider = utils::provider()?;
    let state = utils::state_manager()?.load().await?;
    let plan = Plan::build(&provider, &desired, &state, prune)?;

    utils::print_plan(&plan);
    if plan.has_changes {
        println!();
        println!("適用するには {} を実行してください", "tcflow apply".cyan());
    }
    Ok(())
}
