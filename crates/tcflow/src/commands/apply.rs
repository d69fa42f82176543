use crate::utils;
use colored::Colorize;
use std::path::Path;
use tcflow_cloud::{Plan, apply_plan};

pub async fn handle(file: Option<&Path>, prune: bool, yes: bool) -> anyhow::Result<()> {
    println!("{}", "変更を適用します...".blue().bold());
    let (path, desired) = utils::load_resources(file)?;
    utils::print_loaded_resources_file(&path, &desired);

    let provider = utils::provider()?;
    let manager = utils::state_manager()?;
    let _lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let plan = Plan::build(&provider, &desired, &state, prune)?;
    utils::print_plan(&plan);

    if !plan.has_changes {
        println!("{}", "変更はありません".green());
        return Ok(());
    }

    if !yes {
        println!();
        println!(
            "{}",
            "警告: クラウド上のリソースを作成・変更・削除します。".yellow()
        );
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let result = apply_plan(&provider, &plan, &desired, &mut state).await;
    // 一部失敗でも成功分は記録する
    manager.save(&state).await?;

    utils::print_apply_result(&result)
}
