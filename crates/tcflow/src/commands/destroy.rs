use crate::utils;
use colored::Colorize;
use tcflow_cloud::{Plan, ResourceSet, apply_plan};

pub async fn handle(yes: bool) -> anyhow::Result<()> {
    println!("{}", "全リソースを削除します...".red().bold());

    let provider = utils::provider()?;
    let manager = utils::state_manager()?;
    let _lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let plan = Plan::destroy_all(&provider, &state)?;
    if !plan.has_changes {
        println!("{}", "状態ファイルにリソースがありません".dimmed());
        return Ok(());
    }
    utils::print_plan(&plan);

    if !yes {
        println!();
        println!("{}", "警告: この操作は元に戻せません。".yellow());
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let result = apply_plan(&provider, &plan, &ResourceSet::new(), &mut state).await;
    manager.save(&state).await?;

    utils::print_apply_result(&result)
}
