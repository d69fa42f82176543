use crate::utils;
use colored::Colorize;
use tcflow_cloud::CloudProvider;

pub async fn handle() -> anyhow::Result<()> {
    println!("{}", "認証情報を確認中...".blue());
    let provider = utils::provider()?;
    let status = provider.check_auth().await?;

    if status.authenticated {
        println!(
            "  ✓ {} ({})",
            "認証に成功しました".green(),
            status.account_info.unwrap_or_default()
        );
        Ok(())
    } else {
        println!("  ✗ {}", "認証に失敗しました".red());
        anyhow::bail!(status.error.unwrap_or_default())
    }
}
