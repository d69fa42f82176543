use colored::Colorize;
use std::path::{Path, PathBuf};
use tcflow_cloud::{ActionType, ApplyResult, Plan, ResourceSet, ResourceStatus, StateManager};
use tcflow_cloud_tencent::{Credentials, TencentCloudProvider};

/// リソース定義を読み込む（`--file` 優先、なければ自動検出）
pub fn load_resources(file: Option<&Path>) -> anyhow::Result<(PathBuf, ResourceSet)> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => tcflow_config::find_resources_file()?,
    };
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("{} を読み込めません: {}", path.display(), e))?;
    let resources = ResourceSet::from_json(&content)
        .map_err(|e| anyhow::anyhow!("{} の解析に失敗しました: {}", path.display(), e))?;
    Ok((path, resources))
}

/// 読み込んだ定義ファイルを表示
pub fn print_loaded_resources_file(path: &Path, resources: &ResourceSet) {
    println!(
        "📄 定義ファイル: {} ({} リソース)",
        path.display().to_string().cyan(),
        resources.len()
    );
}

/// 状態ファイルはカレントディレクトリの .tcflow/ に置く
pub fn state_manager() -> anyhow::Result<StateManager> {
    Ok(StateManager::new(std::env::current_dir()?))
}

/// 認証情報を読み込んでプロバイダを作成
pub fn provider() -> anyhow::Result<TencentCloudProvider> {
    let credentials = Credentials::load()?;
    tracing::debug!("Using region {}", credentials.region);
    Ok(TencentCloudProvider::new(credentials)?)
}

pub fn print_plan(plan: &Plan) {
    println!();
    println!("{}", "実行計画:".bold());
    for action in &plan.actions {
        let line = match action.action_type {
            ActionType::Create => format!("  + {}", action.id).green(),
            ActionType::Update => {
                let changed = action
                    .details
                    .get("changed")
                    .and_then(|v| v.as_array())
                    .map(|fields| {
                        fields
                            .iter()
                            .filter_map(|f| f.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                format!("  ~ {} ({})", action.id, changed).yellow()
            }
            ActionType::Delete => format!("  - {}", action.id).red(),
            ActionType::NoOp => format!("    {}", action.id).dimmed(),
        };
        println!("{}", line);
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

/// 適用結果を表示し、失敗があればエラーを返す
pub fn print_apply_result(result: &ApplyResult) -> anyhow::Result<()> {
    println!();
    for ok in &result.succeeded {
        println!("  ✓ {}", ok.message.green());
    }
    for ng in &result.failed {
        println!(
            "  ✗ {}: {}",
            ng.action_id.red(),
            ng.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
    println!(
        "完了: 成功 {} / 失敗 {} ({} ms)",
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms
    );

    if !result.is_success() {
        anyhow::bail!("{} 件の操作が失敗しました", result.failed.len());
    }
    Ok(())
}

pub fn colored_status(status: ResourceStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        ResourceStatus::Available | ResourceStatus::Running => text.green(),
        ResourceStatus::Creating | ResourceStatus::Deleting | ResourceStatus::Stopped => {
            text.yellow()
        }
        ResourceStatus::Error | ResourceStatus::Deleted => text.red(),
        ResourceStatus::Unknown => text.dimmed(),
    }
}
