use crate::utils;
use colored::Colorize;
use tcflow_cloud::CloudProvider;

pub async fn handle(refresh: bool) -> anyhow::Result<()> {
    let manager = utils::state_manager()?;
    let _lock = if refresh {
        Some(manager.acquire_lock().await?)
    } else {
        None
    };
    let mut state = manager.load().await?;

    if refresh {
        println!("{}", "クラウドから状態を読み直しています...".blue());
        let provider = utils::provider()?;
        let mut keys: Vec<String> = state.resources.keys().cloned().collect();
        keys.sort();

        for key in keys {
            let Some(current) = state.get_resource(&key).cloned() else {
                continue;
            };
            match provider.read(&current).await? {
                Some(fresh) => state.set_resource(key, fresh),
                None => {
                    println!("  - {} ({}) は削除済みです", key.yellow(), current.id);
                    state.remove_resource(&key);
                }
            }
        }
        manager.save(&state).await?;
    }

    if state.resources.is_empty() {
        println!("{}", "状態ファイルにリソースがありません".dimmed());
        return Ok(());
    }

    println!();
    println!(
        "{}",
        format!("{:<32} {:<28} {:<12} {:<20}", "RESOURCE", "ID", "STATUS", "UPDATED").bold()
    );
    println!("{}", "─".repeat(92).dimmed());

    let mut entries: Vec<_> = state.resources.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (key, resource) in entries {
        println!(
            "{:<32} {:<28} {:<12} {:<20}",
            key.cyan(),
            resource.id,
            utils::colored_status(resource.status),
            resource.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
