use crate::utils;
use colored::Colorize;

pub async fn handle(id: Option<&str>, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let provider = utils::provider()?;
    let vpcs = provider.vpcs(id, name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&vpcs)?);
        return Ok(());
    }

    if vpcs.is_empty() {
        println!("{}", "該当する VPC はありません".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<16} {:<24} {:<18} {:<8} {}", "VPC ID", "NAME", "CIDR", "DEFAULT", "SUBNETS")
            .bold()
    );
    println!("{}", "─".repeat(100).dimmed());
    for entry in &vpcs {
        let vpc = &entry.vpc;
        println!(
            "{:<16} {:<24} {:<18} {:<8} {}",
            vpc.vpc_id.cyan(),
            vpc.name,
            vpc.cidr_block,
            if vpc.is_default { "yes" } else { "-" },
            entry.subnet_ids.join(", ")
        );
    }
    println!();
    println!("{} 件 (region: {})", vpcs.len(), provider.region());
    Ok(())
}
