//! Runs a single check cycle over the configured sources and prints the status table.

use social_monitor::{build_monitor, init_tracing, MonitorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = MonitorConfig::load_default()?;
    let monitor = build_monitor(&cfg).await?;

    let report = monitor.trigger_manual_check().await;
    println!(
        "checked {} sources: {} changed, {} failed, {} notified",
        report.checked, report.changed, report.failed, report.notified
    );
    println!();
    println!(
        "{:<10} {:>7} {:>7} {:>8}  {:<5}  {}",
        "SOURCE", "CHECKS", "OK", "RATE", "NEW", "LAST POST / ERROR"
    );
    for row in monitor.status_snapshot()? {
        let detail = row.last_error.as_deref().unwrap_or(&row.last_post);
        println!(
            "{:<10} {:>7} {:>7} {:>7.1}%  {:<5}  {}",
            row.source_id,
            row.check_count,
            row.success_count,
            row.success_rate,
            if row.has_new_content { "yes" } else { "no" },
            detail.replace('\n', " ")
        );
    }
    Ok(())
}
