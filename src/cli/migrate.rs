//! Database migration command.

use console::style;

use crate::config::Settings;
use crate::repository::migrations::run_migrations;

pub async fn cmd_migrate(settings: &Settings) -> anyhow::Result<()> {
    println!("{} Database migration", style("→").cyan());
    println!("  Database: {}", settings.database_path().display());

    tokio::fs::create_dir_all(&settings.data_dir).await?;
    run_migrations(&settings.database_url()).await?;

    println!("{} Schema is up to date.", style("✓").green());
    Ok(())
}
