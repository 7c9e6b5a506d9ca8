//! Manual summary generation commands.

use anyhow::bail;
use console::style;

use super::helpers;
use crate::config::Settings;
use crate::models::TriggerType;
use crate::services::UpdateOutcome;

pub async fn cmd_summarize(
    settings: &Settings,
    post: Option<i32>,
    all: bool,
    force: bool,
    clear_user_edits: bool,
) -> anyhow::Result<()> {
    let pool = helpers::pool(settings);
    let scheduler = helpers::scheduler(settings, pool)?;

    match (post, all) {
        (Some(post_id), false) => {
            let result = scheduler
                .run_single(post_id, force || clear_user_edits, clear_user_edits)
                .await?;

            match result.outcome {
                UpdateOutcome::Full { degraded: false } => {
                    println!("{} Post {}: summary regenerated", style("✓").green(), post_id);
                }
                UpdateOutcome::Full { degraded: true } => {
                    println!(
                        "{} Post {}: model unavailable, degraded fallback stored",
                        style("!").yellow(),
                        post_id
                    );
                }
                UpdateOutcome::Supplement => {
                    println!("{} Post {}: supplement stored", style("✓").green(), post_id);
                }
                UpdateOutcome::Skip { reason } => {
                    println!("{} Post {}: skipped ({})", style("-").dim(), post_id, reason);
                }
            }
            Ok(())
        }
        (None, true) => {
            match scheduler.run_batch(TriggerType::Manual).await? {
                Some(outcome) => {
                    println!("{} Batch finished", style("✓").green());
                    println!("  {:<12} {:>6}", "Total:", outcome.total);
                    println!("  {:<12} {:>6}", "Full:", outcome.full_update);
                    println!("  {:<12} {:>6}", "Supplement:", outcome.supplement);
                    println!("  {:<12} {:>6}", "Skipped:", outcome.skipped);
                    println!("  {:<12} {:>6}", "Failed:", outcome.fail);
                }
                None => {
                    println!("{} A batch run is already in progress.", style("!").yellow());
                }
            }
            Ok(())
        }
        (Some(_), true) => bail!("--post and --all are mutually exclusive"),
        (None, false) => bail!("specify --post <id> or --all"),
    }
}
