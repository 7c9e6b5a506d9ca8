//! CLI parser and command dispatch.

mod helpers;
mod migrate;
mod ocr_cmd;
mod serve;
mod status;
mod summarize;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "postscribe")]
#[command(about = "Forum content enrichment pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to postscribe.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and run database migrations
    Migrate,

    /// Run the OCR poller and the batch summary scheduler
    Serve,

    /// Generate or refresh post summaries
    Summarize {
        /// Post id to update
        #[arg(long)]
        post: Option<i32>,

        /// Update every post
        #[arg(long)]
        all: bool,

        /// Force full regeneration even when content is unchanged
        #[arg(short, long)]
        force: bool,

        /// Discard user overrides before regenerating (implies --force)
        #[arg(long)]
        clear_user_edits: bool,
    },

    /// OCR queue management
    Ocr {
        #[command(subcommand)]
        command: OcrCommands,
    },

    /// Show scheduler status and recent generation logs
    Status {
        /// Number of log rows to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum OcrCommands {
    /// Scan an entity's content and enqueue OCR tasks for its images
    Enqueue {
        /// Entity kind: post, comment, result, idea, or todo
        kind: String,
        /// Entity id
        id: i32,
    },

    /// Resubmit a failed task
    Retry {
        /// Task id
        task_id: i32,
    },

    /// Show the pending count and failed tasks
    Status,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Migrate => migrate::cmd_migrate(&settings).await,
        Commands::Serve => serve::cmd_serve(&settings).await,
        Commands::Summarize {
            post,
            all,
            force,
            clear_user_edits,
        } => summarize::cmd_summarize(&settings, post, all, force, clear_user_edits).await,
        Commands::Ocr { command } => match command {
            OcrCommands::Enqueue { kind, id } => {
                ocr_cmd::cmd_enqueue(&settings, &kind, id).await
            }
            OcrCommands::Retry { task_id } => ocr_cmd::cmd_retry(&settings, task_id).await,
            OcrCommands::Status => ocr_cmd::cmd_status(&settings).await,
        },
        Commands::Status { limit } => status::cmd_status(&settings, limit).await,
    }
}
