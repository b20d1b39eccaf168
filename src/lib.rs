pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;

pub use error::{Error, Result};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::{
    brief::run_brief,
    catalog::run_catalog_sync,
    experiments::run_experiment_decisions,
    recommendations::run_recommendations,
    rollups::{run_ops_baseline, run_queue_health, run_telemetry_rollup},
    settings::{load_settings_from_disk, save_settings_to_disk},
    targets::run_targets,
};
use std::path::PathBuf;

/// Scoring, decisions and rollups over a catalog's marketing data directory.
#[derive(Parser, Debug)]
#[command(name = "catalog-scout")]
#[command(version)]
pub struct Cli {
    /// Directory holding inputs, settings and generated artifacts
    #[arg(long, global = true, default_value = "data", env = "CATALOG_SCOUT_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Clock override (RFC 3339) for reproducible artifacts
    #[arg(long, global = true)]
    pub now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover, score and rank outreach targets
    Targets,
    /// Decide active outreach experiments
    Experiments,
    /// Synthesize prioritized recommendations from the other artifacts
    Recommendations,
    /// Compute the ops runtime baseline and tier budgets
    Baseline,
    /// Roll up telemetry events
    Telemetry,
    /// Snapshot the submission review queue
    QueueHealth,
    /// Merge registry, live signals and overrides into the catalog
    Catalog,
    /// Render the operator brief
    Brief,
    /// Show or update settings.json
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the effective settings
    Show,
    /// Merge a partial JSON object into the stored settings
    Set { json: String },
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    let now = cli.now.unwrap_or_else(Utc::now);
    let data_dir = cli.data_dir.as_path();
    log::debug!("data dir {}, clock {}", data_dir.display(), now.to_rfc3339());

    match cli.command {
        Command::Targets => {
            run_targets(data_dir, now).await?;
        }
        Command::Experiments => {
            run_experiment_decisions(data_dir, now)?;
        }
        Command::Recommendations => {
            run_recommendations(data_dir, now)?;
        }
        Command::Baseline => {
            run_ops_baseline(data_dir, now)?;
        }
        Command::Telemetry => {
            run_telemetry_rollup(data_dir)?;
        }
        Command::QueueHealth => {
            run_queue_health(data_dir, now)?;
        }
        Command::Catalog => {
            run_catalog_sync(data_dir)?;
        }
        Command::Brief => {
            run_brief(data_dir, now)?;
        }
        Command::Settings { action } => match action {
            SettingsAction::Show => print_json(&load_settings_from_disk(data_dir)?)?,
            SettingsAction::Set { json } => {
                let partial: serde_json::Value = serde_json::from_str(&json)?;
                if !partial.is_object() {
                    return Err(Error::Config("settings update must be a JSON object".into()));
                }
                print_json(&save_settings_to_disk(data_dir, partial)?)?;
            }
        },
    }
    Ok(())
}
