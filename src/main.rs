use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;

use piwik_kernel::cache::backend::CacheBackend;
use piwik_kernel::cache::registry::build_backend;
use piwik_kernel::config::{Settings, config_path, log_path, options_db_path};
use piwik_kernel::logging::init_logging;
use piwik_kernel::update::checker::{
    CheckOutcome, ConfiguredTimezone, RunningVersions, UpdateChecker, UpdateSettings,
};
use piwik_kernel::update::options::SqliteOptionStore;

#[derive(Parser)]
#[command(name = "piwik-kernel")]
#[command(version, about = "Cache backends and update checks for Piwik")]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check for a newer release if the last check is old enough
    CheckUpdate {
        /// Check even if the last check is recent
        #[arg(long)]
        force: bool,
        /// Minimum seconds between two checks
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        interval: Option<i64>,
        /// What caused this check, reported to the update service
        #[arg(long, default_value = "")]
        trigger: String,
    },
    /// Print the newer release recorded by the last check, if any
    LatestVersion,
    /// Operate on the configured cache backend
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    Get { key: String },
    /// Store a JSON value
    Set {
        key: String,
        value: String,
        /// Lifetime in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    Delete { key: String },
    Has { key: String },
    Flush,
    /// Print the resolved backend tree
    Describe,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&log_path())?;

    let settings_path = cli.config.unwrap_or_else(config_path);
    let settings = Settings::load(&settings_path)?;

    match cli.command {
        Command::CheckUpdate {
            force,
            interval,
            trigger,
        } => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(check_update(&settings, force, interval, &trigger)),
        Command::LatestVersion => {
            let checker = build_checker(&settings)?;
            match checker.newest_version_available()? {
                Some(version) => println!("{}", version),
                None => println!("up to date"),
            }
            Ok(())
        }
        Command::Cache { action } => run_cache_action(&settings, action),
    }
}

fn build_checker(settings: &Settings) -> anyhow::Result<UpdateChecker<SqliteOptionStore>> {
    let db_path = options_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {:?}", parent))?;
    }

    let store = Arc::new(SqliteOptionStore::new(&db_path)?);
    let checker = UpdateChecker::new(
        store,
        UpdateSettings::from_settings(settings),
        RunningVersions::default(),
        Box::new(ConfiguredTimezone(settings.general.default_timezone.clone())),
    )?;
    Ok(checker)
}

async fn check_update(
    settings: &Settings,
    force: bool,
    interval: Option<i64>,
    trigger: &str,
) -> anyhow::Result<()> {
    let checker = build_checker(settings)?;

    match checker.check(force, interval, trigger).await? {
        CheckOutcome::Disabled => println!("auto update is disabled"),
        CheckOutcome::Skipped { last_checked } => {
            println!("skipped, last checked at {}", last_checked)
        }
        CheckOutcome::Checked { latest_version } if latest_version.is_empty() => {
            println!("latest version unknown")
        }
        CheckOutcome::Checked { latest_version } => println!("latest version: {}", latest_version),
    }
    Ok(())
}

fn run_cache_action(settings: &Settings, action: CacheAction) -> anyhow::Result<()> {
    let backend = build_backend(settings)?;

    match action {
        CacheAction::Get { key } => match backend.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("(miss)"),
        },
        CacheAction::Set { key, value, ttl } => {
            let value: Value = serde_json::from_str(&value)
                .with_context(|| format!("Value for {} is not valid JSON", key))?;
            backend.set(&key, &value, ttl.map(std::time::Duration::from_secs))?;
        }
        CacheAction::Delete { key } => backend.delete(&key)?,
        CacheAction::Has { key } => println!("{}", backend.has(&key)?),
        CacheAction::Flush => backend.flush()?,
        CacheAction::Describe => println!("{}", backend),
    }
    Ok(())
}
