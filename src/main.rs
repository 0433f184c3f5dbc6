mod cli;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sunalert_core::Config;
use sunalert_history::{
    CheckError, CheckOutcome, CheckSession, HistoryCoordinator, HistoryRecord, RestMirrorClient,
    SqliteHistoryStore,
};
use sunalert_uv::{describe, Location, RiskLevel, UvProvider};

use crate::cli::{Cli, Commands};

type Coordinator = HistoryCoordinator<SqliteHistoryStore, RestMirrorClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    sunalert_core::init()?;
    let (config, _validation) = Config::load_validated()?;

    let store = SqliteHistoryStore::open(&config.storage.database_path)
        .context("Failed to open history database")?;
    let mirror = RestMirrorClient::new(
        &config.mirror.base_url,
        config.mirror.api_token.clone(),
        Duration::from_secs(config.mirror.timeout_secs),
    )
    .context("Failed to build mirror client")?;
    let coordinator = HistoryCoordinator::new(store, mirror);

    tracing::info!("SunAlert started");

    let command = cli.command.unwrap_or(Commands::Sync);

    // Catch up on records left Local-Only by earlier sessions. Only an
    // explicit sync waits for it; other commands never block on the mirror.
    if let Commands::Sync = command {
        let report = coordinator.sync_pending().await?;
        println!(
            "Mirrored {} of {} pending records ({} skipped)",
            report.mirrored, report.attempted, report.skipped
        );
    } else {
        coordinator.spawn_sync_pending();
    }

    match command {
        Commands::Sync | Commands::History => print_history(&coordinator).await?,
        Commands::Check { lat, lng, address } => {
            run_check(&config, &coordinator, Location::new(lat, lng), &address).await?
        }
        Commands::Attach { id, photo } => {
            coordinator.attach_photo(id, &photo).await?;
            println!("Photo attached to record {}", id);
        }
        Commands::Delete { id } => {
            coordinator.delete_record(id).await?;
            println!("Deleted record {}", id);
        }
        Commands::Clear => {
            coordinator.delete_all().await?;
            println!("Local history cleared");
        }
    }

    // Let background mirror work finish before the runtime goes away
    coordinator.wait_idle().await;
    tracing::info!("SunAlert finished");
    Ok(())
}

async fn run_check(
    config: &Config,
    coordinator: &Coordinator,
    location: Location,
    address: &str,
) -> Result<()> {
    let api_key = config
        .uv
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .context("No UV API key configured")?;
    let provider = UvProvider::with_base_url(
        api_key,
        &config.uv.api_url,
        Duration::from_secs(config.uv.timeout_secs),
    )?;

    let mut session = CheckSession::new();
    match session.run(&provider, coordinator, location, address).await {
        Ok(CheckOutcome::Recorded { id, reading }) => {
            let level = reading.risk_level();
            println!("UV index {:.1}: {} ({})", reading.uv, level.label(), level.color_hex());
            println!("{}", level.advice());
            if let (Some(max), Some(at)) = (reading.uv_max, reading.uv_max_at()) {
                println!("Peak today: {:.1} at {}", max, at.format("%H:%M UTC"));
            }
            println!("Saved as record {}", id);
        }
        Ok(CheckOutcome::Unchanged(reading)) => {
            println!("UV index {:.1} unchanged, nothing recorded", reading.uv);
        }
        Err(CheckError::Uv(e)) => {
            let (label, advice) = describe(None);
            println!("{}: {}", e.user_message(), e);
            println!("{}. {}", label, advice);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn print_history(coordinator: &Coordinator) -> Result<()> {
    let records = coordinator.history().await?;
    if records.is_empty() {
        println!("No UV checks recorded yet");
        return Ok(());
    }

    for record in &records {
        println!("{}", format_record(record));
    }
    Ok(())
}

fn format_record(record: &HistoryRecord) -> String {
    let when = chrono::DateTime::from_timestamp_millis(record.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.timestamp.to_string());
    let color = RiskLevel::from_label(&record.risk_category)
        .map(|level| level.color_hex())
        .unwrap_or("-");
    let state = if record.synced { "synced" } else { "local" };

    let mut line = format!(
        "#{:<4} {}  UV {:>4.1}  {} {}  [{}]  {}",
        record.id, when, record.uv_index, record.risk_category, color, state, record.address
    );
    if record.has_photo() {
        line.push_str("  (photo)");
    }
    if let Some(note) = &record.note {
        line.push_str(&format!("  \"{}\"", note));
    }
    line
}
