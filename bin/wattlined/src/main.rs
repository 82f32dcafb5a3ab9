//! ---
//! wl_section: "01-core-functionality"
//! wl_subsection: "binary"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Binary entrypoint for the WattLine daemon."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{debug, info, warn};
use wattline_common::{init_tracing, AppConfig, DeviceSample};
use wattline_engine::{append_and_trim, round_to};
use wattline_export::{export_window_to_path, DEFAULT_EXPORT_NAME};
use wattline_stream::{DriverSettings, JsonlSource, PlaybackDriver, SampleGenerator};

#[derive(Debug, Parser)]
#[command(author, version, about = "WattLine telemetry daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Replay the sample stream and log KPI / insight snapshots")]
    Run {
        #[arg(long, value_name = "FILE", help = "Override the configured sample stream")]
        source: Option<PathBuf>,
        #[arg(long, help = "Override the configured window span in minutes")]
        window_minutes: Option<i64>,
    },
    #[command(about = "Replay the stream without pacing and export the final window as CSV")]
    Export {
        #[arg(long, value_name = "FILE", help = "Override the configured sample stream")]
        source: Option<PathBuf>,
        #[arg(long, value_name = "FILE", default_value = DEFAULT_EXPORT_NAME)]
        output: PathBuf,
        #[arg(long, help = "Override the configured window span in minutes")]
        window_minutes: Option<i64>,
    },
    #[command(about = "Write a synthetic JSONL sample stream")]
    Generate {
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
        #[arg(long, default_value_t = 3600)]
        samples: usize,
        #[arg(long, default_value_t = 0xA11CE)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/wattline.toml"));
    candidates.push(PathBuf::from("configs/example.dev.toml"));

    let env_override = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    let mut config = if env_override || candidates.iter().any(|p| p.exists()) {
        let loaded = AppConfig::load_with_source(&candidates)?;
        init_tracing("wattlined", &loaded.config.logging)?;
        info!(config_path = %loaded.source.display(), "configuration loaded");
        loaded.config
    } else {
        let config = AppConfig::default();
        init_tracing("wattlined", &config.logging)?;
        warn!("no configuration file found; using built-in defaults");
        config
    };

    match cli.command.unwrap_or(Commands::Run {
        source: None,
        window_minutes: None,
    }) {
        Commands::Run {
            source,
            window_minutes,
        } => {
            apply_overrides(&mut config, source, window_minutes)?;
            run_stream(config).await
        }
        Commands::Export {
            source,
            window_minutes,
            output,
        } => {
            apply_overrides(&mut config, source, window_minutes)?;
            export_final_window(&config, &output)
        }
        Commands::Generate {
            output,
            samples,
            seed,
        } => generate_stream(&output, samples, seed),
    }
}

fn apply_overrides(
    config: &mut AppConfig,
    source: Option<PathBuf>,
    window_minutes: Option<i64>,
) -> Result<()> {
    if let Some(path) = source {
        config.stream.source = path;
    }
    if let Some(minutes) = window_minutes {
        config.window.minutes = minutes;
    }
    config.validate()
}

async fn run_stream(config: AppConfig) -> Result<()> {
    let source = JsonlSource::open(&config.stream.source)
        .with_context(|| format!("acquisition failed for {}", config.stream.source.display()))?;
    info!(
        source = %config.stream.source.display(),
        window_minutes = config.window.minutes,
        playback_ms = config.stream.playback_interval.as_millis() as u64,
        "starting playback"
    );

    let handle = PlaybackDriver::spawn(source, DriverSettings::from_config(&config));
    let mut snapshots = handle.snapshots();
    let mut status_ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    let mut was_stale = false;
    let mut last_insight_count = 0usize;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("ctrl-c received; shutting down");
                handle.shutdown().await?;
                return Ok(());
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    let last = snapshots.borrow().clone();
                    log_final_summary(&last);
                    handle.wait().await?;
                    return Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                debug!(
                    window = snapshot.window.len(),
                    avg_kw = round_to(snapshot.kpis.average_kw, 2),
                    energy_kwh = round_to(snapshot.kpis.energy_kwh, 2),
                    uptime_pct = round_to(snapshot.kpis.uptime_pct, 1),
                    "snapshot received"
                );
                if snapshot.insights.len() != last_insight_count {
                    info!(count = snapshot.insights.len(), "insight list changed");
                    for insight in &snapshot.insights {
                        info!(id = %insight.id, severity = %insight.severity, "{}", insight.description);
                    }
                    last_insight_count = snapshot.insights.len();
                }
            }
            _ = status_ticker.tick() => {
                let status = handle.feed_status();
                if status.is_stale() && !was_stale {
                    warn!(%status, "feed went stale");
                    was_stale = true;
                } else if !status.is_stale() && was_stale {
                    info!(%status, "feed recovered");
                    was_stale = false;
                }
            }
        }
    }
}

fn log_final_summary(snapshot: &wattline_engine::EngineSnapshot) {
    let kpis = &snapshot.kpis;
    info!(
        window = snapshot.window.len(),
        uptime_pct = round_to(kpis.uptime_pct, 1),
        idle_pct = round_to(kpis.idle_pct, 1),
        off_pct = round_to(kpis.off_pct, 1),
        avg_kw = round_to(kpis.average_kw, 2),
        energy_kwh = round_to(kpis.energy_kwh, 2),
        pf_average = round_to(kpis.pf_average, 3),
        units_per_min = round_to(kpis.throughput.units_per_min, 2),
        insights = snapshot.insights.len(),
        "stream ended"
    );
}

fn export_final_window(config: &AppConfig, output: &Path) -> Result<()> {
    let source = JsonlSource::open(&config.stream.source)
        .with_context(|| format!("acquisition failed for {}", config.stream.source.display()))?;
    let span = config.window.duration();
    let mut window: Vec<DeviceSample> = Vec::new();
    for sample in source {
        window = append_and_trim(&window, sample, span);
    }
    export_window_to_path(&window, output)
        .with_context(|| format!("unable to export window to {}", output.display()))?;
    info!(rows = window.len(), output = %output.display(), "window exported");
    Ok(())
}

fn generate_stream(output: &Path, samples: usize, seed: u64) -> Result<()> {
    let mut generator = SampleGenerator::new(seed, Utc::now());
    let file = File::create(output)
        .with_context(|| format!("unable to create output file {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    for sample in generator.take_samples(samples) {
        serde_json::to_writer(&mut writer, &sample)
            .with_context(|| "failed to serialise sample")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!(samples, seed, output = %output.display(), "synthetic stream written");
    Ok(())
}
