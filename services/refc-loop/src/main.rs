//! HRRR composite reflectivity loop builder.
//!
//! One-shot batch: walks the forecast horizon of the latest published run,
//! fetching only the reflectivity message of each archive, and writes one
//! PNG per hour plus an animated GIF.
//!
//! Exit status: 0 when at least one frame was rendered, 2 when every hour
//! failed, 1 on configuration, setup or assembly errors.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use radar_common::parse_utc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use refc_loop::render::frame_renderer;
use refc_loop::{reference_run, ForecastWalker, GifAssembler, HttpArchive, RunConfig, RunStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug)]
#[command(name = "refc-loop")]
#[command(about = "Build an HRRR composite reflectivity loop from ranged archive fetches")]
struct Args {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(short, long, env = "REFC_LOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for frames, the loop and the run summary
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Hours subtracted from the current time to pick the model run
    #[arg(long)]
    offset_hours: Option<u32>,

    /// Number of forecast hours to process
    #[arg(long)]
    horizon_hours: Option<u32>,

    /// Forecast hours fetched and decoded at once
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Model run time (RFC 3339) to rebuild instead of `now - offset`
    #[arg(long)]
    reference_time: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,

    /// Keep staged payloads after decoding
    #[arg(long)]
    keep_staging: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level, args.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(1);
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            let reason = format!("{:#}", e);
            error!(error = %reason, "Run aborted");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.with_thread_ids(true).json().finish())?
        }
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }
    Ok(())
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(offset) = args.offset_hours {
        config.schedule.offset_hours = offset;
    }
    if let Some(horizon) = args.horizon_hours {
        config.schedule.horizon_hours = horizon;
    }
    if let Some(n) = args.max_concurrent {
        config.schedule.max_concurrent = n;
    }
    config.validate()?;

    let reference = match &args.reference_time {
        Some(s) => {
            let run_time = parse_utc(s).context("Invalid --reference-time")?;
            reference_run(run_time, 0)
        }
        None => reference_run(Utc::now(), config.schedule.offset_hours),
    };

    info!(
        reference = %reference,
        output_dir = %config.output_dir.display(),
        root_url = %config.source.root_url,
        "Starting reflectivity loop"
    );

    let output_dir = config.output_dir.clone();
    let source = HttpArchive::new(config.source.clone(), &config.http)?;
    let renderer = frame_renderer(&config.render, &output_dir);
    let assembler = GifAssembler::new(&output_dir);

    let walker = ForecastWalker::new(config, Arc::new(source), Arc::new(renderer), Arc::new(assembler))
        .keep_staging(args.keep_staging);

    let summary = walker.run(reference).await?;
    summary.log();

    match summary.write_json(&output_dir) {
        Ok(path) => info!(path = %path.display(), "Wrote run summary"),
        Err(e) => warn!(error = %e, "Failed to write run summary"),
    }

    if summary.assembly_error.is_some() {
        return Ok(ExitCode::from(1));
    }
    Ok(match summary.status() {
        RunStatus::Complete | RunStatus::Partial => ExitCode::SUCCESS,
        RunStatus::AllFailed => ExitCode::from(2),
    })
}
