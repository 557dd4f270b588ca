use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use feature_window::audio::{load_pcm16, run_processor, ProcessorConfig, ProcessorMessage};
use feature_window::config::{Config, OutputFormat};
use feature_window::report::{SessionReport, UpdateRecord};

/// Replay a WAV file through the sliding feature window
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input WAV file
    input: PathBuf,

    /// Path to a JSON config file (defaults to ~/.feature-window/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Audio fed between window updates (ms)
    #[arg(long)]
    chunk_ms: Option<u32>,

    /// Output format: "text" or "json"
    #[arg(short, long)]
    output: Option<OutputFormat>,

    /// Pace the replay at the speed of the recording
    #[arg(long)]
    realtime: bool,

    /// Write the session report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the effective config to the config path and exit
    #[arg(long)]
    save_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    if let Some(chunk_ms) = args.chunk_ms {
        config.chunk_ms = chunk_ms;
    }
    if let Some(output) = args.output {
        config.output_format = output;
    }
    config.validate().context("Invalid configuration")?;

    if args.save_config {
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        config.save(&config_path)?;
        println!("Saved config to {:?}", config_path);
        return Ok(());
    }

    info!("Feature window replay starting...");
    info!("Input: {:?}", args.input);
    info!(
        "Window: {} slices x {} values, {}ms stride, {}ms chunks",
        config.window.slice_count, config.window.slice_size, config.window.stride_ms, config.chunk_ms
    );

    let pcm = load_pcm16(&args.input, config.window.sample_rate)?;
    debug!("Decoded {} samples", pcm.len());

    let output_format = config.output_format;
    let processor_config = ProcessorConfig {
        config,
        realtime: args.realtime,
        status_interval_ms: 1000,
    };

    // Create channels
    let (tx, mut rx) = mpsc::channel::<ProcessorMessage>(32);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();

    // Spawn processor thread
    let processor_handle = std::thread::spawn(move || {
        run_processor(pcm, processor_config, tx, stop_flag_clone);
    });

    // Set up Ctrl+C handler
    let stop_flag_ctrlc = stop_flag.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, stopping...");
        stop_flag_ctrlc.store(true, Ordering::SeqCst);
    });

    let mut session = SessionReport::new(args.input.display().to_string());

    while let Some(msg) = rx.recv().await {
        match msg {
            ProcessorMessage::Update(record) => {
                print_update(&record, output_format)?;
                session.add_update(record);
            }

            ProcessorMessage::Status {
                audio_clock_ms,
                updates,
            } => {
                debug!(
                    "Status: {:.1}s replayed, {} updates",
                    audio_clock_ms as f64 / 1000.0,
                    updates
                );
            }

            ProcessorMessage::Error(e) => {
                error!("Processor error: {}", e);
                session.error = Some(e);
            }

            ProcessorMessage::Stopped => {
                info!("Processor stopped");
                break;
            }
        }
    }

    // Wait for processor thread
    let _ = processor_handle.join();

    session.finalize();

    if output_format == OutputFormat::Text {
        println!("\n--- Session Summary ---");
        println!("Audio: {:.2}s", session.audio_duration_ms as f64 / 1000.0);
        println!("Updates: {}", session.updates.len());
        println!("Slices computed: {}", session.total_new_slices);
        println!("Mean slices per update: {:.2}", session.mean_new_slices());
    }

    if let Some(path) = &args.report {
        let content =
            serde_json::to_string_pretty(&session).context("Failed to serialize report")?;
        std::fs::write(path, content).context("Failed to write report")?;
        info!("Report written to {:?}", path);
    }

    if let Some(e) = &session.error {
        anyhow::bail!("Replay aborted: {}", e);
    }

    info!("Session complete");
    Ok(())
}

fn print_update(record: &UpdateRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!(
                "[{:02}:{:02}.{:03}] {:2} new slices, newest mean {:7.2}",
                record.time_ms / 60000,
                (record.time_ms % 60000) / 1000,
                record.time_ms % 1000,
                record.new_slices,
                record.newest_slice_mean
            );
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).context("Failed to serialize update")?
            );
        }
    }
    Ok(())
}
