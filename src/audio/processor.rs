use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::history::AudioHistory;
use crate::config::Config;
use crate::features::LogMelExtractor;
use crate::report::UpdateRecord;
use crate::window::SlidingFeatureWindow;

/// Message from processing thread
#[derive(Debug)]
pub enum ProcessorMessage {
    /// Window updated for a new chunk of audio
    Update(UpdateRecord),
    /// Processing status update
    Status { audio_clock_ms: i64, updates: usize },
    /// Processing thread stopped
    Stopped,
    /// Error occurred
    Error(String),
}

/// Audio processing thread configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub config: Config,
    /// Sleep for each chunk's duration to mimic a live stream
    pub realtime: bool,
    pub status_interval_ms: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            config: Config::default(),
            realtime: false,
            status_interval_ms: 500,
        }
    }
}

/// Run the audio processing thread
///
/// This function should be spawned in a separate thread. It replays `pcm`
/// chunk by chunk into an audio history and brings the feature window up to
/// date after every chunk.
pub fn run_processor(
    pcm: Vec<i16>,
    config: ProcessorConfig,
    tx: mpsc::Sender<ProcessorMessage>,
    stop_flag: Arc<AtomicBool>,
) {
    let result = run_processor_inner(&pcm, config, &tx, stop_flag);

    if let Err(e) = result {
        let _ = tx.blocking_send(ProcessorMessage::Error(e.to_string()));
    }

    let _ = tx.blocking_send(ProcessorMessage::Stopped);
}

fn run_processor_inner(
    pcm: &[i16],
    config: ProcessorConfig,
    tx: &mpsc::Sender<ProcessorMessage>,
    stop_flag: Arc<AtomicBool>,
) -> Result<()> {
    let settings = config.config.window;
    settings.validate()?;
    info!(
        "Starting feature processor: {} slices x {} values, {}ms stride",
        settings.slice_count, settings.slice_size, settings.stride_ms
    );

    let mut history = AudioHistory::new(settings.sample_rate, config.config.history_ms);
    let mut extractor = LogMelExtractor::new(config.config.log_mel())?;

    let mut features = vec![0i8; settings.element_count()];
    let mut window = SlidingFeatureWindow::new(settings, settings.element_count(), &mut features);

    let chunk_samples =
        (config.config.chunk_ms as u64 * settings.sample_rate as u64 / 1000).max(1) as usize;
    let chunk_duration = Duration::from_millis(config.config.chunk_ms as u64);

    // Status tracking
    let mut last_status_time = Instant::now();
    let status_interval = Duration::from_millis(config.status_interval_ms);
    let mut previous_time_ms = 0i64;
    let mut updates = 0usize;

    for chunk in pcm.chunks(chunk_samples) {
        if stop_flag.load(Ordering::Relaxed) {
            info!("Stop flag received, ending replay");
            break;
        }

        history.push(chunk);

        // The newest slice needs a full slice of audio after its start time
        let current_time_ms =
            (history.latest_timestamp_ms() - settings.slice_duration_ms).max(0);

        let new_slices = window.update(
            &mut history,
            &mut extractor,
            previous_time_ms,
            current_time_ms,
        )?;
        previous_time_ms = current_time_ms;
        updates += 1;

        let newest = window
            .slice(settings.slice_count - 1)
            .unwrap_or_default();
        let record = UpdateRecord::new(current_time_ms, new_slices, newest);
        debug!(
            "Window at {}ms: {} new slices",
            record.time_ms, record.new_slices
        );
        if tx.blocking_send(ProcessorMessage::Update(record)).is_err() {
            warn!("Failed to send update, receiver dropped");
            return Ok(());
        }

        if last_status_time.elapsed() >= status_interval {
            let _ = tx.blocking_send(ProcessorMessage::Status {
                audio_clock_ms: history.latest_timestamp_ms(),
                updates,
            });
            last_status_time = Instant::now();
        }

        if config.realtime {
            std::thread::sleep(chunk_duration);
        }
    }

    info!("Feature processor stopped after {} updates", updates);
    Ok(())
}
