use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use tracing::{debug, trace};

use crate::window::{AudioSource, FeatureError};

/// Calculate history capacity in samples for the given sample rate
pub fn calculate_history_capacity(sample_rate: u32, history_ms: u32) -> usize {
    ((sample_rate as u64 * history_ms as u64) / 1000).max(1) as usize
}

/// Recent audio addressed by stream time.
///
/// Samples are pushed as they arrive and the oldest are overwritten once the
/// ring is full. Timestamps count from the first sample ever pushed.
pub struct AudioHistory {
    ring: HeapRb<i16>,
    capacity: usize,
    sample_rate: u32,
    /// Samples pushed since creation, including overwritten ones
    total_written: u64,
    /// Contiguous copy handed out by `fetch_samples`
    scratch: Vec<i16>,
}

impl AudioHistory {
    pub fn new(sample_rate: u32, history_ms: u32) -> Self {
        let capacity = calculate_history_capacity(sample_rate, history_ms);
        debug!(
            "Audio history: {} samples ({}ms at {} Hz)",
            capacity, history_ms, sample_rate
        );
        Self {
            ring: HeapRb::new(capacity),
            capacity,
            sample_rate,
            total_written: 0,
            scratch: Vec::new(),
        }
    }

    /// Append samples, evicting the oldest when full
    pub fn push(&mut self, samples: &[i16]) {
        let retained = &samples[samples.len().saturating_sub(self.capacity)..];
        self.ring.push_slice_overwrite(retained);
        self.total_written += samples.len() as u64;
    }

    /// Stream time just past the newest sample
    pub fn latest_timestamp_ms(&self) -> i64 {
        (self.total_written * 1000 / self.sample_rate as u64) as i64
    }

    /// Stream position of the oldest retained sample
    pub fn oldest_sample(&self) -> u64 {
        self.total_written - self.ring.occupied_len() as u64
    }

    /// Number of samples currently retained
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn ms_to_samples(&self, ms: i64) -> u64 {
        (ms as u64).saturating_mul(self.sample_rate as u64) / 1000
    }
}

impl AudioSource for AudioHistory {
    fn fetch_samples(&mut self, start_ms: i64, duration_ms: i64) -> Result<&[i16], FeatureError> {
        if start_ms < 0 || duration_ms < 0 {
            return Err(FeatureError::AudioSource(format!(
                "invalid range {}ms + {}ms",
                start_ms, duration_ms
            )));
        }

        let start = self.ms_to_samples(start_ms);
        let end = start
            .saturating_add(self.ms_to_samples(duration_ms))
            .min(self.total_written);
        let oldest = self.oldest_sample();

        self.scratch.clear();
        if start < oldest {
            debug!(
                "Requested audio at {}ms was already overwritten (oldest sample {})",
                start_ms, oldest
            );
            return Ok(&self.scratch);
        }
        if start >= end {
            trace!("No buffered audio at {}ms", start_ms);
            return Ok(&self.scratch);
        }

        let offset = (start - oldest) as usize;
        let count = (end - start) as usize;
        self.scratch
            .extend(self.ring.iter().skip(offset).take(count).copied());
        Ok(&self.scratch)
    }
}
