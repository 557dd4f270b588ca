//! Log-mel slice features.
//!
//! Turns one slice of 16-bit audio into `n_mels` quantized log energies:
//! Hann window, real FFT, triangular mel filterbank, natural log, then a
//! linear map of `[log_floor, log_ceiling]` onto the `i8` range.

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::Arc;
use tracing::debug;

use crate::window::{FeatureError, SliceExtractor, WindowSettings};

/// Added to filter energies before the log so silence stays finite
const LOG_OFFSET: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogMelConfig {
    pub sample_rate: u32,
    /// Samples analysed per slice; shorter input is used as-is
    pub window_length: usize,
    pub fft_size: usize,
    pub n_mels: usize,
    pub fmin: f32,
    pub fmax: f32,
    /// Log energy mapped to -128
    pub log_floor: f32,
    /// Log energy mapped to 127
    pub log_ceiling: f32,
}

impl Default for LogMelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            window_length: 480,
            fft_size: 512,
            n_mels: 40,
            fmin: 125.0,
            fmax: 7500.0,
            log_floor: -10.0,
            log_ceiling: 10.0,
        }
    }
}

impl LogMelConfig {
    /// Match the extractor to a window's slice geometry
    pub fn for_window(settings: &WindowSettings) -> Self {
        let window_length = settings.samples_per_slice();
        Self {
            sample_rate: settings.sample_rate,
            window_length,
            fft_size: window_length.next_power_of_two(),
            n_mels: settings.slice_size,
            fmax: (settings.sample_rate as f32 / 2.0).min(7500.0),
            ..Default::default()
        }
    }
}

/// Log-mel extractor with a pre-computed filterbank and FFT plan
pub struct LogMelExtractor {
    config: LogMelConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    mel_filterbank: Vec<Vec<f32>>,
    window: Vec<f32>,
    // Pre-allocated buffers
    fft_input: Vec<f32>,
    fft_output: Vec<Complex<f32>>,
    power_spec: Vec<f32>,
}

impl LogMelExtractor {
    pub fn new(config: LogMelConfig) -> Result<Self, FeatureError> {
        if config.window_length == 0 || config.window_length > config.fft_size {
            return Err(FeatureError::InvalidSettings(format!(
                "window length {} must be in 1..={}",
                config.window_length, config.fft_size
            )));
        }
        if config.n_mels == 0 || config.log_ceiling <= config.log_floor {
            return Err(FeatureError::InvalidSettings(format!(
                "{} mel bands over log range [{}, {}]",
                config.n_mels, config.log_floor, config.log_ceiling
            )));
        }

        let window: Vec<f32> = (0..config.window_length)
            .map(|i| {
                let denom = (config.window_length.max(2) - 1) as f32;
                0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos())
            })
            .collect();

        let n_bins = config.fft_size / 2 + 1;
        let mel_filterbank = create_mel_filterbank(
            config.n_mels,
            n_bins,
            config.sample_rate as f32,
            config.fmin,
            config.fmax,
        );

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.fft_size);

        debug!(
            "Log-mel extractor: {} bands, {}-point FFT over {} samples",
            config.n_mels, config.fft_size, config.window_length
        );

        Ok(Self {
            fft_input: vec![0.0; config.fft_size],
            fft_output: vec![Complex::new(0.0, 0.0); n_bins],
            power_spec: vec![0.0; n_bins],
            config,
            fft,
            mel_filterbank,
            window,
        })
    }

    pub fn config(&self) -> &LogMelConfig {
        &self.config
    }

    /// Map a log energy onto [-128, 127]
    fn quantize(&self, log_energy: f32) -> i8 {
        let range = self.config.log_ceiling - self.config.log_floor;
        let scaled = (log_energy - self.config.log_floor) / range * 255.0 - 128.0;
        scaled.round().clamp(-128.0, 127.0) as i8
    }
}

impl SliceExtractor for LogMelExtractor {
    fn reset(&mut self) -> Result<(), FeatureError> {
        self.fft_input.fill(0.0);
        self.power_spec.fill(0.0);
        Ok(())
    }

    fn extract_slice(&mut self, samples: &[i16], slice: &mut [i8]) -> Result<usize, FeatureError> {
        if samples.is_empty() {
            return Err(FeatureError::Extraction("empty audio".to_string()));
        }
        if slice.len() != self.config.n_mels {
            return Err(FeatureError::Extraction(format!(
                "slice holds {} values, extractor produces {}",
                slice.len(),
                self.config.n_mels
            )));
        }

        let used = samples.len().min(self.config.window_length);
        self.fft_input.fill(0.0);
        for (i, (&sample, &w)) in samples[..used].iter().zip(self.window.iter()).enumerate() {
            self.fft_input[i] = sample as f32 / 32768.0 * w;
        }

        self.fft
            .process(&mut self.fft_input, &mut self.fft_output)
            .map_err(|e| FeatureError::Extraction(format!("FFT failed: {}", e)))?;

        for (p, c) in self.power_spec.iter_mut().zip(self.fft_output.iter()) {
            *p = c.re * c.re + c.im * c.im;
        }

        for (value, filter) in slice.iter_mut().zip(self.mel_filterbank.iter()) {
            let energy: f32 = filter
                .iter()
                .zip(self.power_spec.iter())
                .map(|(f, p)| f * p)
                .sum();
            *value = self.quantize((energy + LOG_OFFSET).ln());
        }

        Ok(used)
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters equally spaced on the mel scale between `fmin` and `fmax`
fn create_mel_filterbank(
    n_mels: usize,
    n_fft_bins: usize,
    sample_rate: f32,
    fmin: f32,
    fmax: f32,
) -> Vec<Vec<f32>> {
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);

    let bin_points: Vec<f32> = (0..=n_mels + 1)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32)
        .map(|mel| (n_fft_bins as f32 - 1.0) * mel_to_hz(mel) / (sample_rate / 2.0))
        .collect();

    (0..n_mels)
        .map(|i| {
            let (left, center, right) = (bin_points[i], bin_points[i + 1], bin_points[i + 2]);
            (0..n_fft_bins)
                .map(|bin| {
                    let bin = bin as f32;
                    if bin >= left && bin < center {
                        (bin - left) / (center - left)
                    } else if bin >= center && bin <= right {
                        (right - bin) / (right - center)
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}
