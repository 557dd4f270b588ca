use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::{debug, info};

use super::resampler::AudioResampler;

/// Mono audio decoded from a file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Read a WAV file as mono f32 in [-1.0, 1.0]
///
/// Multi-channel files keep the first channel only.
pub fn read_wav(path: &Path) -> Result<DecodedAudio> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {:?}", path))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    debug!(
        "WAV {:?}: {} Hz, {} channels, {} bits {:?}",
        path, spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
    );

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read float samples")?,
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read 8-bit samples")?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read 16-bit samples")?,
        (SampleFormat::Int, bits @ (24 | 32)) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read integer samples")?
        }
        (format, bits) => anyhow::bail!("Unsupported WAV format: {:?} {} bits", format, bits),
    };

    let samples = interleaved.chunks(channels).map(|frame| frame[0]).collect();

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Convert f32 samples to 16-bit PCM, clipping out-of-range values
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect()
}

/// Load a WAV file as 16-bit mono PCM at `target_rate`
pub fn load_pcm16(path: &Path, target_rate: u32) -> Result<Vec<i16>> {
    let decoded = read_wav(path)?;
    info!(
        "Loaded {:?}: {:.1}s at {} Hz",
        path,
        decoded.duration_ms() as f64 / 1000.0,
        decoded.sample_rate
    );

    let samples = if decoded.sample_rate == target_rate {
        decoded.samples
    } else {
        let mut resampler = AudioResampler::new(decoded.sample_rate, target_rate)?;
        resampler.process_all(&decoded.samples)?
    };

    Ok(to_pcm16(&samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_wav(path: &Path, spec: WavSpec, frames: usize) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for channel in 0..spec.channels {
                let value = if channel == 0 { (i % 100) as i16 * 100 } else { -1000 };
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_to_pcm16_clips() {
        assert_eq!(to_pcm16(&[0.0, 1.0, -1.0, 2.0]), vec![0, 32767, -32767, 32767]);
    }

    #[test]
    fn test_read_stereo_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, 1600);

        let decoded = read_wav(&path).unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.samples.len(), 1600);
        assert_eq!(decoded.duration_ms(), 100);
        assert!((decoded.samples[1] - 100.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_pcm16_resamples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("48k.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, 48000);

        let pcm = load_pcm16(&path, 16000).unwrap();
        assert_eq!(pcm.len(), 16000);
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(read_wav(Path::new("/nonexistent/audio.wav")).is_err());
    }
}
