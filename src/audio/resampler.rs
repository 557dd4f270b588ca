use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};
use tracing::debug;

/// Sample rate the feature window expects by default
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Audio resampler wrapper for converting file sample rate to the window rate
pub struct AudioResampler {
    resampler: FftFixedIn<f32>,
    input_buffer: Vec<Vec<f32>>,
    output_buffer: Vec<Vec<f32>>,
    input_frames: usize,
    input_rate: u32,
    output_rate: u32,
}

impl AudioResampler {
    /// Create a new mono resampler from `input_rate` to `output_rate`
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        let ratio = output_rate as f64 / input_rate as f64;

        debug!(
            "Creating resampler: {} Hz -> {} Hz (ratio: {:.4})",
            input_rate, output_rate, ratio
        );

        // Use 1024 input frames as a reasonable chunk size
        let input_frames = 1024;
        let channels = 1; // Mono

        let resampler = FftFixedIn::new(
            input_rate as usize,
            output_rate as usize,
            input_frames,
            2, // sub_chunks for quality
            channels,
        )
        .context("Failed to create resampler")?;

        // Pre-allocate buffers
        let input_buffer = vec![vec![0.0f32; input_frames]; channels];
        let output_buffer = resampler.output_buffer_allocate(true);

        Ok(Self {
            resampler,
            input_buffer,
            output_buffer,
            input_frames,
            input_rate,
            output_rate,
        })
    }

    /// Get the number of input frames needed for the next process call
    pub fn input_frames_next(&self) -> usize {
        self.input_frames
    }

    /// Process input samples and return resampled output
    ///
    /// Input must be exactly `input_frames_next()` samples.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_frames {
            anyhow::bail!(
                "Input length {} doesn't match expected {}",
                input.len(),
                self.input_frames
            );
        }

        // Copy input to buffer
        self.input_buffer[0].copy_from_slice(input);

        // Process
        let (_, output_frames) = self
            .resampler
            .process_into_buffer(&self.input_buffer, &mut self.output_buffer, None)
            .context("Resampling failed")?;

        // Extract output
        Ok(self.output_buffer[0][..output_frames].to_vec())
    }

    /// Resample a whole recording.
    ///
    /// The tail is zero padded to a full chunk, the filter delay is trimmed
    /// from the front and the result is cut to the length implied by the
    /// rate ratio.
    pub fn process_all(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let expected_len =
            (input.len() as u64 * self.output_rate as u64 / self.input_rate as u64) as usize;
        let delay = self.resampler.output_delay();

        let mut output = Vec::with_capacity(expected_len + delay + self.input_frames);
        let mut chunk = vec![0.0f32; self.input_frames];
        let mut consumed = 0;

        while output.len() < expected_len + delay {
            chunk.fill(0.0);
            if consumed < input.len() {
                let end = (consumed + self.input_frames).min(input.len());
                chunk[..end - consumed].copy_from_slice(&input[consumed..end]);
                consumed = end;
            }
            let resampled = self.process(&chunk)?;
            if resampled.is_empty() && consumed >= input.len() {
                break;
            }
            output.extend_from_slice(&resampled);
        }

        let start = delay.min(output.len());
        let end = (start + expected_len).min(output.len());
        Ok(output[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resampler_48k_to_16k() {
        let mut resampler =
            AudioResampler::new(48000, TARGET_SAMPLE_RATE).expect("Failed to create resampler");

        // FFT-based resamplers have latency, so process multiple chunks
        let input = vec![0.0f32; resampler.input_frames_next()];
        let mut total_output = 0;
        let mut total_input = 0;

        for _ in 0..5 {
            let output = resampler.process(&input).expect("Resampling failed");
            total_output += output.len();
            total_input += input.len();
        }

        let expected_ratio = 16000.0 / 48000.0;
        let actual_ratio = total_output as f64 / total_input as f64;
        assert!(
            (actual_ratio - expected_ratio).abs() < 0.1,
            "Expected ratio ~{:.3}, got {:.3}",
            expected_ratio,
            actual_ratio
        );
    }

    #[test]
    fn test_process_all_length() {
        let mut resampler =
            AudioResampler::new(44100, TARGET_SAMPLE_RATE).expect("Failed to create resampler");

        // One second of audio
        let input = vec![0.25f32; 44100];
        let output = resampler.process_all(&input).expect("Resampling failed");
        assert_eq!(output.len(), 16000);
    }

    #[test]
    fn test_wrong_chunk_length_rejected() {
        let mut resampler =
            AudioResampler::new(48000, TARGET_SAMPLE_RATE).expect("Failed to create resampler");
        assert!(resampler.process(&[0.0; 10]).is_err());
    }
}
