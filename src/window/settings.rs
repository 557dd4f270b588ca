//! Geometry and timing of the feature window.

use serde::{Deserialize, Serialize};

use super::FeatureError;

/// Shape of the rolling spectrogram and the timing of its slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Feature values per slice (mel bands)
    pub slice_size: usize,
    /// Number of slices held by the window
    pub slice_count: usize,
    /// Time between the starts of consecutive slices
    pub stride_ms: i64,
    /// Length of audio each slice is computed from
    pub slice_duration_ms: i64,
    /// Sample rate the audio source delivers
    pub sample_rate: u32,
    /// Fewest samples the extractor accepts for one slice
    pub min_audio_samples: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            slice_size: 40,
            slice_count: 49,
            stride_ms: 20,
            slice_duration_ms: 30,
            sample_rate: 16000,
            min_audio_samples: 480, // 30ms at 16kHz
        }
    }
}

impl WindowSettings {
    /// Total number of feature values in the window (slice_size * slice_count).
    ///
    /// Saturates for geometries that `validate` rejects.
    pub fn element_count(&self) -> usize {
        self.slice_size.saturating_mul(self.slice_count)
    }

    /// Duration covered by the whole window, from the oldest slice start
    /// to the newest slice end
    pub fn window_duration_ms(&self) -> i64 {
        (self.slice_count as i64 - 1)
            .saturating_mul(self.stride_ms)
            .saturating_add(self.slice_duration_ms)
    }

    /// Samples in one slice's audio window
    pub fn samples_per_slice(&self) -> usize {
        ((self.slice_duration_ms.max(0) as u64).saturating_mul(self.sample_rate as u64) / 1000)
            as usize
    }

    /// Quantize a timestamp onto the stride grid (truncating)
    pub fn step_for(&self, time_ms: i64) -> i64 {
        time_ms / self.stride_ms
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.slice_size == 0 || self.slice_count == 0 {
            return Err(FeatureError::InvalidSettings(format!(
                "window must hold at least one value, got {} x {}",
                self.slice_count, self.slice_size
            )));
        }
        if self.slice_size.checked_mul(self.slice_count).is_none() {
            return Err(FeatureError::InvalidSettings(format!(
                "window of {} x {} values is too large",
                self.slice_count, self.slice_size
            )));
        }
        if self.stride_ms <= 0 {
            return Err(FeatureError::InvalidSettings(format!(
                "stride must be positive, got {}ms",
                self.stride_ms
            )));
        }
        if self.slice_duration_ms < self.stride_ms {
            return Err(FeatureError::InvalidSettings(format!(
                "slice duration {}ms is shorter than stride {}ms",
                self.slice_duration_ms, self.stride_ms
            )));
        }
        if self.sample_rate == 0 {
            return Err(FeatureError::InvalidSettings(
                "sample rate must be positive".to_string(),
            ));
        }
        if self.min_audio_samples > self.samples_per_slice() {
            return Err(FeatureError::InvalidSettings(format!(
                "minimum of {} samples exceeds the {} in one slice",
                self.min_audio_samples,
                self.samples_per_slice()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let settings = WindowSettings::default();
        assert_eq!(settings.element_count(), 1960);
        assert_eq!(settings.samples_per_slice(), 480);
        assert_eq!(settings.window_duration_ms(), 990);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_step_truncates() {
        let settings = WindowSettings::default();
        assert_eq!(settings.step_for(500), 25);
        assert_eq!(settings.step_for(519), 25);
        assert_eq!(settings.step_for(540), 27);
        assert_eq!(settings.step_for(0), 0);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let zero_stride = WindowSettings {
            stride_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_stride.validate(),
            Err(FeatureError::InvalidSettings(_))
        ));

        let empty = WindowSettings {
            slice_count: 0,
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let short = WindowSettings {
            slice_duration_ms: 10,
            ..Default::default()
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unreachable_sample_minimum() {
        let settings = WindowSettings {
            min_audio_samples: 481,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(FeatureError::InvalidSettings(_))
        ));

        let resampled = WindowSettings {
            sample_rate: 8000,
            ..Default::default()
        };
        assert_eq!(resampled.samples_per_slice(), 240);
        assert!(resampled.validate().is_err());

        let exact = WindowSettings {
            sample_rate: 8000,
            min_audio_samples: 240,
            ..Default::default()
        };
        assert!(exact.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_window() {
        let settings: WindowSettings = serde_json::from_str(&format!(
            r#"{{"slice_size": {}, "slice_count": 3}}"#,
            usize::MAX / 2
        ))
        .unwrap();
        assert_eq!(settings.element_count(), usize::MAX);
        assert!(matches!(
            settings.validate(),
            Err(FeatureError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: WindowSettings = serde_json::from_str(r#"{"slice_count": 10}"#).unwrap();
        assert_eq!(settings.slice_count, 10);
        assert_eq!(settings.slice_size, 40);
    }
}
