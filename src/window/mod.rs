//! Rolling spectrogram window.
//!
//! Keeps a fixed number of feature slices covering the most recent audio and
//! refreshes only the slices that went stale since the previous update:
//! 1. Quantize both timestamps onto the stride grid
//! 2. Shift the slices that are still valid toward the front
//! 3. Fetch audio and extract features for the newly opened tail slots

pub mod settings;
pub mod sliding;
pub mod sources;

pub use settings::WindowSettings;
pub use sliding::{SlidingFeatureWindow, UpdatePlan, WindowPhase};
pub use sources::{AudioSource, CollectingReporter, ErrorReporter, SliceExtractor, TracingReporter};

use thiserror::Error;

/// Errors that abort a window update
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("Requested feature data size {requested} doesn't match {expected}")]
    ConfigMismatch { requested: usize, expected: usize },

    #[error("Audio data size {got} too small, want {want}")]
    InsufficientSamples { got: usize, want: usize },

    #[error("Feature extraction failed: {0}")]
    Extraction(String),

    #[error("Audio source error: {0}")]
    AudioSource(String),

    #[error("Invalid window settings: {0}")]
    InvalidSettings(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FeatureError::ConfigMismatch {
            requested: 100,
            expected: 1960,
        };
        assert_eq!(
            err.to_string(),
            "Requested feature data size 100 doesn't match 1960"
        );

        let err = FeatureError::InsufficientSamples { got: 12, want: 480 };
        assert_eq!(err.to_string(), "Audio data size 12 too small, want 480");
    }
}
