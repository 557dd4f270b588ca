//! Collaborators the window drives during a refresh.

use std::sync::{Arc, Mutex};
use tracing::error;

use super::FeatureError;

/// Supplies raw 16-bit audio for a time range
pub trait AudioSource {
    /// Return samples covering `duration_ms` starting at `start_ms`.
    ///
    /// May return fewer samples than the range holds when the audio is not
    /// buffered; the caller checks the count before use.
    fn fetch_samples(&mut self, start_ms: i64, duration_ms: i64) -> Result<&[i16], FeatureError>;
}

/// Computes one slice of feature values from raw audio
pub trait SliceExtractor {
    /// Called once before the first slice of a cold window is computed
    fn reset(&mut self) -> Result<(), FeatureError> {
        Ok(())
    }

    /// Write `slice.len()` feature values computed from `samples` into `slice`,
    /// returning the number of samples consumed
    fn extract_slice(&mut self, samples: &[i16], slice: &mut [i8]) -> Result<usize, FeatureError>;
}

/// Sink for fatal diagnostics
pub trait ErrorReporter {
    fn report(&self, message: &str);
}

/// Reports through `tracing` at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, message: &str) {
        error!("{}", message);
    }
}

/// Keeps every reported message, for callers that surface them later
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages reported so far, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

impl<T: ErrorReporter + ?Sized> ErrorReporter for &T {
    fn report(&self, message: &str) {
        (**self).report(message)
    }
}
