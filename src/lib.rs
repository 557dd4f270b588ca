//! Sliding spectrogram features for streaming audio classification.
//!
//! [`window::SlidingFeatureWindow`] keeps the most recent slices of log-mel
//! features and recomputes only the ones that went stale since the last
//! update. The [`audio`] and [`features`] modules provide the audio history
//! and the extractor it pulls from.

pub mod audio;
pub mod config;
pub mod features;
pub mod report;
pub mod window;

pub use config::Config;
pub use window::{FeatureError, SlidingFeatureWindow, WindowSettings};
