pub mod log_mel;

pub use log_mel::{LogMelConfig, LogMelExtractor};
