pub mod history;
pub mod processor;
pub mod resampler;
pub mod wav;

pub use history::{calculate_history_capacity, AudioHistory};
pub use processor::{run_processor, ProcessorConfig, ProcessorMessage};
pub use resampler::{AudioResampler, TARGET_SAMPLE_RATE};
pub use wav::{load_pcm16, read_wav, to_pcm16, DecodedAudio};
