// WebM encoding command engine

pub mod codec;
pub mod command;
pub mod config;
pub mod encode;
pub mod error;
pub mod filters;
pub mod intent;
pub mod options;
pub mod probe;
pub mod quality;
pub mod startup;
pub mod timestamp;

// Re-export commonly used types
pub use codec::Codec;
pub use command::Command;
pub use config::EncoderConfig;
pub use encode::{run_encode, EncodeJob, FfmpegRunner, ProcessRunner};
pub use error::EncodeError;
pub use intent::EncodingIntent;
pub use options::IntentOptions;
