use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid number of threads: {0} (must be between 1 and 16)")]
    InvalidThreadCount(usize),
    #[error("invalid codec specified: {0:?} (expected vp8, vp9 or av1)")]
    InvalidCodec(String),
    #[error("crf {0} is not between 0 and 63")]
    InvalidQualityTarget(i32),
    #[error("framerate is too low: {0}")]
    InvalidFrameRate(f64),
    #[error("invalid resize resolution: {0:?}")]
    InvalidResize(String),
    #[error("invalid crop dimensions: {0:?}")]
    InvalidCrop(String),
    #[error("invalid dub: {0}")]
    InvalidDub(String),
    #[error("trim duration is negative ({0:.3}s)")]
    NegativeTrimDuration(f64),
    #[error("audio bitrate is too low: {0}kbps")]
    InvalidAudioBitrate(u32),
    #[error("audio track {index} does not exist (input has {available} audio streams)")]
    InvalidAudioTrack { index: usize, available: usize },
    #[error("failed to parse trim time {0:?}, expected HH:MM:SS.MS, HH:MM:SS or S")]
    TimestampParse(String),
    #[error("ffmpeg pass {pass} failed: {detail}")]
    ExternalProcess { pass: u8, detail: String },
    #[error("failed to create pass log file: {0}")]
    TempFile(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EncodeError>;
