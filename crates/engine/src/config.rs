use crate::codec::Codec;
use crate::intent::{MAX_THREADS, MIN_THREADS};
use crate::quality::{MAX_QUANTIZER, MIN_QUANTIZER};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Defaults for every encode, overridable per run from the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub codec: Codec,
    pub crf: i32,
    pub crf_tolerance: u32,
    pub audio_bitrate_kbps: u32,
    pub two_pass: bool,
    pub row_multithreading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            codec: Codec::Vp9,
            crf: 40,
            crf_tolerance: 2,
            audio_bitrate_kbps: 96,
            two_pass: true,
            row_multithreading: true,
            threads: None,
        }
    }
}

pub fn load_config(path: Option<&std::path::Path>) -> Result<EncoderConfig> {
    let config = if let Some(config_path) = path {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

            toml::from_str::<EncoderConfig>(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", config_path);
            EncoderConfig::default()
        }
    } else {
        tracing::debug!("No config path provided, using defaults");
        EncoderConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &EncoderConfig) -> Result<()> {
    if config.ffmpeg_bin.as_os_str().is_empty() {
        anyhow::bail!("ffmpeg_bin cannot be empty");
    }

    if config.ffprobe_bin.as_os_str().is_empty() {
        anyhow::bail!("ffprobe_bin cannot be empty");
    }

    if !(MIN_QUANTIZER..=MAX_QUANTIZER).contains(&config.crf) {
        anyhow::bail!("crf must be between {} and {}", MIN_QUANTIZER, MAX_QUANTIZER);
    }

    if config.crf_tolerance > MAX_QUANTIZER as u32 {
        anyhow::bail!("crf_tolerance must be at most {}", MAX_QUANTIZER);
    }

    if let Some(threads) = config.threads {
        if !(MIN_THREADS..=MAX_THREADS).contains(&threads) {
            anyhow::bail!("threads must be between {} and {}", MIN_THREADS, MAX_THREADS);
        }
    }

    Ok(())
}
