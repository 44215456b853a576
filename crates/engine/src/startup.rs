use crate::codec::Codec;
use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Command;

// Matches "ffmpeg version 6.1.1", "ffmpeg version n7.0" and similar
static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ffmpeg version[^\d]*(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex")
});

pub fn check_ffmpeg_version(ffmpeg: &Path) -> Result<(u32, u32, u32)> {
    let output = Command::new(ffmpeg)
        .arg("-version")
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {} -version. Is ffmpeg installed and in PATH?",
                ffmpeg.display()
            )
        })?;

    if !output.status.success() {
        return Err(anyhow!("ffmpeg -version command failed"));
    }

    parse_ffmpeg_version(&String::from_utf8_lossy(&output.stdout))
}

pub fn parse_ffmpeg_version(stdout: &str) -> Result<(u32, u32, u32)> {
    let caps = VERSION_RE
        .captures(stdout)
        .ok_or_else(|| anyhow!("Failed to parse ffmpeg version from output: {}", stdout))?;

    let major: u32 = caps[1].parse().context("Failed to parse major version")?;
    let minor: u32 = caps[2].parse().context("Failed to parse minor version")?;
    let patch: u32 = match caps.get(3) {
        Some(m) => m.as_str().parse().context("Failed to parse patch version")?,
        None => 0,
    };

    Ok((major, minor, patch))
}

pub fn detect_available_codecs(ffmpeg: &Path) -> Result<Vec<Codec>> {
    let output = Command::new(ffmpeg)
        .arg("-hide_banner")
        .arg("-encoders")
        .output()
        .context("Failed to execute ffmpeg -encoders")?;

    if !output.status.success() {
        return Err(anyhow!("ffmpeg -encoders command failed"));
    }

    Ok(parse_available_codecs(&String::from_utf8_lossy(&output.stdout)))
}

/// Codecs whose encoder appears in `ffmpeg -encoders` output
pub fn parse_available_codecs(stdout: &str) -> Vec<Codec> {
    // "libvpx" is a prefix of "libvpx-vp9", so match whole encoder names
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();

    Codec::ALL
        .into_iter()
        .filter(|codec| names.contains(&codec.encoder_name()))
        .collect()
}

pub fn ensure_codec_available(codec: Codec, available: &[Codec]) -> Result<()> {
    if available.contains(&codec) {
        return Ok(());
    }
    Err(anyhow!(
        "{} encoding needs ffmpeg built with {}",
        codec,
        codec.encoder_name()
    ))
}
