use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

// Public API types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    /// Width of the first video stream, -1 if unknown
    pub width: i32,
    /// Height of the first video stream, -1 if unknown
    pub height: i32,
    /// Container duration in seconds, -1 if unknown
    pub duration: f64,
    pub video_streams: Vec<StreamInfo>,
    pub audio_streams: Vec<StreamInfo>,
    pub subtitle_streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn has_valid_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn has_valid_duration(&self) -> bool {
        self.duration > 0.0
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}

impl Default for MediaInfo {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: -1,
            height: -1,
            duration: -1.0,
            video_streams: Vec::new(),
            audio_streams: Vec::new(),
            subtitle_streams: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamInfo {
    /// Position among streams of the same type, as used by `-map 0:a:N`
    pub index: usize,
    pub codec_name: String,
    pub title: Option<String>,
    pub language: Option<String>,
}

// Internal FFprobe JSON structures
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    streams: Option<Vec<FfprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Deserialize)]
struct FfprobeTags {
    #[serde(alias = "TITLE")]
    title: Option<String>,
    #[serde(alias = "LANGUAGE")]
    language: Option<String>,
}

/// Execute ffprobe on a file and parse the JSON output
pub fn probe_file(ffprobe: &Path, path: &Path) -> Result<MediaInfo> {
    let output = Command::new(ffprobe)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .output()
        .with_context(|| format!("Failed to execute {}", ffprobe.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffprobe failed on {}: {}", path.display(), stderr);
    }

    let stdout = String::from_utf8(output.stdout).context("ffprobe output is not valid UTF-8")?;
    parse_probe_json(&stdout)
}

/// Parse ffprobe's JSON into a MediaInfo
pub fn parse_probe_json(json: &str) -> Result<MediaInfo> {
    let output: FfprobeOutput =
        serde_json::from_str(json).context("Failed to parse ffprobe JSON output")?;
    Ok(parse_ffprobe_output(output))
}

fn parse_ffprobe_output(output: FfprobeOutput) -> MediaInfo {
    let mut info = MediaInfo::default();

    if let Some(format) = output.format {
        if let Some(duration) = format.duration.and_then(|d| d.parse::<f64>().ok()) {
            info.duration = duration;
        }
        if let Some(title) = format.tags.and_then(|t| t.title) {
            info.title = title;
        }
    }

    for stream in output.streams.unwrap_or_default() {
        let list = match stream.codec_type.as_str() {
            "video" => &mut info.video_streams,
            "audio" => &mut info.audio_streams,
            "subtitle" => &mut info.subtitle_streams,
            _ => continue,
        };

        // Dimensions come from the first video stream
        if stream.codec_type == "video" && list.is_empty() {
            info.width = stream.width.unwrap_or(-1);
            info.height = stream.height.unwrap_or(-1);
        }

        let (title, language) = match stream.tags {
            Some(tags) => (tags.title, tags.language),
            None => (None, None),
        };
        list.push(StreamInfo {
            index: list.len(),
            codec_name: stream.codec_name.unwrap_or_default(),
            title,
            language,
        });
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "tags": {"language": "jpn", "title": "Stereo"}},
            {"index": 2, "codec_type": "subtitle", "codec_name": "ass"},
            {"index": 3, "codec_type": "audio", "codec_name": "opus"},
            {"index": 4, "codec_type": "attachment"},
            {"index": 5, "codec_type": "video", "codec_name": "mjpeg", "width": 300, "height": 300}
        ],
        "format": {"duration": "61.500000", "tags": {"title": "Episode 1"}}
    }"#;

    #[test]
    fn test_parse_sample() {
        let info = parse_probe_json(SAMPLE).unwrap();
        assert_eq!(info.title, "Episode 1");
        assert_eq!(info.duration, 61.5);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!(info.has_valid_dimensions());
        assert!(info.has_valid_duration());
        assert!(info.has_title());

        assert_eq!(info.video_streams.len(), 2);
        assert_eq!(info.subtitle_streams.len(), 1);
        assert_eq!(info.audio_streams.len(), 2);
        assert_eq!(info.audio_streams[0].index, 0);
        assert_eq!(info.audio_streams[0].title.as_deref(), Some("Stereo"));
        assert_eq!(info.audio_streams[0].language.as_deref(), Some("jpn"));
        assert_eq!(info.audio_streams[1].index, 1);
        assert_eq!(info.audio_streams[1].codec_name, "opus");
    }

    #[test]
    fn test_parse_empty() {
        let info = parse_probe_json("{}").unwrap();
        assert_eq!(info, MediaInfo::default());
        assert!(!info.has_valid_dimensions());
        assert!(!info.has_valid_duration());
        assert!(!info.has_title());
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_probe_json("not json").unwrap_err();
        assert!(err.to_string().contains("ffprobe JSON"));
    }
}
