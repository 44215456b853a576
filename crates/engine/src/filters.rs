// Filter descriptors and the filter graph fragments they contribute

use crate::command::{pair, ArgPair};
use crate::error::{EncodeError, Result};
use crate::timestamp::parse_timestamp;
use std::path::PathBuf;
use std::str::FromStr;

const RESET_PTS: &str = "PTS-STARTPTS";

/// Iteration counts large enough to outlast any real input
const VIDEO_LOOP_VALUE: &str = "-1:32767:0";
const AUDIO_LOOP_VALUE: &str = "-1:2147483647:0";

/// Trims the input between optional start and end timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct TrimSpec {
    pub start: Option<String>,
    pub end: Option<String>,
    /// Source duration in seconds, needed when only a start is given
    pub source_duration: f64,
}

impl TrimSpec {
    /// Empty timestamps count as not given
    pub fn new(start: Option<String>, end: Option<String>, source_duration: f64) -> Self {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        Self {
            start: non_empty(start),
            end: non_empty(end),
            source_duration,
        }
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn has_both_bounds(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Checks that every given timestamp parses
    pub fn validate_timestamps(&self) -> Result<()> {
        for ts in self.start.iter().chain(self.end.iter()) {
            parse_timestamp(ts)?;
        }
        Ok(())
    }

    /// Duration of the trimmed output in seconds
    pub fn duration(&self) -> Result<f64> {
        let start = self.start.as_deref().map(parse_timestamp).transpose()?;
        let end = self.end.as_deref().map(parse_timestamp).transpose()?;

        let duration = match (start, end) {
            (Some(start), Some(end)) => end - start,
            (None, Some(end)) => end,
            (Some(start), None) => self.source_duration - start,
            (None, None) => return Ok(self.source_duration),
        };

        if duration < 0.0 {
            return Err(EncodeError::NegativeTrimDuration(duration));
        }
        Ok(duration)
    }

    /// `start=..:end=..` with colons escaped for the filter graph
    pub fn filter_value(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(start) = &self.start {
            clauses.push(format!("start={}", escape_colons(start)));
        }
        if let Some(end) = &self.end {
            clauses.push(format!("end={}", escape_colons(end)));
        }
        clauses.join(":")
    }

    pub fn video_filters(&self) -> Vec<ArgPair> {
        vec![pair("trim", self.filter_value()), pair("setpts", RESET_PTS)]
    }

    pub fn audio_filters(&self) -> Vec<ArgPair> {
        vec![pair("atrim", self.filter_value()), pair("asetpts", RESET_PTS)]
    }
}

fn escape_colons(ts: &str) -> String {
    ts.trim().replace(':', "\\\\:")
}

/// Crops the frame to a window with its top-left corner at (x, y)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSpec {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CropSpec {
    pub fn is_valid(&self) -> bool {
        self.x >= 0 && self.y >= 0 && self.width > 0 && self.height > 0
    }

    pub fn filter(&self) -> ArgPair {
        pair(
            "crop",
            format!("{}:{}:{}:{}", self.width, self.height, self.x, self.y),
        )
    }
}

impl FromStr for CropSpec {
    type Err = EncodeError;

    /// Parses `x:y:width:height`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EncodeError::InvalidCrop(s.to_string());
        let parts = s
            .split(':')
            .map(|p| p.trim().parse::<i32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;

        match parts.as_slice() {
            [x, y, width, height] => Ok(Self {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            }),
            _ => Err(invalid()),
        }
    }
}

/// Scales the frame. Either dimension may be [`ResizeSpec::KEEP_ASPECT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub width: i32,
    pub height: i32,
}

impl ResizeSpec {
    pub const KEEP_ASPECT: i32 = -1;

    /// Values are passed straight to the scaler, which resolves the sentinels
    pub fn is_valid(&self) -> bool {
        true
    }

    pub fn filter(&self) -> ArgPair {
        pair(
            "scale",
            format!("{}:{}:flags=lanczos", self.width, self.height),
        )
    }
}

impl FromStr for ResizeSpec {
    type Err = EncodeError;

    /// Parses `width:height`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EncodeError::InvalidResize(s.to_string());
        let (width, height) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            width: width.trim().parse().map_err(|_| invalid())?,
            height: height.trim().parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Denoise;

impl Denoise {
    pub fn filter(&self) -> ArgPair {
        pair("hqdn3d", "4.0:3.0:6.0:4.5")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deinterlace;

impl Deinterlace {
    pub fn filter(&self) -> ArgPair {
        pair("yadif", "0:-1:0")
    }
}

/// Which stream is looped so a dub and the video end together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Durations match
    None,
    /// The dubbed audio is longer, the video is looped
    Video,
    /// The video is longer, the dubbed audio is looped
    Audio,
}

/// Replaces the audio of the input with audio from another file
#[derive(Debug, Clone, PartialEq)]
pub struct DubSpec {
    pub path: PathBuf,
    pub audio_duration: f64,
    /// Duration of the video being dubbed, after trimming
    pub video_duration: f64,
    pub loop_streams: bool,
    pub shortest: bool,
}

impl DubSpec {
    pub fn is_valid(&self) -> bool {
        !self.path.as_os_str().is_empty() && self.audio_duration > 0.0 && self.video_duration >= 0.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(EncodeError::InvalidDub("no dub file given".to_string()));
        }
        if !(self.audio_duration > 0.0) {
            return Err(EncodeError::InvalidDub(format!(
                "dub audio duration must be positive, got {}",
                self.audio_duration
            )));
        }
        if !(self.video_duration >= 0.0) {
            return Err(EncodeError::InvalidDub(format!(
                "video duration must not be negative, got {}",
                self.video_duration
            )));
        }
        Ok(())
    }

    /// Copy with a new video duration, e.g. after trimming
    pub fn with_video_duration(&self, video_duration: f64) -> Self {
        Self {
            video_duration,
            ..self.clone()
        }
    }

    pub fn loop_mode(&self) -> LoopMode {
        if self.video_duration > self.audio_duration {
            LoopMode::Audio
        } else if self.audio_duration > self.video_duration {
            LoopMode::Video
        } else {
            LoopMode::None
        }
    }

    /// Looped streams never end on their own, so looping implies `-shortest`
    pub fn wants_shortest(&self) -> bool {
        self.shortest || self.loop_mode() != LoopMode::None
    }

    pub fn loop_filter(&self) -> Option<ArgPair> {
        match self.loop_mode() {
            LoopMode::Audio => Some(pair("aloop", AUDIO_LOOP_VALUE)),
            LoopMode::Video => Some(pair("loop", VIDEO_LOOP_VALUE)),
            LoopMode::None => None,
        }
    }

    /// Audio filter chain for the dub input; only non-empty when looping audio
    pub fn audio_filters(&self) -> Vec<ArgPair> {
        match self.loop_filter() {
            Some(filter) if self.loop_mode() == LoopMode::Audio => {
                vec![pair("asetpts", RESET_PTS), filter]
            }
            _ => Vec::new(),
        }
    }

    /// Video filter to append; only present when looping video
    pub fn video_filter(&self) -> Option<ArgPair> {
        self.loop_filter()
            .filter(|_| self.loop_mode() == LoopMode::Video)
    }
}
