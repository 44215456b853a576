// Translates an encoding intent into an ordered ffmpeg command

use crate::codec::{recommended_slices, Codec};
use crate::command::{pair, Command};
use crate::error::{EncodeError, Result};
use crate::filters::{CropSpec, Deinterlace, Denoise, DubSpec, LoopMode, ResizeSpec, TrimSpec};
use crate::quality::VariableQuality;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 16;

/// Output container, always WebM
pub const OUTPUT_FORMAT: &str = "webm";
pub const PIXEL_FORMAT: &str = "yuv420p";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    /// Index among the input's audio streams
    pub index: usize,
    pub title: String,
}

/// Everything the user asked for, plus the probed facts about the input.
/// `width`, `height` and `duration` come from probing (-1 when unknown).
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingIntent {
    pub input: PathBuf,
    pub output: PathBuf,

    pub codec: Codec,
    pub quality: VariableQuality,
    /// None means a single thread
    pub threads: Option<usize>,
    /// None keeps the input framerate
    pub framerate: Option<f64>,
    pub title: String,
    pub audio_enabled: bool,
    pub audio_track: Option<AudioTrack>,
    pub row_multithreading: bool,
    pub two_pass: bool,

    pub width: i32,
    pub height: i32,
    pub duration: f64,

    pub trim: Option<TrimSpec>,
    pub crop: Option<CropSpec>,
    pub resize: Option<ResizeSpec>,
    pub denoise: Option<Denoise>,
    pub deinterlace: Option<Deinterlace>,
    pub dub: Option<DubSpec>,
}

impl EncodingIntent {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            codec: Codec::Vp9,
            quality: VariableQuality::new(40, 2, 96),
            threads: None,
            framerate: None,
            title: String::new(),
            audio_enabled: true,
            audio_track: None,
            row_multithreading: true,
            two_pass: true,
            width: -1,
            height: -1,
            duration: -1.0,
            trim: None,
            crop: None,
            resize: None,
            denoise: None,
            deinterlace: None,
            dub: None,
        }
    }

    /// Dub audio replaces the input's audio only when audio is kept
    pub fn is_dubbing(&self) -> bool {
        self.audio_enabled && self.dub.is_some()
    }

    fn active_trim(&self) -> Option<&TrimSpec> {
        self.trim.as_ref().filter(|t| t.is_active())
    }

    /// Builds the command. Steps run in a fixed order since later steps
    /// depend on the dub input and loop mode settled by earlier ones.
    pub fn to_command(&self) -> Result<Command> {
        let resolved = self.validate()?;
        let dub = resolved.dub.as_ref().filter(|_| self.audio_enabled);

        let mut command = Command::new();

        // Dub audio is input 1, the source is input 0
        match dub {
            Some(dub) => {
                command.add_input(dub.path.to_string_lossy());
                command.set_audio_filter_input(1);
                debug!(
                    "Dubbing with {:?}: loop mode {:?} (video {:.3}s, audio {:.3}s)",
                    dub.path,
                    dub.loop_mode(),
                    dub.video_duration,
                    dub.audio_duration
                );
                if !dub.loop_streams && dub.loop_mode() != LoopMode::None {
                    warn!("Dub and video durations differ, looping {:?} to match", dub.loop_mode());
                }
            }
            None => command.set_audio_filter_input(0),
        }

        self.add_general_args(&mut command, resolved.threads, dub);
        self.add_stream_maps(&mut command, dub);
        self.add_filters(&mut command, dub);
        self.add_video_codec_args(&mut command, resolved.threads);
        self.add_audio_codec_args(&mut command);

        debug!("Built ffmpeg args: {}", command);
        Ok(command)
    }

    fn validate(&self) -> Result<Resolved> {
        let threads = self.threads.unwrap_or(MIN_THREADS);
        if !(MIN_THREADS..=MAX_THREADS).contains(&threads) {
            return Err(EncodeError::InvalidThreadCount(threads));
        }

        if let Some(rate) = self.framerate {
            if !(rate > 0.0) {
                return Err(EncodeError::InvalidFrameRate(rate));
            }
        }

        if let Some(resize) = &self.resize {
            if !resize.is_valid() {
                return Err(EncodeError::InvalidResize(format!(
                    "{}:{}",
                    resize.width, resize.height
                )));
            }
        }

        if let Some(crop) = &self.crop {
            if !crop.is_valid() {
                return Err(EncodeError::InvalidCrop(format!(
                    "{}:{}:{}:{}",
                    crop.x, crop.y, crop.width, crop.height
                )));
            }
        }

        if let Some(dub) = &self.dub {
            dub.validate()?;
        }

        let mut dub = self.dub.clone();
        if let Some(trim) = self.active_trim() {
            trim.validate_timestamps()?;
            // A start-only trim needs a known source duration to check
            if trim.has_both_bounds() || trim.source_duration > 0.0 {
                trim.duration()?;
            }

            // Trimming shortens the video the dub has to match
            if let Some(original) = &self.dub {
                let trimmed = original.with_video_duration(trim.duration()?);
                trimmed.validate()?;
                dub = Some(trimmed);
            }
        }

        self.quality.validate(self.codec)?;

        Ok(Resolved { threads, dub })
    }

    fn add_general_args(&self, command: &mut Command, threads: usize, dub: Option<&DubSpec>) {
        command.add_general_arg("-metadata", format!("title={}", self.title));
        command.add_general_arg("-threads", threads.to_string());
        if let Some(rate) = self.framerate {
            command.add_general_arg("-r", rate.to_string());
        }
        command.add_general_arg("-pix_fmt", PIXEL_FORMAT);
        command.add_general_arg("-f", OUTPUT_FORMAT);
        if dub.is_some_and(|d| d.wants_shortest()) {
            command.add_general_arg("-shortest", "");
        }
    }

    /// A looped stream is reached through the filter graph, so only the
    /// other stream is mapped directly
    fn add_stream_maps(&self, command: &mut Command, dub: Option<&DubSpec>) {
        let Some(dub) = dub else {
            command.add_map("0:v:0");
            if let (true, Some(track)) = (self.audio_enabled, &self.audio_track) {
                command.add_map(format!("0:a:{}", track.index));
            }
            return;
        };

        match dub.loop_mode() {
            LoopMode::None => {
                command.add_map("0:v:0");
                command.add_map("1:a");
            }
            LoopMode::Audio => command.add_map("0:v:0"),
            LoopMode::Video => command.add_map("1:a"),
        }
    }

    fn add_filters(&self, command: &mut Command, dub: Option<&DubSpec>) {
        if let Some(trim) = self.active_trim() {
            for filter in trim.video_filters() {
                command.add_video_filter(filter);
            }
            // Dub audio replaces the source audio, so only trim the source's
            if self.audio_enabled && dub.is_none() {
                for filter in trim.audio_filters() {
                    command.add_audio_filter(filter);
                }
            }
        }
        if let Some(crop) = &self.crop {
            command.add_video_filter(crop.filter());
        }
        if let Some(deinterlace) = &self.deinterlace {
            command.add_video_filter(deinterlace.filter());
        }
        if let Some(denoise) = &self.denoise {
            command.add_video_filter(denoise.filter());
        }
        if let Some(resize) = &self.resize {
            command.add_video_filter(resize.filter());
        }
        if let Some(dub) = dub {
            if let Some(filter) = dub.video_filter() {
                command.add_video_filter(filter);
            }
            for filter in dub.audio_filters() {
                command.add_audio_filter(filter);
            }
        }
    }

    fn add_video_codec_args(&self, command: &mut Command, threads: usize) {
        let policy = self.codec.policy();
        command.add_video_arg(policy.video_codec());
        command.add_video_args(self.quality.video_args());
        command.add_video_args(policy.row_mt_args(self.row_multithreading));
        command.add_video_args(policy.tuning_args());

        let slices = recommended_slices(self.width, self.height);
        command.add_video_args(policy.tiling_args(slices, self.width, self.height, threads));
    }

    fn add_audio_codec_args(&self, command: &mut Command) {
        if !self.audio_enabled {
            return;
        }
        command.add_audio_arg(pair("-ac", "2"));
        command.add_audio_arg(self.codec.policy().audio_codec());
        command.add_audio_arg(self.quality.audio_quality_arg(self.codec));
    }
}

/// Values settled during validation
struct Resolved {
    threads: usize,
    /// Dub with its video duration adjusted for trimming
    dub: Option<DubSpec>,
}
