// Raw user options combined with probe data into an EncodingIntent

use crate::codec::Codec;
use crate::error::{EncodeError, Result};
use crate::filters::{Deinterlace, Denoise, DubSpec, TrimSpec};
use crate::intent::{AudioTrack, EncodingIntent};
use crate::probe::MediaInfo;
use crate::quality::VariableQuality;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct IntentOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub codec: String,
    pub crf: i32,
    pub crf_tolerance: u32,
    pub framerate: Option<f64>,
    pub audio_bitrate_kbps: u32,
    pub no_audio: bool,
    /// Explicit audio track, defaults to the first one
    pub audio_track: Option<usize>,
    pub title: Option<String>,
    pub threads: Option<usize>,
    pub row_multithreading: bool,
    pub single_pass: bool,

    pub denoise: bool,
    pub deinterlace: bool,
    /// `width:height`
    pub resize: Option<String>,
    /// `x:y:width:height`
    pub crop: Option<String>,
    pub trim_start: Option<String>,
    pub trim_end: Option<String>,
    pub dub_path: Option<PathBuf>,
    pub dub_loop: bool,
    pub dub_shortest: bool,
}

impl Default for IntentOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            codec: "vp9".to_string(),
            crf: 40,
            crf_tolerance: 2,
            framerate: None,
            audio_bitrate_kbps: 96,
            no_audio: false,
            audio_track: None,
            title: None,
            threads: None,
            row_multithreading: true,
            single_pass: false,
            denoise: false,
            deinterlace: false,
            resize: None,
            crop: None,
            trim_start: None,
            trim_end: None,
            dub_path: None,
            dub_loop: false,
            dub_shortest: false,
        }
    }
}

impl EncodingIntent {
    /// Builds an intent from user options and the probe of the input (and
    /// of the dub file, when dubbing). Only parses; semantic checks happen
    /// when the command is built.
    pub fn from_options(
        options: &IntentOptions,
        input: &MediaInfo,
        dub: Option<&MediaInfo>,
    ) -> Result<Self> {
        let codec: Codec = options.codec.parse()?;

        let audio_track = match options.audio_track {
            Some(index) => {
                let stream = input.audio_streams.get(index).ok_or(
                    EncodeError::InvalidAudioTrack {
                        index,
                        available: input.audio_streams.len(),
                    },
                )?;
                Some(stream)
            }
            None => input.audio_streams.first(),
        }
        .map(|stream| AudioTrack {
            index: stream.index,
            title: stream.title.clone().unwrap_or_default(),
        });

        let title = options
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| input.title.clone());

        let trim = TrimSpec::new(
            options.trim_start.clone(),
            options.trim_end.clone(),
            input.duration,
        );

        let dub = match (&options.dub_path, dub) {
            (Some(path), Some(dub_info)) => Some(DubSpec {
                path: path.clone(),
                audio_duration: dub_info.duration,
                video_duration: input.duration,
                loop_streams: options.dub_loop,
                shortest: options.dub_shortest,
            }),
            (Some(path), None) => {
                return Err(EncodeError::InvalidDub(format!(
                    "no probe data for dub file {}",
                    path.display()
                )))
            }
            (None, _) => None,
        };

        Ok(Self {
            input: options.input.clone(),
            output: options.output.clone(),
            codec,
            quality: VariableQuality::new(
                options.crf,
                options.crf_tolerance,
                options.audio_bitrate_kbps,
            ),
            threads: options.threads,
            framerate: options.framerate,
            title,
            audio_enabled: !options.no_audio,
            audio_track,
            row_multithreading: options.row_multithreading,
            two_pass: !options.single_pass,
            width: input.width,
            height: input.height,
            duration: input.duration,
            trim: Some(trim).filter(|t| t.is_active()),
            crop: options.crop.as_deref().map(str::parse).transpose()?,
            resize: options.resize.as_deref().map(str::parse).transpose()?,
            denoise: options.denoise.then_some(Denoise),
            deinterlace: options.deinterlace.then_some(Deinterlace),
            dub,
        })
    }
}
