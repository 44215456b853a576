// Constant-quality (CRF) encoding arguments

use crate::codec::Codec;
use crate::command::{pair, ArgPair};
use crate::error::{EncodeError, Result};

pub const MIN_QUANTIZER: i32 = 0;
pub const MAX_QUANTIZER: i32 = 63;

/// Lowest bitrate libopus accepts, in kbps
pub const MIN_OPUS_BITRATE_KBPS: u32 = 6;

/// Approximate vorbis bitrate (kbps) for each `-qscale:a` value from -1 to 10
const VORBIS_QSCALE_BITRATES: [u32; 12] = [45, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 500];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableQuality {
    pub crf: i32,
    pub tolerance: u32,
    pub audio_bitrate_kbps: u32,
}

impl VariableQuality {
    pub fn new(crf: i32, tolerance: u32, audio_bitrate_kbps: u32) -> Self {
        Self {
            crf,
            tolerance,
            audio_bitrate_kbps,
        }
    }

    pub fn validate(&self, codec: Codec) -> Result<()> {
        if !(MIN_QUANTIZER..=MAX_QUANTIZER).contains(&self.crf) {
            return Err(EncodeError::InvalidQualityTarget(self.crf));
        }
        if codec.uses_opus() && self.audio_bitrate_kbps < MIN_OPUS_BITRATE_KBPS {
            return Err(EncodeError::InvalidAudioBitrate(self.audio_bitrate_kbps));
        }
        Ok(())
    }

    /// (qmin, qmax) around the crf, clamped to the quantizer range
    pub fn quantizer_bounds(&self) -> (i32, i32) {
        let crf = i64::from(self.crf);
        let tolerance = i64::from(self.tolerance);
        let qmin = (crf - tolerance).max(i64::from(MIN_QUANTIZER));
        let qmax = (crf + tolerance).min(i64::from(MAX_QUANTIZER));
        (qmin as i32, qmax as i32)
    }

    /// `-b:v 0` puts libvpx/libaom into constant quality mode
    pub fn video_args(&self) -> Vec<ArgPair> {
        let (qmin, qmax) = self.quantizer_bounds();
        vec![
            pair("-crf", self.crf.to_string()),
            pair("-qmin", qmin.to_string()),
            pair("-qmax", qmax.to_string()),
            pair("-qcomp", "1"),
            pair("-b:v", "0"),
        ]
    }

    pub fn audio_quality_arg(&self, codec: Codec) -> ArgPair {
        if codec.uses_opus() {
            pair("-b:a", format!("{}k", self.audio_bitrate_kbps))
        } else {
            pair(
                "-qscale:a",
                vorbis_quality_scale(self.audio_bitrate_kbps).to_string(),
            )
        }
    }
}

/// Vorbis quality scale (-1..=10) whose nominal bitrate is closest to `kbps`.
/// Ties go to the lower quality. Bitrates above the table saturate at 10.
pub fn vorbis_quality_scale(kbps: u32) -> i32 {
    let mut best_index = 0;
    let mut best_diff = u32::MAX;
    for (index, &bitrate) in VORBIS_QSCALE_BITRATES.iter().enumerate() {
        let diff = kbps.abs_diff(bitrate);
        if diff < best_diff {
            best_diff = diff;
            best_index = index;
        }
    }
    best_index as i32 - 1
}
