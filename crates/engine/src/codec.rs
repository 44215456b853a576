// Codec policies: the ffmpeg flags each WebM codec needs

use crate::command::{pair, ArgPair};
use crate::error::EncodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Vp8,
    Vp9,
    Av1,
}

impl Codec {
    pub const ALL: [Codec; 3] = [Codec::Vp8, Codec::Vp9, Codec::Av1];

    /// Returns the flag policy for this codec
    pub fn policy(self) -> &'static dyn CodecPolicy {
        match self {
            Codec::Vp8 => &Vp8Policy,
            Codec::Vp9 => &Vp9Policy,
            Codec::Av1 => &Av1Policy,
        }
    }

    /// Name of the ffmpeg encoder backing this codec
    pub fn encoder_name(self) -> &'static str {
        match self {
            Codec::Vp8 => "libvpx",
            Codec::Vp9 => "libvpx-vp9",
            Codec::Av1 => "libaom-av1",
        }
    }

    /// Whether this codec pairs with opus (true) or vorbis (false)
    pub fn uses_opus(self) -> bool {
        self.policy().audio_codec().1 == "libopus"
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::Vp8 => "VP8",
            Codec::Vp9 => "VP9",
            Codec::Av1 => "AV1",
        };
        f.write_str(name)
    }
}

impl FromStr for Codec {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vp8" => Ok(Codec::Vp8),
            "vp9" => Ok(Codec::Vp9),
            "av1" => Ok(Codec::Av1),
            _ => Err(EncodeError::InvalidCodec(s.to_string())),
        }
    }
}

/// Codec-specific ffmpeg flags. One implementation per codec keeps all
/// knowledge about a codec in one place.
pub trait CodecPolicy: Sync {
    fn video_codec(&self) -> ArgPair;

    fn audio_codec(&self) -> ArgPair;

    /// Tuning flags, always starting with the alt-ref and keyframe interval
    fn tuning_args(&self) -> Vec<ArgPair>;

    /// Encode speed and row multithreading flags
    fn row_mt_args(&self, enabled: bool) -> Vec<ArgPair>;

    /// Frame partitioning flags for the recommended slice count
    fn tiling_args(&self, slices: u32, width: i32, height: i32, threads: usize) -> Vec<ArgPair>;
}

fn base_tuning_args() -> Vec<ArgPair> {
    vec![pair("-auto-alt-ref", "1"), pair("-g", "128")]
}

pub struct Vp8Policy;

impl CodecPolicy for Vp8Policy {
    fn video_codec(&self) -> ArgPair {
        pair("-c:v", "libvpx")
    }

    fn audio_codec(&self) -> ArgPair {
        pair("-c:a", "libvorbis")
    }

    fn tuning_args(&self) -> Vec<ArgPair> {
        let mut args = base_tuning_args();
        args.push(pair("-lag-in-frames", "25"));
        args
    }

    fn row_mt_args(&self, enabled: bool) -> Vec<ArgPair> {
        // VP8 has no row-mt, only the speed knob changes
        vec![pair("-cpu-used", if enabled { "1" } else { "0" })]
    }

    fn tiling_args(&self, slices: u32, _width: i32, _height: i32, _threads: usize) -> Vec<ArgPair> {
        // Maps onto libvpx token partitions
        vec![pair("-slices", slices.to_string())]
    }
}

pub struct Vp9Policy;

impl CodecPolicy for Vp9Policy {
    fn video_codec(&self) -> ArgPair {
        pair("-c:v", "libvpx-vp9")
    }

    fn audio_codec(&self) -> ArgPair {
        pair("-c:a", "libopus")
    }

    fn tuning_args(&self) -> Vec<ArgPair> {
        let mut args = base_tuning_args();
        args.push(pair("-lag-in-frames", "25"));
        args.push(pair("-aq-mode", "0"));
        args.push(pair("-enable-tpl", "1"));
        args.push(pair("-frame-parallel", "0"));
        args
    }

    fn row_mt_args(&self, enabled: bool) -> Vec<ArgPair> {
        let flag = if enabled { "1" } else { "0" };
        vec![pair("-cpu-used", flag), pair("-row-mt", flag)]
    }

    fn tiling_args(&self, slices: u32, _width: i32, _height: i32, _threads: usize) -> Vec<ArgPair> {
        // tile-columns is given as log2 of the column count
        let columns = slices.max(1).ilog2();
        vec![pair("-tile-columns", columns.to_string())]
    }
}

pub struct Av1Policy;

impl CodecPolicy for Av1Policy {
    fn video_codec(&self) -> ArgPair {
        pair("-c:v", "libaom-av1")
    }

    fn audio_codec(&self) -> ArgPair {
        pair("-c:a", "libopus")
    }

    fn tuning_args(&self) -> Vec<ArgPair> {
        let mut args = base_tuning_args();
        args.push(pair("-lag-in-frames", "35"));
        args.push(pair("-strict", "experimental"));
        args
    }

    fn row_mt_args(&self, enabled: bool) -> Vec<ArgPair> {
        if enabled {
            vec![pair("-cpu-used", "4"), pair("-row-mt", "1")]
        } else {
            vec![pair("-cpu-used", "1"), pair("-row-mt", "0")]
        }
    }

    fn tiling_args(&self, _slices: u32, width: i32, height: i32, threads: usize) -> Vec<ArgPair> {
        let (columns, rows) = av1_tiles(width, height, threads);
        vec![
            pair("-tile-columns", columns.to_string()),
            pair("-tile-rows", rows.to_string()),
        ]
    }
}

/// Returns (tile columns, tile rows), both as log2 values and at least 1
pub fn av1_tiles(width: i32, height: i32, threads: usize) -> (u32, u32) {
    let tiles = ((threads.max(1) as f64).log2() / 2.0).ceil() as u32;
    let columns = tiles.min(max_tile_log2(width)).max(1);
    let rows = tiles.min(max_tile_log2(height)).max(1);
    (columns, rows)
}

// log2 of the number of 64px superblocks along one dimension
fn max_tile_log2(dimension: i32) -> u32 {
    if dimension <= 0 {
        return 0;
    }
    let units = (dimension as u32).div_ceil(64);
    units.ilog2()
}

/// Recommended slice count for a resolution:
/// - >= 1080p: 4
/// - >= 720p: 3
/// - >= 480p: 2
/// - otherwise: 1
pub fn recommended_slices(width: i32, height: i32) -> u32 {
    let pixels = i64::from(width) * i64::from(height);
    match pixels {
        p if p >= 1920 * 1080 => 4,
        p if p >= 1280 * 720 => 3,
        p if p >= 640 * 480 => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn value_of<'a>(args: &'a [ArgPair], key: &str) -> Option<&'a str> {
        args.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_codec_parsing() {
        assert_eq!("vp8".parse::<Codec>().unwrap(), Codec::Vp8);
        assert_eq!("VP9".parse::<Codec>().unwrap(), Codec::Vp9);
        assert_eq!(" Av1 ".parse::<Codec>().unwrap(), Codec::Av1);
        assert!(matches!(
            "h264".parse::<Codec>(),
            Err(EncodeError::InvalidCodec(name)) if name == "h264"
        ));
    }

    #[test]
    fn test_audio_codec_per_variant() {
        assert_eq!(Codec::Vp8.policy().audio_codec().1, "libvorbis");
        assert_eq!(Codec::Vp9.policy().audio_codec().1, "libopus");
        assert_eq!(Codec::Av1.policy().audio_codec().1, "libopus");
        assert!(!Codec::Vp8.uses_opus());
        assert!(Codec::Av1.uses_opus());
    }

    #[test]
    fn test_video_codec_matches_encoder_name() {
        for codec in Codec::ALL {
            let (flag, value) = codec.policy().video_codec();
            assert_eq!(flag, "-c:v");
            assert_eq!(value, codec.encoder_name());
        }
    }

    #[test]
    fn test_tuning_args() {
        let vp8 = Codec::Vp8.policy().tuning_args();
        assert_eq!(value_of(&vp8, "-lag-in-frames"), Some("25"));
        assert_eq!(value_of(&vp8, "-aq-mode"), None);

        let vp9 = Codec::Vp9.policy().tuning_args();
        assert_eq!(value_of(&vp9, "-aq-mode"), Some("0"));
        assert_eq!(value_of(&vp9, "-enable-tpl"), Some("1"));
        assert_eq!(value_of(&vp9, "-frame-parallel"), Some("0"));

        let av1 = Codec::Av1.policy().tuning_args();
        assert_eq!(value_of(&av1, "-lag-in-frames"), Some("35"));
        assert_eq!(value_of(&av1, "-strict"), Some("experimental"));
    }

    #[test]
    fn test_row_mt_args() {
        assert_eq!(Codec::Vp8.policy().row_mt_args(true), vec![pair("-cpu-used", "1")]);
        assert_eq!(Codec::Vp8.policy().row_mt_args(false), vec![pair("-cpu-used", "0")]);
        assert_eq!(
            Codec::Vp9.policy().row_mt_args(true),
            vec![pair("-cpu-used", "1"), pair("-row-mt", "1")]
        );
        assert_eq!(
            Codec::Av1.policy().row_mt_args(true),
            vec![pair("-cpu-used", "4"), pair("-row-mt", "1")]
        );
        assert_eq!(
            Codec::Av1.policy().row_mt_args(false),
            vec![pair("-cpu-used", "1"), pair("-row-mt", "0")]
        );
    }

    #[test]
    fn test_tiling_per_variant() {
        assert_eq!(
            Codec::Vp8.policy().tiling_args(3, 1280, 720, 8),
            vec![pair("-slices", "3")]
        );
        assert_eq!(
            Codec::Vp9.policy().tiling_args(4, 1920, 1080, 8),
            vec![pair("-tile-columns", "2")]
        );
        assert_eq!(
            Codec::Vp9.policy().tiling_args(3, 1280, 720, 8),
            vec![pair("-tile-columns", "1")]
        );
        assert_eq!(
            Codec::Vp9.policy().tiling_args(1, 320, 240, 8),
            vec![pair("-tile-columns", "0")]
        );
    }

    #[test]
    fn test_av1_tiles() {
        // 16 threads -> ceil(4 / 2) = 2, 1920/64 = 30 -> log2 = 4, 1080/64 -> 17 -> 4
        assert_eq!(av1_tiles(1920, 1080, 16), (2, 2));
        // 8 threads -> ceil(1.5) = 2
        assert_eq!(av1_tiles(1920, 1080, 8), (2, 2));
        // 1 thread -> 0, clamped to 1
        assert_eq!(av1_tiles(1920, 1080, 1), (1, 1));
        // small frame: 128px wide -> 2 units -> log2 = 1
        assert_eq!(av1_tiles(128, 64, 16), (1, 1));
        // unknown dimensions
        assert_eq!(av1_tiles(-1, -1, 16), (1, 1));
    }

    #[test]
    fn test_recommended_slices_examples() {
        assert_eq!(recommended_slices(1920, 1080), 4);
        assert_eq!(recommended_slices(3840, 2160), 4);
        assert_eq!(recommended_slices(1280, 720), 3);
        assert_eq!(recommended_slices(640, 480), 2);
        assert_eq!(recommended_slices(320, 240), 1);
        assert_eq!(recommended_slices(-1, -1), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Slice count only grows with the pixel count and stays within 1..=4
        #[test]
        fn prop_recommended_slices_monotonic(
            w1 in 1i32..4096, h1 in 1i32..4096,
            w2 in 1i32..4096, h2 in 1i32..4096,
        ) {
            let (a, b) = (recommended_slices(w1, h1), recommended_slices(w2, h2));
            prop_assert!((1..=4).contains(&a));
            prop_assert!((1..=4).contains(&b));
            if i64::from(w1) * i64::from(h1) <= i64::from(w2) * i64::from(h2) {
                prop_assert!(a <= b);
            }
        }

        /// AV1 tiles never drop below 1 and never exceed the superblock limit
        #[test]
        fn prop_av1_tiles_bounded(
            width in 64i32..8192,
            height in 64i32..8192,
            threads in 1usize..=16,
        ) {
            let (columns, rows) = av1_tiles(width, height, threads);
            prop_assert!(columns >= 1 && rows >= 1);
            prop_assert!(columns <= 2 && rows <= 2);
            prop_assert!(columns <= max_tile_log2(width).max(1));
            prop_assert!(rows <= max_tile_log2(height).max(1));
        }
    }
}
