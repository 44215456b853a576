use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use webmake_engine::intent::MAX_THREADS;
use webmake_engine::{probe, startup, EncodeJob, EncodingIntent, FfmpegRunner, IntentOptions};

#[derive(Parser, Debug)]
#[command(name = "webmake")]
#[command(about = "Encode videos to WebM (VP8, VP9 or AV1) with ffmpeg", long_about = None)]
#[command(version)]
struct Args {
    /// Input file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Path to configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Single pass encoding, quicker but lower quality
    #[arg(long = "single-pass", alias = "sp")]
    single_pass: bool,

    /// Metadata title of the video
    #[arg(short, long)]
    title: Option<String>,

    /// Video codec: vp8, vp9 or av1
    #[arg(short, long)]
    codec: Option<String>,

    /// Quality from 0 (best) to 63 (worst)
    #[arg(long)]
    crf: Option<i32>,

    /// Output framerate, keeps the input framerate when unset
    #[arg(short = 'r', long)]
    framerate: Option<f64>,

    /// Audio bitrate in kbps
    #[arg(long = "audio-bitrate", value_name = "KBPS")]
    audio_bitrate: Option<u32>,

    /// Remove audio from the video
    #[arg(long = "no-audio", alias = "an")]
    no_audio: bool,

    /// Audio track to keep, defaults to the first
    #[arg(long = "audio-track", value_name = "INDEX")]
    audio_track: Option<usize>,

    /// Encoder threads (1-16)
    #[arg(long)]
    threads: Option<usize>,

    /// Denoise the video
    #[arg(long)]
    denoise: bool,

    /// Deinterlace the video
    #[arg(long)]
    deinterlace: bool,

    /// Resize the video, as "width:height" (-1 keeps the aspect ratio)
    #[arg(long, value_name = "W:H", allow_hyphen_values = true)]
    resize: Option<String>,

    /// Crop the video, as "x:y:width:height"
    #[arg(long, value_name = "X:Y:W:H")]
    crop: Option<String>,

    /// Trim start, as HH:MM:SS.MS, HH:MM:SS or seconds
    #[arg(long = "ss", value_name = "TIME")]
    trim_start: Option<String>,

    /// Trim end, as HH:MM:SS.MS, HH:MM:SS or seconds
    #[arg(long = "to", value_name = "TIME")]
    trim_end: Option<String>,

    /// File whose audio replaces the video's audio
    #[arg(long = "dubfp", value_name = "FILE")]
    dub: Option<PathBuf>,

    /// Loop the shorter of the dub and the video to match the longer
    #[arg(long = "loop")]
    dub_loop: bool,

    /// Stop at the end of the shortest stream when dubbing
    #[arg(long)]
    shortest: bool,

    /// Replace the output file if it exists
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// Print the ffmpeg arguments of each pass without running them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();

    let config = match webmake_engine::config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if args.output.exists() && !args.overwrite && !args.dry_run {
        error!("{:?} already exists, pass --overwrite to replace it", args.output);
        anyhow::bail!("output file already exists");
    }

    let codec_name = args
        .codec
        .clone()
        .unwrap_or_else(|| config.codec.to_string().to_lowercase());

    if !args.dry_run {
        let version = startup::check_ffmpeg_version(&config.ffmpeg_bin)?;
        info!("FFmpeg version: {}.{}.{}", version.0, version.1, version.2);

        let available = startup::detect_available_codecs(&config.ffmpeg_bin)?;
        startup::ensure_codec_available(codec_name.parse()?, &available)?;
    }

    info!("Probing {:?}", args.input);
    let input_info = probe::probe_file(&config.ffprobe_bin, &args.input)?;
    if !input_info.has_valid_dimensions() {
        warn!("Could not read the input resolution, using minimal slicing");
    }

    let dub_info = match &args.dub {
        Some(path) => {
            info!("Probing dub file {:?}", path);
            Some(probe::probe_file(&config.ffprobe_bin, path)?)
        }
        None => None,
    };

    let threads = args.threads.or(config.threads).or_else(|| {
        std::thread::available_parallelism()
            .ok()
            .map(|n| n.get().min(MAX_THREADS))
    });

    let options = IntentOptions {
        input: args.input.clone(),
        output: args.output.clone(),
        codec: codec_name,
        crf: args.crf.unwrap_or(config.crf),
        crf_tolerance: config.crf_tolerance,
        framerate: args.framerate,
        audio_bitrate_kbps: args.audio_bitrate.unwrap_or(config.audio_bitrate_kbps),
        no_audio: args.no_audio,
        audio_track: args.audio_track,
        title: args.title.clone(),
        threads,
        row_multithreading: config.row_multithreading,
        single_pass: args.single_pass || !config.two_pass,
        denoise: args.denoise,
        deinterlace: args.deinterlace,
        resize: args.resize.clone(),
        crop: args.crop.clone(),
        trim_start: args.trim_start.clone(),
        trim_end: args.trim_end.clone(),
        dub_path: args.dub.clone(),
        dub_loop: args.dub_loop,
        dub_shortest: args.shortest,
    };

    let intent = EncodingIntent::from_options(&options, &input_info, dub_info.as_ref())?;
    let job = EncodeJob::from_intent(&intent)?;
    info!(
        "Encoding {:?} -> {:?} with {} ({})",
        intent.input,
        intent.output,
        intent.codec,
        if job.two_pass { "two pass" } else { "single pass" }
    );

    if args.dry_run {
        let passlog = std::env::temp_dir().join("webmake-passlog");
        for (i, pass) in job.pass_args(&passlog).iter().enumerate() {
            println!("pass {}: {} {}", i + 1, config.ffmpeg_bin.display(), pass.join(" "));
        }
        return Ok(());
    }

    let mut runner = FfmpegRunner::new(config.ffmpeg_bin.clone());
    if let Err(e) = webmake_engine::run_encode(&job, &mut runner) {
        error!("Encode failed: {}", e);
        return Err(e.into());
    }

    info!("Done, wrote {:?}", intent.output);
    Ok(())
}
