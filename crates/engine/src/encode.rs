// One- and two-pass ffmpeg execution

use crate::command::Command;
use crate::error::{EncodeError, Result};
use crate::intent::EncodingIntent;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info};

#[cfg(windows)]
pub const NULL_SINK: &str = "NUL";
#[cfg(not(windows))]
pub const NULL_SINK: &str = "/dev/null";

/// Runs one encoder invocation to completion
pub trait ProcessRunner {
    fn run(&mut self, args: &[String]) -> anyhow::Result<()>;
}

/// Runs the ffmpeg binary with inherited stdout/stderr
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    pub binary: PathBuf,
}

impl FfmpegRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl ProcessRunner for FfmpegRunner {
    fn run(&mut self, args: &[String]) -> anyhow::Result<()> {
        let status = std::process::Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("Failed to spawn {}", self.binary.display()))?;

        if !status.success() {
            anyhow::bail!("{} exited with code {:?}", self.binary.display(), status.code());
        }
        Ok(())
    }
}

/// A built command together with where it reads from and writes to
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub two_pass: bool,
    pub dubbing: bool,
    pub command: Command,
}

impl EncodeJob {
    pub fn from_intent(intent: &EncodingIntent) -> Result<Self> {
        Ok(Self {
            input: intent.input.clone(),
            output: intent.output.clone(),
            two_pass: intent.two_pass,
            dubbing: intent.is_dubbing(),
            command: intent.to_command()?,
        })
    }

    /// Statistics pass: no looping filters, no audio unless some is mapped,
    /// output discarded
    pub fn first_pass_args(&self, passlog: &Path) -> Vec<String> {
        let mut args = self.input_args();
        if !self.dubbing && !self.command.has_audio() {
            args.push("-an".to_string());
        }
        args.extend(self.command.to_analysis_args());
        args.extend(pass_flags(1, passlog));
        args.push(NULL_SINK.to_string());
        args
    }

    pub fn second_pass_args(&self, passlog: &Path) -> Vec<String> {
        let mut args = self.input_args();
        args.extend(self.command.to_args());
        args.extend(pass_flags(2, passlog));
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    pub fn single_pass_args(&self) -> Vec<String> {
        let mut args = self.input_args();
        args.extend(self.command.to_args());
        args.push("-y".to_string());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Argument lists for every pass, in execution order
    pub fn pass_args(&self, passlog: &Path) -> Vec<Vec<String>> {
        if self.two_pass {
            vec![self.first_pass_args(passlog), self.second_pass_args(passlog)]
        } else {
            vec![self.single_pass_args()]
        }
    }

    fn input_args(&self) -> Vec<String> {
        vec!["-i".to_string(), self.input.to_string_lossy().into_owned()]
    }
}

fn pass_flags(pass: u8, passlog: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-pass".to_string(),
        pass.to_string(),
        "-passlogfile".to_string(),
        passlog.to_string_lossy().into_owned(),
    ]
}

/// Runs the job's passes in order. The pass log lives in a temporary
/// directory that is removed when this returns, whatever the outcome.
pub fn run_encode(job: &EncodeJob, runner: &mut dyn ProcessRunner) -> Result<()> {
    if !job.two_pass {
        info!("Running single pass encode to {:?}", job.output);
        return run_pass(runner, 1, &job.single_pass_args());
    }

    let log_dir = tempfile::Builder::new()
        .prefix("webmake-")
        .tempdir()
        .map_err(EncodeError::TempFile)?;
    let passlog = log_dir.path().join("passlog");
    debug!("Pass log prefix: {:?}", passlog);

    info!("Running pass 1 of 2");
    run_pass(runner, 1, &job.first_pass_args(&passlog))?;
    info!("Running pass 2 of 2, writing {:?}", job.output);
    run_pass(runner, 2, &job.second_pass_args(&passlog))?;

    Ok(())
}

fn run_pass(runner: &mut dyn ProcessRunner, pass: u8, args: &[String]) -> Result<()> {
    debug!("ffmpeg {}", args.join(" "));
    runner.run(args).map_err(|e| EncodeError::ExternalProcess {
        pass,
        detail: format!("{:#}", e),
    })?;
    info!("Pass {} finished", pass);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingRunner {
        calls: usize,
    }

    impl ProcessRunner for FailingRunner {
        fn run(&mut self, _args: &[String]) -> anyhow::Result<()> {
            self.calls += 1;
            anyhow::bail!("exit code 1")
        }
    }

    #[test]
    fn test_pass_one_failure_stops_encode() {
        let intent = EncodingIntent::new("in.mkv", "out.webm");
        let job = EncodeJob::from_intent(&intent).unwrap();
        let mut runner = FailingRunner { calls: 0 };

        let result = run_encode(&job, &mut runner);
        assert!(matches!(result, Err(EncodeError::ExternalProcess { pass: 1, .. })));
        assert_eq!(runner.calls, 1);
    }

    #[test]
    fn test_missing_binary_is_process_failure() {
        let intent = EncodingIntent {
            two_pass: false,
            ..EncodingIntent::new("in.mkv", "out.webm")
        };
        let job = EncodeJob::from_intent(&intent).unwrap();
        let mut runner = FfmpegRunner::new("/nonexistent/ffmpeg-binary");

        let result = run_encode(&job, &mut runner);
        assert!(matches!(result, Err(EncodeError::ExternalProcess { pass: 1, .. })));
    }
}
