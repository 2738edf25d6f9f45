use crate::encoding::error::EncodingError;
use crate::encoding::process::run_with_timeout;
use crate::encoding::request::{AudioCodec, ContainerFormat, EncodeRequest, VideoCodec};
use slog::{debug, error, info, warn, Logger};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// File name pattern of the frame sequence, relative to `frame_sequence_dir`.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Constant-rate-factor per codec; codecs not listed get no quality flag.
const QUALITY_BY_CODEC: &[(VideoCodec, &str)] = &[
    (VideoCodec::Libx264, "19"),
    (VideoCodec::Libx265, "19"),
    (VideoCodec::Libsvtav1, "35"),
];

/// Containers that get their index moved to the front for streaming.
const FASTSTART_CONTAINERS: &[ContainerFormat] = &[ContainerFormat::Mp4, ContainerFormat::Mov];

/// Audio codecs that accept `-b:a`.
const BITRATE_AUDIO_CODECS: &[AudioCodec] = &[AudioCodec::Aac, AudioCodec::Mp3, AudioCodec::Libopus];

fn quality_for(codec: VideoCodec) -> Option<&'static str> {
    QUALITY_BY_CODEC
        .iter()
        .find(|(c, _)| *c == codec)
        .map(|(_, crf)| *crf)
}

/// Assemble the ffmpeg argument list for `request`, excluding the executable itself.
/// The order follows ffmpeg's grammar: global flags, inputs, output options, output file.
/// It should produce something like:
/// -y -framerate 24 -i frames/frame_%06d.png -c:v libx264 -pix_fmt yuv420p -crf 19 -movflags +faststart -an out.mp4
pub fn build_args(request: &EncodeRequest) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    args.push(if request.overwrite { "-y" } else { "-n" }.to_string());
    args.push("-framerate".to_string());
    args.push(format!("{}", request.fps));
    args.push("-i".to_string());
    args.push(path_arg(&request.frame_sequence_dir.join(FRAME_PATTERN)));

    if let Some(audio) = &request.audio {
        args.push("-i".to_string());
        args.push(path_arg(&audio.path));
    }

    args.push("-c:v".to_string());
    args.push(request.video_codec.as_str().to_string());
    args.push("-pix_fmt".to_string());
    args.push(request.pixel_format.as_str().to_string());

    if let Some(crf) = quality_for(request.video_codec) {
        args.push("-crf".to_string());
        args.push(crf.to_string());
    }

    if FASTSTART_CONTAINERS.contains(&request.container_format) {
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }

    match &request.audio {
        None => args.push("-an".to_string()),
        Some(audio) => {
            args.push("-c:a".to_string());
            args.push(audio.codec.as_str().to_string());
            if BITRATE_AUDIO_CODECS.contains(&audio.codec) {
                args.push("-b:a".to_string());
                args.push(audio.bitrate.clone());
            }
            args.push("-shortest".to_string());
        }
    }

    args.push(path_arg(&request.output_path));
    args
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// How an encode ended. Only `exit_code == Some(0)` without a timeout counts as success.
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    pub output_path: PathBuf,
    /// None if the process was killed (timeout or signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub command_line: String,
    pub timed_out: bool,
}

impl EncodeOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Turn a failed outcome into the matching error, keeping the streams for diagnostics.
    pub fn into_result(self) -> Result<EncodeOutcome, EncodingError> {
        if self.success() {
            return Ok(self);
        }
        if self.timed_out {
            return Err(EncodingError::SubprocessTimeout {
                command_line: self.command_line,
                stdout: self.stdout,
                stderr: self.stderr,
            });
        }
        Err(EncodingError::SubprocessFailure {
            exit_code: self.exit_code,
            command_line: self.command_line,
            stdout: self.stdout,
            stderr: self.stderr,
        })
    }
}

/// Run `executable` over the frames described by `request`.
/// A non-zero exit or timeout is reported through the outcome; only a request that
/// can't be started at all is an `Err`.
pub fn invoke_ffmpeg_cli(
    executable: &Path,
    request: &EncodeRequest,
    timeout: Duration,
    logger: &Logger,
) -> Result<EncodeOutcome, EncodingError> {
    request.validate()?;

    let args = build_args(request);
    let command_line = render_command_line(executable, &args);
    info!(logger, "executing ffmpeg: {}", command_line);

    let mut cmd = Command::new(executable);
    cmd.args(&args);

    let output = match run_with_timeout(&mut cmd, timeout) {
        Ok(output) => output,
        Err(err) => {
            error!(logger, "failed to start ffmpeg: {}", err);
            return Err(EncodingError::SpawnFailed(format!("{}: {}", command_line, err)));
        }
    };

    let outcome = EncodeOutcome {
        output_path: request.output_path.clone(),
        exit_code: output.status.and_then(|s| s.code()),
        timed_out: output.timed_out(),
        stdout: output.stdout,
        stderr: output.stderr,
        command_line,
    };

    if outcome.timed_out {
        error!(
            logger,
            "ffmpeg timed out after {}s. STDOUT:{} STDERR:{}",
            timeout.as_secs_f32(),
            outcome.stdout,
            outcome.stderr
        );
    } else if !outcome.success() {
        error!(
            logger,
            "ffmpeg error (code {:?}):\nSTDOUT:\n{}\nSTDERR:\n{}",
            outcome.exit_code,
            outcome.stdout,
            outcome.stderr
        );
    } else {
        info!(logger, "video saved: {}", outcome.output_path.display());
        if !request.verbosity.is_quiet() {
            if !outcome.stdout.trim().is_empty() {
                debug!(logger, "ffmpeg stdout:\n{}", outcome.stdout);
            }
            if !outcome.stderr.trim().is_empty() {
                warn!(logger, "ffmpeg stderr:\n{}", outcome.stderr);
            }
        }
    }

    Ok(outcome)
}

fn render_command_line(executable: &Path, args: &[String]) -> String {
    let mut parts = vec![path_arg(executable)];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}
