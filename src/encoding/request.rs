use crate::encoding::error::EncodingError;
use crate::logging::Verbosity;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum VideoCodec {
    #[serde(rename = "libx264")]
    Libx264,
    #[serde(rename = "libx265")]
    Libx265,
    #[serde(rename = "libvpx-vp9")]
    LibvpxVp9,
    #[serde(rename = "libsvtav1")]
    Libsvtav1,
}

impl VideoCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoCodec::Libx264 => "libx264",
            VideoCodec::Libx265 => "libx265",
            VideoCodec::LibvpxVp9 => "libvpx-vp9",
            VideoCodec::Libsvtav1 => "libsvtav1",
        }
    }
}

impl Default for VideoCodec {
    fn default() -> Self {
        VideoCodec::Libx264
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Yuv420p,
    Yuv422p,
    Yuv444p,
    Yuv420p10le,
    Yuv422p10le,
    Yuv444p10le,
    Rgb24,
}

impl PixelFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Yuv422p => "yuv422p",
            PixelFormat::Yuv444p => "yuv444p",
            PixelFormat::Yuv420p10le => "yuv420p10le",
            PixelFormat::Yuv422p10le => "yuv422p10le",
            PixelFormat::Yuv444p10le => "yuv444p10le",
            PixelFormat::Rgb24 => "rgb24",
        }
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        PixelFormat::Yuv420p
    }
}

/// Output container; also decides the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Webm,
    Mov,
    Avi,
    Mkv,
}

impl ContainerFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Webm => "webm",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Avi => "avi",
            ContainerFormat::Mkv => "mkv",
        }
    }
}

impl Default for ContainerFormat {
    fn default() -> Self {
        ContainerFormat::Mp4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Mp3,
    Libopus,
    /// Pass the input stream through untouched.
    Copy,
}

impl AudioCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Libopus => "libopus",
            AudioCodec::Copy => "copy",
        }
    }
}

impl Default for AudioCodec {
    fn default() -> Self {
        AudioCodec::Aac
    }
}

pub const MIN_FPS: f64 = 1.0;
pub const MAX_FPS: f64 = 120.0;

pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
pub const AUDIO_BITRATES: &[&str] = &["96k", "128k", "160k", "192k", "256k", "320k"];

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub codec: AudioCodec,
    pub bitrate: String,
}

/// Everything the encoder needs to turn a folder of `frame_%06d.png` files into a video.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub frame_sequence_dir: PathBuf,
    pub frame_count: usize,
    pub fps: f64,
    pub video_codec: VideoCodec,
    pub pixel_format: PixelFormat,
    pub container_format: ContainerFormat,
    pub audio: Option<AudioTrack>,
    pub verbosity: Verbosity,
    pub output_path: PathBuf,
    pub overwrite: bool,
}

impl EncodeRequest {
    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.frame_count == 0 {
            return Err(EncodingError::InvalidRequest(
                "no frames to encode".to_string(),
            ));
        }
        if !(MIN_FPS..=MAX_FPS).contains(&self.fps) {
            return Err(EncodingError::InvalidRequest(format!(
                "fps must be within {}..={}, got {}",
                MIN_FPS, MAX_FPS, self.fps
            )));
        }
        if let Some(audio) = &self.audio {
            if audio.codec != AudioCodec::Copy && !AUDIO_BITRATES.contains(&audio.bitrate.as_str())
            {
                return Err(EncodingError::InvalidRequest(format!(
                    "unsupported audio bitrate '{}'",
                    audio.bitrate
                )));
            }
        }
        Ok(())
    }
}
