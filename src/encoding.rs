mod audio;
mod ffmpeg_exporter;
mod frames;
pub(crate) mod process;
mod request;

pub use self::audio::{prepare_audio, write_wav, AudioInput, AudioWaveform, TEMP_AUDIO_FILE};
pub use self::ffmpeg_exporter::{build_args, EncodeOutcome, DEFAULT_TIMEOUT, FRAME_PATTERN};
pub use self::frames::{write_frame_sequence, FrameBatch};
pub use self::request::{
    AudioCodec, AudioTrack, ContainerFormat, EncodeRequest, PixelFormat, VideoCodec,
    AUDIO_BITRATES, DEFAULT_AUDIO_BITRATE, MAX_FPS, MIN_FPS,
};

use crate::encoding::error::EncodingError;
use crate::encoding::ffmpeg_exporter::invoke_ffmpeg_cli;
use image::{DynamicImage, ImageBuffer};
use slog::Logger;
use std::path::Path;
use std::time::Duration;

pub struct Encoding {
    timeout: Duration,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Encoding {
    pub fn new() -> Encoding {
        Default::default()
    }

    pub fn with_timeout(timeout: Duration) -> Encoding {
        Encoding { timeout }
    }

    /// Convert one float frame (`height x width x channels`, nominally 0..1) to an 8 bit image.
    /// Values are clamped before scaling, and scaling truncates.
    pub fn frame_to_image(
        &self,
        pixels: &[f32],
        width: u32,
        height: u32,
        channels: u32,
    ) -> Result<DynamicImage, EncodingError> {
        if pixels.len() != frames::pixel_count(width, height, channels)? {
            return Err(EncodingError::InvalidLength);
        }
        let bytes: Vec<u8> = pixels
            .iter()
            .map(|v| (v.max(0.0).min(1.0) * 255.0) as u8)
            .collect();
        let image = match channels {
            1 => ImageBuffer::from_raw(width, height, bytes).map(DynamicImage::ImageLuma8),
            3 => ImageBuffer::from_raw(width, height, bytes).map(DynamicImage::ImageRgb8),
            4 => ImageBuffer::from_raw(width, height, bytes).map(DynamicImage::ImageRgba8),
            _ => None,
        };
        image.ok_or(EncodingError::InvalidBufferData)
    }

    /// Build the command for `request` and run `executable` over it.
    pub fn encode(
        &self,
        executable: &Path,
        request: &EncodeRequest,
        logger: &Logger,
    ) -> Result<EncodeOutcome, EncodingError> {
        invoke_ffmpeg_cli(executable, request, self.timeout, logger)
    }
}

pub mod error {
    use crate::resources::ResourceError;
    use image::ImageError;
    use std::error::Error;
    use std::fmt;

    #[derive(Debug)]
    pub enum EncodingError {
        InvalidLength,
        InvalidBufferData,
        InvalidSourceData(String),
        InvalidRequest(String),
        FrameWriteFailed(String),
        AudioPreparationFailed(String),
        SpawnFailed(String),
        SubprocessTimeout {
            command_line: String,
            stdout: String,
            stderr: String,
        },
        SubprocessFailure {
            exit_code: Option<i32>,
            command_line: String,
            stdout: String,
            stderr: String,
        },
    }

    impl fmt::Display for EncodingError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Error for EncodingError {}

    impl From<ResourceError> for EncodingError {
        fn from(err: ResourceError) -> Self {
            EncodingError::InvalidSourceData(format!("{}", err))
        }
    }

    impl From<ImageError> for EncodingError {
        fn from(err: ImageError) -> Self {
            EncodingError::FrameWriteFailed(format!("{}", err))
        }
    }
}

#[cfg(test)]
mod test {
    use super::error::EncodingError;
    use super::Encoding;
    use image::GenericImageView;

    #[test]
    pub fn test_frame_to_image_clamps() {
        let enc = Encoding::new();
        let img = enc
            .frame_to_image(&[-0.5, 0.5, 1.5, 1.0, 0.0, 0.25], 2, 1, 3)
            .unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.to_rgb8().as_raw(), &vec![0u8, 127, 255, 255, 0, 63]);
    }

    #[test]
    pub fn test_frame_to_image_channels() {
        let enc = Encoding::new();
        let gray = enc.frame_to_image(&[0.0; 4], 2, 2, 1).unwrap();
        assert!(gray.as_luma8().is_some());
        let rgba = enc.frame_to_image(&[1.0; 16], 2, 2, 4).unwrap();
        assert!(rgba.as_rgba8().is_some());
        assert!(matches!(
            enc.frame_to_image(&[1.0; 15], 2, 2, 4),
            Err(EncodingError::InvalidLength)
        ));
        assert!(matches!(
            enc.frame_to_image(&[], u32::MAX, u32::MAX, 4),
            Err(EncodingError::InvalidSourceData(_))
        ));
    }
}
