pub mod config;
mod image_logger;

use self::config::Manifest;
use self::error::AppError;
use crate::app::image_logger::ImageLogger;
use crate::encoding::{
    prepare_audio, write_frame_sequence, AudioInput, AudioTrack, EncodeOutcome, EncodeRequest,
    Encoding, FrameBatch,
};
use crate::locator;
use crate::logging;
use crate::resources::ResourceFolder;
use slog::{error, info, Logger};
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOG_COMPONENT: &str = "SaveVideoFFMPEG";

/// Where one export lands, relative to the output folder.
#[derive(Debug, Clone)]
pub struct SavedVideo {
    pub path: PathBuf,
    pub filename: String,
    pub subfolder: PathBuf,
    /// The first frame as PNG, when requested.
    pub first_frame: Option<PathBuf>,
    pub outcome: EncodeOutcome,
}

struct OutputTarget {
    folder: ResourceFolder,
    subfolder: PathBuf,
    stem: String,
}

pub struct App {
    manifest: Manifest,
    output: ResourceFolder,
    scratch: Option<ResourceFolder>,
    executable: PathBuf,
    encoding: Encoding,
    logger: Logger,
}

impl App {
    /// Resolve the encoder for the manifest's package root (once per process) and
    /// prepare the output folder.
    pub fn new(manifest: Manifest, logger: Logger) -> Result<App, AppError> {
        let root = PathBuf::from(&manifest.config.package_root);
        let executable = locator::resolve_global(&root, &logger).path().to_path_buf();
        App::with_executable(manifest, executable, logger)
    }

    pub fn with_executable(manifest: Manifest, executable: PathBuf, logger: Logger) -> Result<App, AppError> {
        let output = ResourceFolder::new(&manifest.config.output_folder).require()?;
        let scratch = match &manifest.config.scratch_folder {
            Some(path) => Some(ResourceFolder::new(path).require()?),
            None => None,
        };
        let encoding = Encoding::with_timeout(Duration::from_secs(manifest.config.timeout_secs));
        info!(logger, "will use ffmpeg at: {}", executable.display());
        Ok(App {
            manifest,
            output,
            scratch,
            executable,
            encoding,
            logger: logging::component(&logger, LOG_COMPONENT),
        })
    }

    /// Write `frames` to a scratch folder, encode them (with `audio`, if it can be prepared)
    /// and return where the video went. The scratch folder is removed however this ends.
    pub fn export(&self, frames: &FrameBatch, audio: Option<&AudioInput>) -> Result<SavedVideo, AppError> {
        let settings = &self.manifest.export;
        if frames.is_empty() {
            error!(self.logger, "no frames to process (batch size is 0)");
            return Err(AppError::NoFrames);
        }

        let target = self.output_target()?;
        let filename = format!("{}.{}", target.stem, settings.output_format.extension());
        let output_path = target.folder.path(&filename)?;

        let scratch = self.create_scratch()?;
        write_frame_sequence(frames, scratch.path(), &self.logger)?;

        let audio = audio
            .and_then(|input| prepare_audio(input, scratch.path(), &self.logger))
            .map(|path| AudioTrack {
                path,
                codec: settings.audio_codec,
                bitrate: settings.audio_bitrate.clone(),
            });

        let request = EncodeRequest {
            frame_sequence_dir: scratch.path().to_path_buf(),
            frame_count: frames.len(),
            fps: settings.fps,
            video_codec: settings.codec,
            pixel_format: settings.pixel_format,
            container_format: settings.output_format,
            audio,
            verbosity: settings.verbosity,
            output_path: output_path.clone(),
            overwrite: settings.overwrite,
        };

        let outcome = self
            .encoding
            .encode(&self.executable, &request, &self.logger)?
            .into_result()?;

        let first_frame = if settings.save_first_frame {
            let images = ImageLogger::new(target.folder.clone(), self.logger.clone());
            Some(images.save(frames, 0, &target.stem)?)
        } else {
            None
        };

        Ok(SavedVideo {
            path: output_path,
            filename,
            subfolder: target.subfolder,
            first_frame,
            outcome,
        })
    }

    fn create_scratch(&self) -> Result<tempfile::TempDir, AppError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("video-export-");
        let dir = match &self.scratch {
            Some(folder) => builder.tempdir_in(folder.basepath()?)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Split `filename_prefix` into a subfolder and a stem, then pick the next free counter:
    /// `clips/take` becomes `<output>/clips/take_00003_`.
    fn output_target(&self) -> Result<OutputTarget, AppError> {
        let prefix = Path::new(&self.manifest.export.filename_prefix);
        let base = prefix
            .file_name()
            .map(|v| v.to_string_lossy().trim_end_matches('_').to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::InvalidPrefix(self.manifest.export.filename_prefix.clone()))?;
        let subfolder = prefix.parent().map(Path::to_path_buf).unwrap_or_default();

        let folder = self.output.child(&subfolder).map_err(|err| {
            AppError::InvalidPrefix(format!("{}: {}", self.manifest.export.filename_prefix, err))
        })?;
        let counter = folder.next_counter(&base)?;
        Ok(OutputTarget {
            folder,
            subfolder,
            stem: format!("{}_{:05}_", base, counter),
        })
    }
}

pub mod error {
    use crate::encoding::error::EncodingError;
    use crate::resources::ResourceError;
    use image::ImageError;
    use std::fmt;
    use std::io;

    #[derive(Debug)]
    pub enum AppError {
        InvalidResource(String),
        InvalidPrefix(String),
        NoFrames,
        OutputError(String),
        EncodingFailed(EncodingError),
    }

    impl std::error::Error for AppError {}

    impl fmt::Display for AppError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl From<ResourceError> for AppError {
        fn from(err: ResourceError) -> Self {
            AppError::InvalidResource(format!("{:?}", err))
        }
    }

    impl From<EncodingError> for AppError {
        fn from(err: EncodingError) -> Self {
            AppError::EncodingFailed(err)
        }
    }

    impl From<ImageError> for AppError {
        fn from(err: ImageError) -> Self {
            AppError::OutputError(format!("failed to save frame: {:?}", err))
        }
    }

    impl From<io::Error> for AppError {
        fn from(err: io::Error) -> Self {
            AppError::OutputError(format!("{}", err))
        }
    }
}
