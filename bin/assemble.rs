use crate::error::RuntimeError;
use rust_video_export::app::config::Manifest;
use rust_video_export::app::App;
use rust_video_export::encoding::{AudioInput, FrameBatch};
use rust_video_export::logging::create_logger;
use rust_video_export::resources::ResourceFolder;
use std::fs;
use std::path::PathBuf;
use std::process::exit;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

fn main() -> Result<(), RuntimeError> {
    let args = std::env::args().collect::<Vec<String>>();
    if args.len() != 2 {
        println!("usage: {} [MANIFEST]", args[0]);
        exit(1);
    }

    let settings = fs::read_to_string(&args[1])?;
    let manifest: Manifest = toml::from_str(settings.as_str())?;

    let log_folder = match &manifest.config.log_folder {
        Some(path) => Some(ResourceFolder::new(path).require()?),
        None => None,
    };
    let logger = create_logger(manifest.export.verbosity, log_folder.as_ref())?;

    let input = ResourceFolder::new(&manifest.export.input_folder).require_existing()?;
    let frames = FrameBatch::from_images(&image_files(&input)?)?;
    let audio = manifest
        .export
        .audio_file
        .as_ref()
        .map(|path| AudioInput::File(PathBuf::from(path)));

    let app = App::new(manifest, logger)?;
    let saved = app.export(&frames, audio.as_ref())?;
    println!("{}", saved.path.display());

    Ok(())
}

fn image_files(folder: &ResourceFolder) -> Result<Vec<PathBuf>, RuntimeError> {
    let files = folder
        .enumerate_files()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        })
        .collect::<Vec<PathBuf>>();
    if files.is_empty() {
        return Err(RuntimeError::Failed(
            "no images found in input folder".to_string(),
        ));
    }
    Ok(files)
}

mod error {
    use rust_video_export::app::error::AppError;
    use rust_video_export::encoding::error::EncodingError;
    use rust_video_export::logging::LoggingError;
    use rust_video_export::resources::ResourceError;
    use std::io;

    #[derive(Debug)]
    pub enum RuntimeError {
        Failed(String),
    }

    impl From<ResourceError> for RuntimeError {
        fn from(err: ResourceError) -> Self {
            RuntimeError::Failed(format!("{}", err))
        }
    }

    impl From<AppError> for RuntimeError {
        fn from(err: AppError) -> Self {
            RuntimeError::Failed(format!("{}", err))
        }
    }

    impl From<io::Error> for RuntimeError {
        fn from(err: io::Error) -> Self {
            RuntimeError::Failed(format!("{}", err))
        }
    }

    impl From<EncodingError> for RuntimeError {
        fn from(err: EncodingError) -> Self {
            RuntimeError::Failed(format!("{}", err))
        }
    }

    impl From<LoggingError> for RuntimeError {
        fn from(err: LoggingError) -> Self {
            RuntimeError::Failed(format!("{}", err))
        }
    }

    impl From<toml::de::Error> for RuntimeError {
        fn from(err: toml::de::Error) -> Self {
            RuntimeError::Failed(format!("invalid manifest: {}", err))
        }
    }
}
