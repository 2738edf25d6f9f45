use crate::app::error::AppError;
use crate::encoding::FrameBatch;
use crate::resources::ResourceFolder;
use slog::info;
use slog::Logger;
use std::path::PathBuf;

/// Saves single frames next to the exported video.
pub struct ImageLogger {
    output_folder: ResourceFolder,
    logger: Logger,
}

impl ImageLogger {
    pub fn new(output_folder: ResourceFolder, logger: Logger) -> ImageLogger {
        ImageLogger {
            output_folder,
            logger,
        }
    }

    pub(crate) fn save(&self, frames: &FrameBatch, index: usize, stem: &str) -> Result<PathBuf, AppError> {
        let filename = format!("{}.png", stem);
        let filepath = self.output_folder.path(&filename)?;
        frames.to_image(index)?.save(&filepath)?;
        info!(self.logger, "saved frame {} as {}", index, filepath.display());
        Ok(filepath)
    }
}
