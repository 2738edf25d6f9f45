use crate::encoding::error::EncodingError;
use crate::encoding::Encoding;
use image::{DynamicImage, GenericImageView};
use slog::{debug, error, Logger};
use std::path::{Path, PathBuf};

/// A batch of frames laid out as `[frame][row][column][channel]`, values nominally in 0..1.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<f32>,
}

impl FrameBatch {
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<f32>) -> Result<FrameBatch, EncodingError> {
        if width == 0 || height == 0 {
            return Err(EncodingError::InvalidSourceData(format!(
                "frame size {}x{} is empty",
                width, height
            )));
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(EncodingError::InvalidSourceData(format!(
                "unsupported channel count {}; expected 1, 3 or 4",
                channels
            )));
        }
        let frame_len = pixel_count(width, height, channels)?;
        if data.len() % frame_len != 0 {
            return Err(EncodingError::InvalidLength);
        }
        Ok(FrameBatch {
            width,
            height,
            channels,
            data,
        })
    }

    /// Load images from disk as an RGB batch. Every image must match the first one's size.
    pub fn from_images(paths: &[PathBuf]) -> Result<FrameBatch, EncodingError> {
        let mut data = Vec::new();
        let mut size: Option<(u32, u32)> = None;
        for path in paths {
            let img = image::open(path)
                .map_err(|err| EncodingError::InvalidSourceData(format!("{:?}: {}", path, err)))?;
            let dims = img.dimensions();
            match size {
                None => size = Some(dims),
                Some(expected) if expected != dims => {
                    return Err(EncodingError::InvalidSourceData(format!(
                        "{:?} is {}x{}, expected {}x{}",
                        path, dims.0, dims.1, expected.0, expected.1
                    )));
                }
                Some(_) => {}
            }
            data.extend(img.to_rgb8().as_raw().iter().map(|v| *v as f32 / 255.0));
        }
        match size {
            Some((width, height)) => FrameBatch::new(width, height, 3, data),
            None => Err(EncodingError::InvalidSourceData(
                "no images to load".to_string(),
            )),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.frame_len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let len = self.frame_len();
        self.data.get(index * len..(index + 1) * len)
    }

    pub fn to_image(&self, index: usize) -> Result<DynamicImage, EncodingError> {
        let pixels = self.frame(index).ok_or(EncodingError::InvalidLength)?;
        Encoding::new().frame_to_image(pixels, self.width, self.height, self.channels)
    }
}

/// Number of values in one `width x height x channels` frame, if it fits in memory at all.
pub(crate) fn pixel_count(width: u32, height: u32, channels: u32) -> Result<usize, EncodingError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(channels as usize))
        .ok_or_else(|| {
            EncodingError::InvalidSourceData(format!(
                "frame size {}x{}x{} is too large",
                width, height, channels
            ))
        })
}

/// Save every frame of `batch` into `folder` as `frame_000000.png`, `frame_000001.png`, ...
/// The first failure aborts the whole sequence.
pub fn write_frame_sequence(
    batch: &FrameBatch,
    folder: &Path,
    logger: &Logger,
) -> Result<Vec<PathBuf>, EncodingError> {
    let mut written = Vec::with_capacity(batch.len());
    for index in 0..batch.len() {
        let path = folder.join(format!("frame_{:06}.png", index));
        let saved = batch
            .to_image(index)
            .and_then(|img| img.save(&path).map_err(EncodingError::from));
        if let Err(err) = saved {
            error!(logger, "error processing frame {}: {}", index, err);
            return Err(EncodingError::FrameWriteFailed(format!("frame {}: {}", index, err)));
        }
        written.push(path);
    }
    debug!(logger, "wrote {} frames to {}", written.len(), folder.display());
    Ok(written)
}
