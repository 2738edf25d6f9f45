use crate::encoding::error::EncodingError;
use slog::{error, info, warn, Logger};
use std::convert::TryFrom;
use std::fs;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const TEMP_AUDIO_FILE: &str = "temp_audio_for_ffmpeg.wav";

/// Audio samples laid out as `[batch][channel][sample]`, values nominally in -1..1.
#[derive(Debug, Clone)]
pub struct AudioWaveform {
    pub sample_rate: u32,
    pub batch: usize,
    pub channels: usize,
    pub samples: Vec<f32>,
}

impl AudioWaveform {
    pub fn samples_per_channel(&self) -> usize {
        let tracks = self.batch * self.channels;
        if tracks == 0 {
            0
        } else {
            self.samples.len() / tracks
        }
    }

    fn first_track(&self) -> &[f32] {
        let len = self.channels * self.samples_per_channel();
        &self.samples[..len]
    }
}

#[derive(Debug, Clone)]
pub enum AudioInput {
    /// An audio file ffmpeg can read directly.
    File(PathBuf),
    /// Raw samples that get written to a temporary WAV first.
    Waveform(AudioWaveform),
}

/// Work out which audio file to hand to ffmpeg, writing a temporary WAV into `scratch`
/// when needed. Any problem here drops the audio and the encode carries on video-only.
pub fn prepare_audio(input: &AudioInput, scratch: &Path, logger: &Logger) -> Option<PathBuf> {
    match input {
        AudioInput::File(path) => {
            if path.is_file() {
                info!(logger, "audio input prepared: {}", path.display());
                Some(path.clone())
            } else {
                warn!(logger, "audio file {} not found. Skipping audio.", path.display());
                None
            }
        }
        AudioInput::Waveform(waveform) => {
            if waveform.channels == 0 || waveform.samples_per_channel() == 0 {
                warn!(logger, "audio waveform empty. Skipping audio.");
                return None;
            }
            if waveform.samples.len() != waveform.batch * waveform.channels * waveform.samples_per_channel() {
                warn!(
                    logger,
                    "audio waveform of {} samples doesn't fit {} x {} tracks. Skipping.",
                    waveform.samples.len(),
                    waveform.batch,
                    waveform.channels
                );
                return None;
            }
            if waveform.batch > 1 {
                warn!(logger, "audio batch size {}. Using first track.", waveform.batch);
            }

            let path = scratch.join(TEMP_AUDIO_FILE);
            match write_wav(&path, waveform) {
                Ok(()) => {
                    info!(logger, "audio input prepared: {}", path.display());
                    Some(path)
                }
                Err(err) => {
                    error!(logger, "error saving temp audio: {}. Skipping audio.", err);
                    if path.exists() {
                        let _ = fs::remove_file(&path);
                    }
                    None
                }
            }
        }
    }
}

/// Write the first track of `waveform` as 16-bit PCM WAV.
pub fn write_wav(path: &Path, waveform: &AudioWaveform) -> Result<(), EncodingError> {
    let channels = waveform.channels;
    let frames = waveform.samples_per_channel();
    let track = waveform.first_track();

    let file = File::create(path)
        .map_err(|err| EncodingError::AudioPreparationFailed(format!("{:?}: {}", path, err)))?;
    let mut out = BufWriter::new(file);
    write_pcm16(&mut out, waveform.sample_rate, channels, frames, track)
        .and_then(|_| out.flush())
        .map_err(|err| EncodingError::AudioPreparationFailed(format!("{:?}: {}", path, err)))
}

fn write_pcm16<W: Write>(
    out: &mut W,
    sample_rate: u32,
    channels: usize,
    frames: usize,
    track: &[f32],
) -> io::Result<()> {
    let too_large = || io::Error::new(io::ErrorKind::InvalidInput, "audio too large for a WAV file");
    let bytes_per_sample = 2usize;
    let block_align = channels
        .checked_mul(bytes_per_sample)
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(too_large)?;
    let data_len = frames
        .checked_mul(block_align as usize)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v <= u32::MAX - 36)
        .ok_or_else(too_large)?;
    let byte_rate = sample_rate
        .checked_mul(u32::from(block_align))
        .ok_or_else(too_large)?;

    out.write_all(b"RIFF")?;
    out.write_all(&(36 + data_len).to_le_bytes())?;
    out.write_all(b"WAVE")?;
    out.write_all(b"fmt ")?;
    out.write_all(&16u32.to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?;
    out.write_all(&(channels as u16).to_le_bytes())?;
    out.write_all(&sample_rate.to_le_bytes())?;
    out.write_all(&byte_rate.to_le_bytes())?;
    out.write_all(&block_align.to_le_bytes())?;
    out.write_all(&16u16.to_le_bytes())?;
    out.write_all(b"data")?;
    out.write_all(&data_len.to_le_bytes())?;

    // Channels are stored planar; WAV wants them interleaved.
    for i in 0..frames {
        for c in 0..channels {
            let sample = track[c * frames + i].max(-1.0).min(1.0);
            out.write_all(&((sample * 32767.0).round() as i16).to_le_bytes())?;
        }
    }
    Ok(())
}
