use crate::encoding::{AudioCodec, ContainerFormat, PixelFormat, VideoCodec, DEFAULT_AUDIO_BITRATE};
use crate::logging::Verbosity;

#[derive(Debug, serde::Deserialize)]
pub struct Manifest {
    pub config: ManifestConfig,

    pub export: ManifestExport,
}

#[derive(Debug, serde::Deserialize)]
pub struct ManifestConfig {
    /// Where to look for `ffmpeg_config.toml` and `ffmpeg_bin/`.
    #[serde(default = "default_package_root")]
    pub package_root: String,

    pub output_folder: String,

    /// Also write logs to `<log_folder>/app.log` when set.
    #[serde(default)]
    pub log_folder: Option<String>,

    /// Parent for the per-export scratch folders; the system temp folder if unset.
    #[serde(default)]
    pub scratch_folder: Option<String>,

    /// Wall-clock budget for one ffmpeg run, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, serde::Deserialize)]
pub struct ManifestExport {
    /// Folder of source images, encoded in file name order.
    pub input_folder: String,

    /// May contain subfolders, eg. `clips/take`.
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,

    #[serde(default = "default_fps")]
    pub fps: f64,

    #[serde(default)]
    pub codec: VideoCodec,

    #[serde(default)]
    pub pixel_format: PixelFormat,

    #[serde(default)]
    pub output_format: ContainerFormat,

    #[serde(default)]
    pub audio_file: Option<String>,

    #[serde(default)]
    pub audio_codec: AudioCodec,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_overwrite")]
    pub overwrite: bool,

    /// Save the first frame as a PNG next to the video.
    #[serde(default)]
    pub save_first_frame: bool,

    #[serde(default)]
    pub verbosity: Verbosity,
}

fn default_package_root() -> String {
    ".".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_filename_prefix() -> String {
    "video".to_string()
}

fn default_fps() -> f64 {
    16.0
}

fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

fn default_overwrite() -> bool {
    true
}

#[cfg(test)]
mod test {
    use super::Manifest;
    use crate::encoding::{AudioCodec, ContainerFormat, VideoCodec};
    use crate::logging::Verbosity;

    #[test]
    pub fn test_minimal_manifest_defaults() {
        let manifest: Manifest = toml::from_str(
            r#"
            [config]
            output_folder = "output"

            [export]
            input_folder = "frames"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.config.package_root, ".");
        assert_eq!(manifest.config.timeout_secs, 300);
        assert!(manifest.config.log_folder.is_none());
        assert_eq!(manifest.export.filename_prefix, "video");
        assert_eq!(manifest.export.fps, 16.0);
        assert_eq!(manifest.export.codec, VideoCodec::Libx264);
        assert_eq!(manifest.export.output_format, ContainerFormat::Mp4);
        assert_eq!(manifest.export.audio_codec, AudioCodec::Aac);
        assert_eq!(manifest.export.audio_bitrate, "192k");
        assert!(manifest.export.overwrite);
        assert!(!manifest.export.save_first_frame);
        assert_eq!(manifest.export.verbosity, Verbosity::Normal);
    }

    #[test]
    pub fn test_full_manifest() {
        let manifest: Manifest = toml::from_str(
            r#"
            [config]
            package_root = "/opt/pack"
            output_folder = "output"
            log_folder = "logs"
            timeout_secs = 60

            [export]
            input_folder = "frames"
            filename_prefix = "clips/take"
            fps = 24.0
            codec = "libsvtav1"
            pixel_format = "yuv420p10le"
            output_format = "mkv"
            audio_file = "track.wav"
            audio_codec = "copy"
            overwrite = false
            save_first_frame = true
            verbosity = "quiet"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.config.log_folder.as_deref(), Some("logs"));
        assert_eq!(manifest.export.codec, VideoCodec::Libsvtav1);
        assert_eq!(manifest.export.audio_codec, AudioCodec::Copy);
        assert_eq!(manifest.export.verbosity, Verbosity::Quiet);
        assert!(!manifest.export.overwrite);
    }
}
