use crate::resources::ResourceError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A flat string view over one table of a TOML file.
#[derive(Clone, Debug)]
pub struct ConfigMap {
    data: HashMap<String, String>,
}

impl Default for ConfigMap {
    fn default() -> Self {
        ConfigMap {
            data: HashMap::new(),
        }
    }
}

impl ConfigMap {
    pub fn new() -> ConfigMap {
        Default::default()
    }

    /// Load `[section]` from the TOML file at `path`.
    /// A missing file or missing section gives an empty map; a file that exists but
    /// can't be read or parsed is an error.
    pub fn load_section<P: AsRef<Path>>(path: P, section: &str) -> Result<ConfigMap, ResourceError> {
        let path = path.as_ref();
        let mut config = ConfigMap::new();
        if !path.exists() {
            return Ok(config);
        }

        let raw = fs::read_to_string(path)
            .map_err(|err| ResourceError::InvalidConfig(format!("{:?}: {}", path, err)))?;
        let document = raw
            .parse::<toml::Value>()
            .map_err(|err| ResourceError::InvalidConfig(format!("{:?}: {}", path, err)))?;

        if let Some(table) = document.get(section).and_then(toml::Value::as_table) {
            for (key, value) in table.iter() {
                match value {
                    toml::Value::String(s) => config.set(key, s),
                    other => config.set(key, other.to_string()),
                }
            }
        }
        Ok(config)
    }

    pub fn set<A: AsRef<str>, B: AsRef<str>>(&mut self, key: A, value: B) {
        let _ = self
            .data
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
    }

    pub fn get_string<T: AsRef<str>>(&self, key: T) -> Option<String> {
        self.data.get(key.as_ref()).map(|v| v.to_string())
    }

    /// Like `get_string`, but whitespace-only values count as unset.
    pub fn get_non_empty<T: AsRef<str>>(&self, key: T) -> Option<String> {
        self.get_string(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::ConfigMap;
    use crate::resources::ResourceError;
    use std::fs;

    #[test]
    pub fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigMap::load_section(dir.path().join("nope.toml"), "ffmpeg").unwrap();
        assert_eq!(config.get_string("custom_ffmpeg_path"), None);
    }

    #[test]
    pub fn test_reads_section_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg_config.toml");
        fs::write(
            &path,
            "[ffmpeg]\ncustom_ffmpeg_path = \"  /opt/ffmpeg/bin  \"\nthreads = 4\n",
        )
        .unwrap();

        let config = ConfigMap::load_section(&path, "ffmpeg").unwrap();
        assert_eq!(
            config.get_non_empty("custom_ffmpeg_path"),
            Some("/opt/ffmpeg/bin".to_string())
        );
        assert_eq!(config.get_string("threads"), Some("4".to_string()));
    }

    #[test]
    pub fn test_missing_section_and_blank_value_are_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg_config.toml");
        fs::write(&path, "[other]\ncustom_ffmpeg_path = \"x\"\n").unwrap();
        let config = ConfigMap::load_section(&path, "ffmpeg").unwrap();
        assert_eq!(config.get_string("custom_ffmpeg_path"), None);

        let mut config = ConfigMap::new();
        config.set("custom_ffmpeg_path", "   ");
        assert_eq!(config.get_non_empty("custom_ffmpeg_path"), None);
    }

    #[test]
    pub fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg_config.toml");
        fs::write(&path, "[ffmpeg\ncustom_ffmpeg_path = ").unwrap();
        match ConfigMap::load_section(&path, "ffmpeg") {
            Err(ResourceError::InvalidConfig(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
