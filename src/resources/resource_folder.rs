pub use self::error::ResourceError;
use std::fs;
use std::fs::DirEntry;
use std::path::{Component, Path, PathBuf};

#[derive(Clone, Debug)]
pub struct ResourceFolder {
    ready: bool,
    path: PathBuf,
}

impl ResourceFolder {
    pub fn new<P: AsRef<Path>>(path: P) -> ResourceFolder {
        ResourceFolder {
            ready: false,
            path: PathBuf::from(path.as_ref()),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn require_existing(mut self) -> Result<ResourceFolder, ResourceError> {
        if !self.path.is_dir() {
            return Err(ResourceError::NoSuchFolder(format!("{:?}", self.path)));
        }
        self.ready = true;
        Ok(self)
    }

    pub fn require(mut self) -> Result<ResourceFolder, ResourceError> {
        if !self.exists() {
            std::fs::create_dir_all(&self.path)?;
        }
        self.ready = true;
        Ok(self)
    }

    pub fn path(&self, path: &str) -> Result<PathBuf, ResourceError> {
        if !self.ready {
            return Err(ResourceError::NotReady);
        }
        let mut child_path = self.path.clone();
        child_path.push(path);
        Ok(child_path)
    }

    pub fn basepath(&self) -> Result<PathBuf, ResourceError> {
        if !self.ready {
            return Err(ResourceError::NotReady);
        }
        Ok(self.path.clone())
    }

    /// A nested folder, created on demand. Only plain relative segments are accepted,
    /// so the result always stays inside this folder.
    pub fn child(&self, relative: &Path) -> Result<ResourceFolder, ResourceError> {
        if !self.ready {
            return Err(ResourceError::NotReady);
        }
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ResourceError::OutsideOfFolder(format!(
                "{:?} is not inside {:?}",
                relative, self.path
            )));
        }
        ResourceFolder::new(self.path.join(relative)).require()
    }

    /// Note this function enumerates all the files before returning so it can sort the results.
    pub fn enumerate_files(&self) -> Result<Vec<DirEntry>, ResourceError> {
        if !self.ready {
            return Err(ResourceError::NotReady);
        }
        let paths = fs::read_dir(&self.path)?;
        let mut sorted = paths
            .into_iter()
            .filter_map(Result::ok)
            .filter(|v| v.path().is_file())
            .collect::<Vec<DirEntry>>();
        sorted.sort_by_key(|v| v.file_name());
        Ok(sorted)
    }

    /// Next free counter for files named `<prefix>_<counter>_.<ext>`, starting at 1.
    pub fn next_counter(&self, prefix: &str) -> Result<u32, ResourceError> {
        let leader = format!("{}_", prefix);
        let highest = self
            .enumerate_files()?
            .iter()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let rest = name.strip_prefix(&leader)?;
                let digits = rest.split('_').next()?;
                digits.parse::<u32>().ok()
            })
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }
}

pub mod error {
    use std::io::Error;

    #[derive(Debug)]
    pub enum ResourceError {
        NotReady,
        NoSuchFolder(String),
        UnableToCreateFolder(String),
        OutsideOfFolder(String),
        InvalidConfig(String),
    }

    impl std::fmt::Display for ResourceError {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl std::error::Error for ResourceError {}

    impl From<std::io::Error> for ResourceError {
        fn from(err: Error) -> Self {
            ResourceError::UnableToCreateFolder(format!("{}", err))
        }
    }
}
