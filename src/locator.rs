mod probe;

pub use self::error::LocatorError;
pub use self::probe::{CommandProbe, ExecutableProbe, PROBE_TIMEOUT};

use crate::logging;
use crate::resources::ConfigMap;
use slog::{debug, error, info, warn, Logger};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[cfg(target_os = "windows")]
pub const EXECUTABLE_NAME: &str = "ffmpeg.exe";
#[cfg(not(target_os = "windows"))]
pub const EXECUTABLE_NAME: &str = "ffmpeg";

/// Optional config file under the package root naming a custom encoder location.
pub const CONFIG_FILE: &str = "ffmpeg_config.toml";
pub const CONFIG_SECTION: &str = "ffmpeg";
pub const CONFIG_KEY: &str = "custom_ffmpeg_path";

/// Folder under the package root that may carry a bundled encoder.
pub const BUNDLE_FOLDER: &str = "ffmpeg_bin";

const LOG_COMPONENT: &str = "FFmpegPathResolver";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableSource {
    Config,
    LocalBundle,
    SystemPath,
    Fallback,
}

impl fmt::Display for ExecutableSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ExecutableSource::Config => "config",
            ExecutableSource::LocalBundle => "local_bin",
            ExecutableSource::SystemPath => "system_path",
            ExecutableSource::Fallback => "fallback",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExecutable {
    path: PathBuf,
    source: ExecutableSource,
}

impl ResolvedExecutable {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> ExecutableSource {
        self.source
    }
}

/// Finds the encoder executable once and remembers the answer.
/// Concurrent first calls to `resolve` still run the tiers exactly once; the result is
/// never re-probed, even if the binary moves afterwards.
pub struct ExecutableLocator<P: ExecutableProbe = CommandProbe> {
    probe: P,
    logger: Logger,
    resolved: OnceLock<ResolvedExecutable>,
}

impl ExecutableLocator<CommandProbe> {
    pub fn new(logger: &Logger) -> ExecutableLocator<CommandProbe> {
        ExecutableLocator::with_probe(CommandProbe::new(), logger)
    }
}

impl<P: ExecutableProbe> ExecutableLocator<P> {
    pub fn with_probe(probe: P, logger: &Logger) -> ExecutableLocator<P> {
        ExecutableLocator {
            probe,
            logger: logging::component(logger, LOG_COMPONENT),
            resolved: OnceLock::new(),
        }
    }

    /// Resolve against `package_root` on the first call; later calls return the cached
    /// value whatever root they pass.
    pub fn resolve(&self, package_root: &Path) -> &ResolvedExecutable {
        self.resolved
            .get_or_init(|| resolve_tiers(package_root, &self.probe, &self.logger))
    }

    pub fn resolved(&self) -> Result<&ResolvedExecutable, LocatorError> {
        self.resolved.get().ok_or(LocatorError::Uninitialized)
    }
}

static GLOBAL: OnceLock<ResolvedExecutable> = OnceLock::new();

/// Process-wide `resolve`, using the real `-version` probe.
pub fn resolve_global(package_root: &Path, logger: &Logger) -> &'static ResolvedExecutable {
    GLOBAL.get_or_init(|| ExecutableLocator::new(logger).resolve(package_root).clone())
}

/// The process-wide result, or `Uninitialized` if `resolve_global` hasn't run yet.
pub fn resolved_global() -> Result<&'static ResolvedExecutable, LocatorError> {
    GLOBAL.get().ok_or(LocatorError::Uninitialized)
}

type Tier<P> = fn(&Path, &P, &Logger) -> Option<ResolvedExecutable>;

fn resolve_tiers<P: ExecutableProbe>(root: &Path, probe: &P, logger: &Logger) -> ResolvedExecutable {
    let tiers: [Tier<P>; 3] = [from_config, from_bundle, from_system_path];
    tiers
        .iter()
        .find_map(|tier| tier(root, probe, logger))
        .unwrap_or_else(|| {
            error!(
                logger,
                "ffmpeg ('{}') not found or not working anywhere; falling back to the bare name",
                EXECUTABLE_NAME
            );
            ResolvedExecutable {
                path: PathBuf::from(EXECUTABLE_NAME),
                source: ExecutableSource::Fallback,
            }
        })
}

fn run_probe<P: ExecutableProbe>(probe: &P, candidate: &Path, logger: &Logger) -> bool {
    debug!(logger, "testing ffmpeg at: {}", candidate.display());
    probe.probe(candidate)
}

fn from_config<P: ExecutableProbe>(root: &Path, probe: &P, logger: &Logger) -> Option<ResolvedExecutable> {
    let config = match ConfigMap::load_section(root.join(CONFIG_FILE), CONFIG_SECTION) {
        Ok(config) => config,
        Err(err) => {
            warn!(logger, "error reading {}: {}", CONFIG_FILE, err);
            return None;
        }
    };
    let configured = config.get_non_empty(CONFIG_KEY)?;

    let configured = PathBuf::from(configured);
    let absolute = if configured.is_absolute() {
        configured
    } else {
        root.join(configured)
    };

    match config_candidate(&absolute) {
        Some(candidate) if run_probe(probe, &candidate, logger) => {
            info!(logger, "using ffmpeg from configured path: {}", candidate.display());
            Some(ResolvedExecutable {
                path: candidate,
                source: ExecutableSource::Config,
            })
        }
        candidate => {
            warn!(
                logger,
                "ffmpeg not working at configured path '{}'. Checking other locations.",
                candidate.as_ref().unwrap_or(&absolute).display()
            );
            None
        }
    }
}

/// A configured directory gets the executable name appended; a configured file is used
/// only if its name ends with the executable name.
fn config_candidate(absolute: &Path) -> Option<PathBuf> {
    if absolute.is_dir() {
        return Some(absolute.join(EXECUTABLE_NAME));
    }
    let name = absolute.file_name()?.to_string_lossy().to_lowercase();
    if absolute.is_file() && name.ends_with(EXECUTABLE_NAME) {
        Some(absolute.to_path_buf())
    } else {
        None
    }
}

fn from_bundle<P: ExecutableProbe>(root: &Path, probe: &P, logger: &Logger) -> Option<ResolvedExecutable> {
    let candidate = root.join(BUNDLE_FOLDER).join(EXECUTABLE_NAME);
    if run_probe(probe, &candidate, logger) {
        info!(logger, "using ffmpeg from local '{}': {}", BUNDLE_FOLDER, candidate.display());
        Some(ResolvedExecutable {
            path: candidate,
            source: ExecutableSource::LocalBundle,
        })
    } else {
        info!(
            logger,
            "ffmpeg not in local '{}' or not working. Checking system PATH.", BUNDLE_FOLDER
        );
        None
    }
}

fn from_system_path<P: ExecutableProbe>(_root: &Path, probe: &P, logger: &Logger) -> Option<ResolvedExecutable> {
    let candidate = PathBuf::from(EXECUTABLE_NAME);
    if run_probe(probe, &candidate, logger) {
        info!(logger, "using ffmpeg from system PATH: '{}'", candidate.display());
        Some(ResolvedExecutable {
            path: candidate,
            source: ExecutableSource::SystemPath,
        })
    } else {
        None
    }
}

pub mod error {
    use std::fmt;

    #[derive(Debug, PartialEq, Eq)]
    pub enum LocatorError {
        /// The executable was requested before anything resolved it.
        Uninitialized,
    }

    impl fmt::Display for LocatorError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl std::error::Error for LocatorError {}
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::logging::capture::CapturedLog;
    use crate::logging::discard;
    use slog::Level;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Answers `true` only for the listed paths and records every call.
    #[derive(Default)]
    struct ScriptedProbe {
        working: Vec<PathBuf>,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl ScriptedProbe {
        fn working(paths: Vec<PathBuf>) -> ScriptedProbe {
            ScriptedProbe {
                working: paths,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ExecutableProbe for ScriptedProbe {
        fn probe(&self, candidate: &Path) -> bool {
            self.calls.lock().unwrap().push(candidate.to_path_buf());
            self.working.iter().any(|p| p == candidate)
        }
    }

    impl<'a> ExecutableProbe for &'a ScriptedProbe {
        fn probe(&self, candidate: &Path) -> bool {
            (**self).probe(candidate)
        }
    }

    fn write_config(root: &Path, value: &str) {
        fs::write(
            root.join(CONFIG_FILE),
            format!("[{}]\n{} = '{}'\n", CONFIG_SECTION, CONFIG_KEY, value),
        )
        .unwrap();
    }

    fn bundled(root: &Path) -> PathBuf {
        root.join(BUNDLE_FOLDER).join(EXECUTABLE_NAME)
    }

    #[test]
    pub fn test_uninitialized_access_fails() {
        let locator = ExecutableLocator::with_probe(ScriptedProbe::default(), &discard());
        assert_eq!(locator.resolved().err(), Some(LocatorError::Uninitialized));
    }

    #[test]
    pub fn test_config_directory_wins_and_stops_probing() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("tools");
        fs::create_dir(&custom).unwrap();
        write_config(dir.path(), "tools");

        let expected = custom.join(EXECUTABLE_NAME);
        let probe = ScriptedProbe::working(vec![expected.clone(), bundled(dir.path())]);
        let locator = ExecutableLocator::with_probe(&probe, &discard());

        let resolved = locator.resolve(dir.path());
        assert_eq!(resolved.source(), ExecutableSource::Config);
        assert_eq!(resolved.path(), expected.as_path());
        assert_eq!(probe.calls(), vec![expected]);
    }

    #[test]
    pub fn test_config_file_path_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("custom").join(EXECUTABLE_NAME);
        fs::create_dir_all(exe.parent().unwrap()).unwrap();
        fs::write(&exe, b"").unwrap();
        write_config(dir.path(), &exe.to_string_lossy());

        let probe = ScriptedProbe::working(vec![exe.clone()]);
        let locator = ExecutableLocator::with_probe(&probe, &discard());
        assert_eq!(locator.resolve(dir.path()).path(), exe.as_path());
        assert_eq!(locator.resolved().unwrap().source(), ExecutableSource::Config);
    }

    #[test]
    pub fn test_bundle_wins_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let probe = ScriptedProbe::working(vec![bundled(dir.path())]);
        let locator = ExecutableLocator::with_probe(&probe, &discard());

        let resolved = locator.resolve(dir.path());
        assert_eq!(resolved.source(), ExecutableSource::LocalBundle);
        assert_eq!(probe.calls(), vec![bundled(dir.path())]);
    }

    #[test]
    pub fn test_invalid_config_falls_through_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "does/not/exist");
        let captured = CapturedLog::new();

        let probe = ScriptedProbe::working(vec![PathBuf::from(EXECUTABLE_NAME)]);
        let locator = ExecutableLocator::with_probe(&probe, &captured.logger());

        let resolved = locator.resolve(dir.path());
        assert_eq!(resolved.source(), ExecutableSource::SystemPath);
        assert_eq!(resolved.path(), Path::new(EXECUTABLE_NAME));
        assert_eq!(
            probe.calls(),
            vec![bundled(dir.path()), PathBuf::from(EXECUTABLE_NAME)]
        );

        let warning = captured
            .position(Level::Warning, "does/not/exist")
            .expect("warning naming the configured path");
        let bundle_info = captured.position(Level::Info, BUNDLE_FOLDER).unwrap();
        assert!(warning < bundle_info);
    }

    #[test]
    pub fn test_config_file_with_other_name_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("encoder.sh"), b"").unwrap();
        write_config(dir.path(), "encoder.sh");
        let captured = CapturedLog::new();

        let probe = ScriptedProbe::working(vec![
            dir.path().join("encoder.sh"),
            bundled(dir.path()),
        ]);
        let locator = ExecutableLocator::with_probe(&probe, &captured.logger());

        let resolved = locator.resolve(dir.path());
        assert_eq!(resolved.source(), ExecutableSource::LocalBundle);
        assert_eq!(probe.calls(), vec![bundled(dir.path())]);
        assert!(captured.position(Level::Warning, "encoder.sh").is_some());
    }

    #[test]
    pub fn test_failed_config_probe_is_never_reported() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("tools");
        fs::create_dir(&custom).unwrap();
        write_config(dir.path(), "tools");

        let probe = ScriptedProbe::working(vec![bundled(dir.path())]);
        let locator = ExecutableLocator::with_probe(&probe, &discard());

        let resolved = locator.resolve(dir.path());
        assert_eq!(resolved.source(), ExecutableSource::LocalBundle);
        assert_eq!(
            probe.calls(),
            vec![custom.join(EXECUTABLE_NAME), bundled(dir.path())]
        );
    }

    #[test]
    pub fn test_corrupt_config_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[ffmpeg\n=").unwrap();
        let captured = CapturedLog::new();

        let probe = ScriptedProbe::working(vec![bundled(dir.path())]);
        let locator = ExecutableLocator::with_probe(&probe, &captured.logger());
        assert_eq!(locator.resolve(dir.path()).source(), ExecutableSource::LocalBundle);
        assert!(captured.position(Level::Warning, CONFIG_FILE).is_some());
    }

    #[test]
    pub fn test_fallback_when_nothing_works() {
        let dir = tempfile::tempdir().unwrap();
        let captured = CapturedLog::new();
        let probe = ScriptedProbe::default();
        let locator = ExecutableLocator::with_probe(&probe, &captured.logger());

        let resolved = locator.resolve(dir.path());
        assert_eq!(resolved.source(), ExecutableSource::Fallback);
        assert_eq!(resolved.path(), Path::new(EXECUTABLE_NAME));
        assert_eq!(probe.calls().len(), 2);
        assert!(captured.position(Level::Error, "falling back").is_some());
    }

    #[test]
    pub fn test_resolve_is_idempotent() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let probe = ScriptedProbe::working(vec![bundled(first.path()), bundled(second.path())]);
        let locator = ExecutableLocator::with_probe(&probe, &discard());

        let a = locator.resolve(first.path()).clone();
        let b = locator.resolve(second.path()).clone();
        assert_eq!(a, b);
        assert_eq!(b.path(), bundled(first.path()).as_path());
        assert_eq!(probe.calls().len(), 1);
    }

    #[test]
    pub fn test_concurrent_first_resolve_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let probe = ScriptedProbe::working(vec![bundled(&root)]);
        let locator = Arc::new(ExecutableLocator::with_probe(probe, &discard()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locator = Arc::clone(&locator);
                let root = root.clone();
                thread::spawn(move || locator.resolve(&root).clone())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().source(), ExecutableSource::LocalBundle);
        }
        assert_eq!(locator.probe.calls().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    pub fn test_default_locator_runs_bundled_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let exe = bundled(dir.path());
        fs::create_dir_all(exe.parent().unwrap()).unwrap();
        fs::write(&exe, "#!/bin/sh\necho 'ffmpeg version 6'\n").unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

        let locator = ExecutableLocator::new(&discard());
        let resolved = locator.resolve(dir.path());
        assert_eq!(resolved.source(), ExecutableSource::LocalBundle);
        assert_eq!(resolved.path(), exe.as_path());
    }

    #[test]
    pub fn test_source_names() {
        assert_eq!(ExecutableSource::LocalBundle.to_string(), "local_bin");
        assert_eq!(ExecutableSource::Fallback.to_string(), "fallback");
    }
}
