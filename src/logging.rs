use crate::resources::ResourceFolder;
use slog::{o, Discard, Drain, Duplicate, Logger};
use sloggers::file::FileLoggerBuilder;
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

pub use self::error::LoggingError;

/// Tag attached to every record emitted by this package.
pub const PACK_PREFIX: &str = "video-export";

/// How chatty the encoder wrapper should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Normal
    }
}

impl Verbosity {
    pub fn severity(self) -> Severity {
        match self {
            Verbosity::Quiet => Severity::Warning,
            Verbosity::Normal => Severity::Info,
            Verbosity::Verbose => Severity::Debug,
        }
    }

    pub fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}

/// Colorized stderr logger, optionally mirrored into a rotating `app.log`.
pub fn create_logger(
    verbosity: Verbosity,
    log_folder: Option<&ResourceFolder>,
) -> Result<Logger, LoggingError> {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(verbosity.severity());
    builder.destination(Destination::Stderr);
    let terminal_logger = builder.build()?;

    let logger = match log_folder {
        Some(folder) => {
            let mut builder = FileLoggerBuilder::new(folder.path("app.log")?);
            builder.level(Severity::Debug);
            builder.rotate_size(1024 * 1024 * 10);
            let file_logger = builder.build()?;
            Logger::root(
                Duplicate::new(file_logger, terminal_logger).fuse(),
                o!("pack" => PACK_PREFIX),
            )
        }
        None => terminal_logger.new(o!("pack" => PACK_PREFIX)),
    };
    Ok(logger)
}

/// Child logger for one component, eg. `FFmpegPathResolver`.
pub fn component(parent: &Logger, name: &'static str) -> Logger {
    parent.new(o!("component" => name))
}

pub fn discard() -> Logger {
    Logger::root(Discard, o!())
}

pub mod error {
    use crate::resources::ResourceError;
    use std::fmt;

    #[derive(Debug)]
    pub enum LoggingError {
        InitFailed(String),
        InvalidLogFolder(String),
    }

    impl std::error::Error for LoggingError {}

    impl fmt::Display for LoggingError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl From<sloggers::Error> for LoggingError {
        fn from(err: sloggers::Error) -> Self {
            LoggingError::InitFailed(format!("{:?}", err))
        }
    }

    impl From<ResourceError> for LoggingError {
        fn from(err: ResourceError) -> Self {
            LoggingError::InvalidLogFolder(format!("{}", err))
        }
    }
}
