use crate::encoding::process::wait_with_timeout;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub trait ExecutableProbe {
    /// True if `candidate` runs and answers a version query successfully.
    /// Must not fail: anything that goes wrong is just `false`.
    fn probe(&self, candidate: &Path) -> bool;
}

/// Probes by running `<candidate> -version` with all output discarded.
pub struct CommandProbe {
    timeout: Duration,
}

impl Default for CommandProbe {
    fn default() -> Self {
        CommandProbe {
            timeout: PROBE_TIMEOUT,
        }
    }
}

impl CommandProbe {
    pub fn new() -> CommandProbe {
        Default::default()
    }

    pub fn with_timeout(timeout: Duration) -> CommandProbe {
        CommandProbe { timeout }
    }
}

impl ExecutableProbe for CommandProbe {
    fn probe(&self, candidate: &Path) -> bool {
        let child = Command::new(candidate)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match child {
            Ok(mut child) => match wait_with_timeout(&mut child, self.timeout) {
                Ok(Some(status)) => status.success(),
                _ => false,
            },
            Err(_) => false,
        }
    }
}
