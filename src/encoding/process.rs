use std::io;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// How long to sleep between checks on a running child.
const POLL_IDLE: Duration = Duration::from_millis(20);

/// How long to keep reading the pipes of a child killed for running too long.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct ProcessOutput {
    /// None when the child was killed for running past its deadline.
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }
}

/// Poll `child` until it exits or `timeout` elapses. On timeout the child is killed and
/// reaped, and `Ok(None)` is returned.
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        }
        if start.elapsed() >= timeout {
            // The child may have exited between the check and the kill; both outcomes are fine.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        sleep(POLL_IDLE);
    }
}

/// Run `cmd` with stdin closed, capturing both output streams as text.
/// Streams are drained on their own threads so a chatty child can't stall on a full pipe,
/// and whatever was written before a timeout is still returned.
///
/// After a timeout the pipes are read for at most `DRAIN_GRACE` more; a grandchild that
/// inherited them can keep them open long after the child itself is gone.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<ProcessOutput> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let status = wait_with_timeout(&mut child, timeout)?;

    let grace = match status {
        Some(_) => None,
        None => Some(DRAIN_GRACE),
    };
    Ok(ProcessOutput {
        status,
        stdout: collect(stdout, grace),
        stderr: collect(stderr, grace),
    })
}

/// Bytes read so far from one pipe, plus a signal once the pipe hits end of file.
struct StreamReader {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> Option<StreamReader> {
    source.map(|mut stream| {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (sender, done) = mpsc::channel();
        let shared = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match shared.lock() {
                        Ok(mut bytes) => bytes.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
            let _ = sender.send(());
        });
        StreamReader { buffer, done }
    })
}

/// Wait for the reader to finish (for at most `grace`, if given) and return what it has.
fn collect(reader: Option<StreamReader>, grace: Option<Duration>) -> String {
    let reader = match reader {
        Some(reader) => reader,
        None => return String::new(),
    };
    match grace {
        Some(grace) => {
            let _ = reader.done.recv_timeout(grace);
        }
        None => {
            let _ = reader.done.recv();
        }
    }
    let bytes = reader
        .buffer
        .lock()
        .map(|bytes| bytes.clone())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).to_string()
}
