//! Transport poller: upload a request, wait for the reply, download it.
//!
//! The file-transfer session itself is a collaborator behind [`FileTransfer`];
//! this module owns only the naming and polling contract.

use crate::error::BbdlError;
use crate::options::Options;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Remote file-transfer session. Not assumed thread-safe.
pub trait FileTransfer {
    /// Upload a local text file under `remote` name.
    fn put_text(&mut self, local: &Path, remote: &str) -> Result<(), BbdlError>;

    /// Remove a remote file. Callers treat failure as non-fatal.
    fn delete(&mut self, remote: &str) -> Result<(), BbdlError>;

    /// Names currently present in the remote directory.
    fn list(&mut self) -> Result<Vec<String>, BbdlError>;

    /// Download `remote` into `local` byte-for-byte.
    fn get_binary(&mut self, remote: &str, local: &Path) -> Result<(), BbdlError>;

    fn close(&mut self) -> Result<(), BbdlError>;
}

impl<T: FileTransfer + ?Sized> FileTransfer for Box<T> {
    fn put_text(&mut self, local: &Path, remote: &str) -> Result<(), BbdlError> {
        (**self).put_text(local, remote)
    }

    fn delete(&mut self, remote: &str) -> Result<(), BbdlError> {
        (**self).delete(remote)
    }

    fn list(&mut self) -> Result<Vec<String>, BbdlError> {
        (**self).list()
    }

    fn get_binary(&mut self, remote: &str, local: &Path) -> Result<(), BbdlError> {
        (**self).get_binary(remote, local)
    }

    fn close(&mut self) -> Result<(), BbdlError> {
        (**self).close()
    }
}

/// Poll timing. The total budget is roughly `interval * max_attempts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub deadline: Option<Instant>,
}

impl PollConfig {
    /// `wait_time` minutes split into `poll_interval`-second attempts.
    pub fn from_options(options: &Options) -> Self {
        let interval = options.poll_interval.max(1);
        let attempts = (u64::from(options.wait_time) * 60 / interval).max(1);
        Self {
            interval: Duration::from_secs(interval),
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
            deadline: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Time to sleep before the next poll, capped at the deadline.
    /// `None` once the deadline has passed.
    fn next_sleep(&self) -> Option<Duration> {
        match self.deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                (!left.is_zero()).then(|| self.interval.min(left))
            }
            None => Some(self.interval),
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Cloneable cancellation handle shared with whoever drives the poll loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(|e| e.into_inner()) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep up to `dur`, waking early on cancel. Returns true if cancelled.
    pub fn sleep(&self, dur: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = cvar
            .wait_timeout_while(guard, dur, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

fn file_name(path: &Path) -> Result<String, BbdlError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| BbdlError::validation(format!("no file name in {}", path.display())))
}

/// Listing entries may carry a directory prefix.
fn remote_basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn with_gz(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".gz");
    PathBuf::from(s)
}

/// Upload `request`, wait for the reply, and leave it decompressed at `response`.
pub fn send<T: FileTransfer + ?Sized>(
    session: &mut T,
    request: &Path,
    response: &Path,
    options: &Options,
    poll: &PollConfig,
    cancel: &CancelToken,
) -> Result<PathBuf, BbdlError> {
    let zipped = options.compressed || options.is_history();
    let request_name = file_name(request)?;
    let mut response_name = file_name(response)?;
    if zipped {
        response_name.push_str(".gz");
    }

    if let Err(e) = session.delete(&response_name) {
        debug!(file = %response_name, "delete before upload failed: {e}");
    }
    session.put_text(request, &request_name)?;
    debug!(request = %request_name, expect = %response_name, "request uploaded");

    let timeout = |attempts| BbdlError::Timeout {
        filename: response_name.clone(),
        attempts,
    };

    for attempt in 1..=poll.max_attempts {
        let Some(nap) = poll.next_sleep() else {
            debug!(attempt, "poll deadline passed");
            return Err(timeout(attempt - 1));
        };
        if cancel.sleep(nap) {
            debug!(attempt, "poll cancelled");
            return Err(timeout(attempt - 1));
        }
        if poll.deadline_passed() {
            debug!(attempt, "poll deadline passed");
            return Err(timeout(attempt - 1));
        }

        let listing = session.list()?;
        debug!(attempt, files = listing.len(), "polled remote listing");
        let Some(found) = listing
            .into_iter()
            .find(|n| remote_basename(n) == response_name)
        else {
            continue;
        };

        let local = if zipped {
            with_gz(response)
        } else {
            response.to_path_buf()
        };
        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        session.get_binary(&found, &local)?;
        return if zipped { unzip(&local) } else { Ok(local) };
    }

    Err(timeout(poll.max_attempts))
}

/// Decompress `x.gz` into `x` and remove the compressed file.
pub fn unzip(path: &Path) -> Result<PathBuf, BbdlError> {
    if path.extension().and_then(|e| e.to_str()) != Some("gz") {
        return Err(BbdlError::validation(format!(
            "not a .gz file: {}",
            path.display()
        )));
    }
    let target = path.with_extension("");
    {
        let mut decoder = GzDecoder::new(BufReader::new(File::open(path)?));
        let mut out = BufWriter::new(File::create(&target)?);
        io::copy(&mut decoder, &mut out)?;
    }
    fs::remove_file(path)?;
    Ok(target)
}
