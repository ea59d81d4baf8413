// EventLog - durable CSV prediction log
//
// One record per classification event, appended in arrival order. The
// header row is written once at log creation; stop() rewrites the file to
// header-only (deliberate clear-on-stop policy). All mutations go through
// one exclusive lock so concurrent evaluation ticks can never interleave
// partial lines. Records are formatted before the lock is taken, keeping
// hold time to the write itself.
//
// Lock acquisition is bounded: a try-lock retry budget, after which the
// failure escalates as a hard session error instead of blocking a tick
// indefinitely.

use log::debug;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use crate::analysis::ClassificationEvent;
use crate::error::RecordingError;

/// CSV header, matching the trained-model artifact's column order
pub const LOG_HEADER: &str =
    "timestamp,CI_Alpha,alpha_apen,beta_apen,theta_apen,prediction,label,confidence";

/// Delay between lock acquisition attempts
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Durable, lock-serialized CSV event log
pub struct EventLog {
    path: PathBuf,
    lock: Mutex<()>,
    retry_budget: u32,
}

impl EventLog {
    /// Open the log, writing the header row if the file does not exist yet
    pub fn create<P: AsRef<Path>>(path: P, retry_budget: u32) -> Result<Self, RecordingError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            fs::write(&path, format!("{}\n", LOG_HEADER))?;
            debug!("[EventLog] created {:?}", path);
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
            retry_budget,
        })
    }

    /// Append one event as a single CSV record
    pub fn append(&self, event: &ClassificationEvent) -> Result<(), RecordingError> {
        // Serialize outside the lock; hold time is the write only
        let record = format_record(event);
        let _guard = self.acquire()?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", record)?;
        Ok(())
    }

    /// Rewrite the file to header-only, discarding all data rows
    pub fn truncate_to_header(&self) -> Result<(), RecordingError> {
        let _guard = self.acquire()?;
        fs::write(&self.path, format!("{}\n", LOG_HEADER))?;
        debug!("[EventLog] truncated {:?} to header", self.path);
        Ok(())
    }

    /// Number of data rows currently persisted (excludes the header)
    pub fn data_row_count(&self) -> Result<usize, RecordingError> {
        let _guard = self.acquire()?;
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents.lines().skip(1).filter(|l| !l.is_empty()).count())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the log lock within the retry budget
    fn acquire(&self) -> Result<MutexGuard<'_, ()>, RecordingError> {
        for _ in 0..self.retry_budget {
            match self.lock.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => return Err(RecordingError::Poisoned),
                Err(TryLockError::WouldBlock) => std::thread::sleep(LOCK_RETRY_DELAY),
            }
        }
        Err(RecordingError::LockTimeout {
            attempts: self.retry_budget,
        })
    }
}

/// Format one event as a CSV record
///
/// Missing optional features become empty cells, the same way the
/// upstream CSV tooling reads them back as NaN.
fn format_record(event: &ClassificationEvent) -> String {
    fn opt(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    format!(
        "{},{},{},{},{},{},{},{}",
        event.timestamp.to_rfc3339(),
        event.ci_alpha,
        opt(event.alpha_apen),
        opt(event.beta_apen),
        opt(event.theta_apen),
        event.prediction,
        event.label.as_str(),
        event.confidence
    )
}
