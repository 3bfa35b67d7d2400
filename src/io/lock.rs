use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock held for the length of a sync run.
///
/// The engine assumes it is the only writer of a workbook while a run is in
/// progress; the lock makes that hold between relsync processes sharing a
/// workbook file. Uses flock on Unix. The lock file is left in place when
/// the lock is released: every run must lock the same inode.
pub struct WorkbookLock {
    _file: File,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not lock {path}: another relsync run may be in progress")]
    Timeout { path: PathBuf },
}

/// `workbook.json` → `workbook.json.lock`
pub fn lock_path(workbook: &Path) -> PathBuf {
    let mut name = workbook.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

impl WorkbookLock {
    /// Lock `workbook`, waiting up to `timeout` for a competing run.
    pub fn acquire(workbook: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = lock_path(workbook);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateError {
                path: path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    tracing::debug!(lock = %path.display(), "acquired workbook lock");
                    return Ok(WorkbookLock { _file: file });
                }
                Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return Err(LockError::Timeout { path }),
            }
        }
    }

    /// Acquire with default timeout (5 seconds)
    pub fn acquire_default(workbook: &Path) -> Result<Self, LockError> {
        Self::acquire(workbook, Duration::from_secs(5))
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
