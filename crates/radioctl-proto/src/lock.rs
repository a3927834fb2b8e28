//! Single-instance enforcement.
//!
//! A directory created with create-or-fail semantics is the mutual-exclusion
//! primitive; a pid file next to it lets a crashed instance be told apart from
//! a live one.  [`is_running`] is the one predicate every other component
//! consults before talking to the player.

use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::platform::RuntimePaths;

/// Lock directory present, or the instance pid file names a live process.
pub fn is_running(paths: &RuntimePaths) -> bool {
    paths.lock_dir.is_dir() || pid_file_alive(&paths.pid_file)
}

pub fn read_pid(path: &Path) -> Option<i32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}

pub fn pid_file_alive(path: &Path) -> bool {
    read_pid(path).is_some_and(pid_alive)
}

/// Signal 0 probes for existence; EPERM still means the process exists.
pub fn pid_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

pub fn write_pid_file(path: &Path, pid: u32) -> Result<()> {
    std::fs::write(path, format!("{pid}\n")).map_err(|e| Error::fs("write pid file", path, e))
}

/// Remove a file or directory; a missing path is not an error.
pub fn remove_path(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        std::fs::remove_dir(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => {
            debug!("removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::fs("remove", path, e)),
    }
}

/// Held by the running instance.  Dropping it releases the lock, so every
/// exit path (errors and signal-driven shutdowns included) cleans up.
#[derive(Debug)]
pub struct InstanceLock {
    lock_dir: PathBuf,
    pid_file: PathBuf,
    released: bool,
}

impl InstanceLock {
    pub fn acquire(paths: &RuntimePaths) -> Result<Self> {
        if pid_file_alive(&paths.pid_file) {
            return Err(Error::AlreadyRunning);
        }
        match std::fs::DirBuilder::new().mode(0o700).create(&paths.lock_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(Error::AlreadyRunning),
            Err(e) => return Err(Error::fs("create lock directory", &paths.lock_dir, e)),
        }

        let lock = Self {
            lock_dir: paths.lock_dir.clone(),
            pid_file: paths.pid_file.clone(),
            released: false,
        };
        // on failure `lock` is dropped here and takes the directory with it
        write_pid_file(&lock.pid_file, std::process::id())?;
        info!("lock acquired: {}", lock.lock_dir.display());
        Ok(lock)
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_path(&self.pid_file)?;
        remove_path(&self.lock_dir)?;
        info!("lock released: {}", self.lock_dir.display());
        Ok(())
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = remove_path(&self.pid_file);
            let _ = remove_path(&self.lock_dir);
        }
    }
}
