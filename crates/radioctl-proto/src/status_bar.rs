//! Side channel to the window-manager status bar: a one-line title file plus
//! an optional refresh program.  The bar is cosmetic, so a hook that fails
//! is logged and otherwise ignored.

use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock;
use crate::platform;

#[derive(Debug, Clone)]
pub struct StatusBar {
    status_file: PathBuf,
    hook: String,
}

impl StatusBar {
    pub fn new(config: &Config) -> Self {
        Self {
            status_file: config.paths.status_file.clone(),
            hook: config.status_bar.hook.trim().to_string(),
        }
    }

    pub fn write_title(&self, title: &str) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.status_file)
            .map_err(|e| Error::fs("open status file", &self.status_file, e))?;
        writeln!(file, "{title}").map_err(|e| Error::fs("write status file", &self.status_file, e))
    }

    pub fn clear_title(&self) -> Result<()> {
        lock::remove_path(&self.status_file)
    }

    /// Current title, or `None` when nothing has been announced yet.
    pub fn read_title(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.status_file) {
            Ok(content) => {
                let title = content.trim_end_matches('\n').to_string();
                Ok((!title.is_empty()).then_some(title))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::fs("read status file", &self.status_file, e)),
        }
    }

    /// Run the refresh hook if it is configured and installed.
    pub async fn refresh(&self) {
        if self.hook.is_empty() {
            return;
        }
        let Some(program) = platform::find_on_path(&self.hook) else {
            debug!("status bar: '{}' not on PATH", self.hook);
            return;
        };
        match tokio::process::Command::new(&program)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
        {
            Ok(status) if status.success() => debug!("status bar: refreshed"),
            Ok(status) => warn!("status bar: '{}' exited with {}", self.hook, status),
            Err(e) => warn!("status bar: cannot run '{}': {}", self.hook, e),
        }
    }
}
