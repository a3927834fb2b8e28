use std::path::{Path, PathBuf};

/// Fixed prefix for every runtime file and for user-facing messages.
pub const PROG_NAME: &str = "radioctl";

/// Per-user temp root.  `std::env::temp_dir` honours `TMPDIR`.
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Current user name: `$USER` first, then the passwd entry, then the raw uid.
pub fn user_name() -> String {
    if let Ok(name) = std::env::var("USER") {
        if !name.is_empty() {
            return name;
        }
    }
    let uid = nix::unistd::getuid();
    nix::unistd::User::from_uid(uid)
        .ok()
        .flatten()
        .map(|user| user.name)
        .unwrap_or_else(|| uid.to_string())
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(temp_dir)
        .join(PROG_NAME)
}

pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// True when an X display is available.  Without one the player's video
/// output is switched off before loading anything.
pub fn has_display() -> bool {
    std::env::var_os("DISPLAY").is_some_and(|v| !v.is_empty())
}

/// Every ephemeral file radioctl owns.  All of them live in the temp root and
/// are named `<user>-radioctl...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Created with create-or-fail semantics; its existence means "running".
    pub lock_dir: PathBuf,
    pub pid_file: PathBuf,
    pub control_socket: PathBuf,
    pub player_pid_file: PathBuf,
    pub log_file: PathBuf,
    /// Current media title, read by the window-manager status bar.
    pub status_file: PathBuf,
}

impl RuntimePaths {
    pub fn detect() -> Self {
        Self::under(&temp_dir(), &user_name())
    }

    pub fn under(root: &Path, user: &str) -> Self {
        let stem = format!("{}-{}", user, PROG_NAME);
        Self {
            lock_dir: root.join(format!("{stem}.lock")),
            pid_file: root.join(format!("{stem}.pid")),
            control_socket: root.join(format!("{stem}-player-control.socket")),
            player_pid_file: root.join(format!("{stem}-player.pid")),
            log_file: root.join(format!("{stem}.log")),
            status_file: root.join(format!("{stem}-wm.txt")),
        }
    }

    pub fn player_ipc_arg(&self) -> String {
        format!("--input-ipc-server={}", self.control_socket.display())
    }
}

impl Default for RuntimePaths {
    fn default() -> Self {
        Self::detect()
    }
}

/// Look a program up on `PATH`.  Names containing a slash are checked as-is.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let p = PathBuf::from(name);
        return p.is_file().then_some(p);
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_paths_share_prefix() {
        let paths = RuntimePaths::under(Path::new("/tmp"), "alice");
        assert_eq!(paths.lock_dir, PathBuf::from("/tmp/alice-radioctl.lock"));
        assert_eq!(paths.pid_file, PathBuf::from("/tmp/alice-radioctl.pid"));
        assert_eq!(
            paths.control_socket,
            PathBuf::from("/tmp/alice-radioctl-player-control.socket")
        );
        assert_eq!(
            paths.player_pid_file,
            PathBuf::from("/tmp/alice-radioctl-player.pid")
        );
        assert_eq!(paths.status_file, PathBuf::from("/tmp/alice-radioctl-wm.txt"));
        assert_eq!(
            paths.player_ipc_arg(),
            "--input-ipc-server=/tmp/alice-radioctl-player-control.socket"
        );
    }

    #[test]
    fn test_find_on_path_rejects_empty_name() {
        assert!(find_on_path("").is_none());
        assert!(find_on_path("/definitely/not/here/radioctl-hook").is_none());
    }
}
