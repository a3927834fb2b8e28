//! Process Supervisor: owns the player's lifecycle.
//!
//! ```text
//!   NotRunning ──start──▶ Starting ──spawned──▶ Running ──exit / signal──▶ Stopping ──cleanup──▶ NotRunning
//! ```
//!
//! `start` holds the [`InstanceLock`] for as long as the player lives, scans
//! the player's combined output for title changes, and always runs cleanup
//! on the way out, whether the player quit on its own, a `stop` asked it
//! to, or a signal arrived.

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use radioctl_proto::config::Config;
use radioctl_proto::error::{Error, Result};
use radioctl_proto::ipc::Channel;
use radioctl_proto::lock::{self, InstanceLock};
use radioctl_proto::platform::{self, RuntimePaths};
use radioctl_proto::player::Player;
use radioctl_proto::status_bar::StatusBar;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::shutdown::Shutdown;
use crate::title::TitleScanner;

/// How long the player gets to exit after SIGINT before it is killed.
const PLAYER_GRACE: Duration = Duration::from_secs(5);

/// Run the player until it exits or a signal asks us to stop.  Returns the
/// process exit code.
pub async fn start(config: &Config, shutdown: &Shutdown) -> Result<i32> {
    let paths = &config.paths;
    if lock::is_running(paths) {
        return Err(Error::AlreadyRunning);
    }
    let binary = platform::find_on_path(&config.player.binary)
        .ok_or_else(|| Error::PlayerNotFound(config.player.binary.clone()))?;

    let instance = InstanceLock::acquire(paths)?;
    info!("state: starting");
    let bar = StatusBar::new(config);

    let outcome = supervise(config, &binary, &bar, shutdown).await;

    info!("state: stopping");
    cleanup_files(paths);
    let released = instance.release();
    bar.refresh().await;
    info!("state: not running");

    let code = outcome?;
    released?;
    Ok(code)
}

async fn supervise(
    config: &Config,
    binary: &Path,
    bar: &StatusBar,
    shutdown: &Shutdown,
) -> Result<i32> {
    let paths = &config.paths;
    let mut command = std::process::Command::new(binary);
    command
        .args(&config.player.args)
        .arg(paths.player_ipc_arg())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // own process group: terminal ^C reaches us, not the player
        .process_group(0);
    let mut child = tokio::process::Command::from(command)
        .spawn()
        .map_err(|e| Error::fs("spawn player", binary, e))?;

    let player_pid = child.id().unwrap_or_default();
    lock::write_pid_file(&paths.player_pid_file, player_pid)?;
    println!(
        "info: {} pid: {}, {} pid: {}",
        platform::PROG_NAME,
        std::process::id(),
        config.player.binary,
        player_pid
    );
    info!(
        "state: running, pid {} player pid {}",
        std::process::id(),
        player_pid
    );
    info!("run {} {}", binary.display(), config.player.args.join(" "));

    let (line_tx, mut lines) = mpsc::channel::<String>(64);
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, line_tx));
    }

    let scanner = TitleScanner::new().map_err(|e| Error::Player(e.to_string()))?;
    let token = shutdown.token();
    let mut lines_open = true;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                let caught = shutdown.caught().map_or("shutdown", |c| c.name());
                info!("{}: stopping player", caught);
                interrupt_and_reap(&mut child).await;
                return Ok(shutdown.exit_code());
            }
            line = lines.recv(), if lines_open => match line {
                Some(line) => announce(&scanner, bar, &line).await,
                None => lines_open = false,
            },
            status = child.wait() => {
                let status = status.map_err(|e| Error::fs("wait for player", binary, e))?;
                return exit_code(status);
            }
        }
    }
}

async fn forward_lines<R>(stream: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

async fn announce(scanner: &TitleScanner, bar: &StatusBar, line: &str) {
    let Some(title) = scanner.extract(line) else {
        return;
    };
    info!("title: {}", title);
    if let Err(e) = bar.write_title(&title) {
        warn!("{}", e);
        return;
    }
    bar.refresh().await;
}

fn exit_code(status: ExitStatus) -> Result<i32> {
    if status.success() {
        info!("player exited");
        Ok(0)
    } else {
        error!("player exited with {}", status);
        Err(Error::Player(format!("player exited with {status}")))
    }
}

/// SIGINT the player and give it a moment before killing it outright.
async fn interrupt_and_reap(child: &mut Child) {
    if let Some(pid) = child.id() {
        interrupt(pid as i32);
    }
    match tokio::time::timeout(PLAYER_GRACE, child.wait()).await {
        Ok(Ok(status)) => debug!("player exited with {}", status),
        Ok(Err(e)) => warn!("waiting for player: {}", e),
        Err(_) => {
            warn!("player ignored SIGINT, killing it");
            if let Err(e) = child.kill().await {
                warn!("killing player: {}", e);
            }
        }
    }
}

fn interrupt(pid: i32) {
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGINT) {
        debug!("SIGINT to {}: {}", pid, e);
    }
}

/// Remove every runtime file except the lock itself.  Missing files are fine.
fn cleanup_files(paths: &RuntimePaths) {
    for path in [
        &paths.control_socket,
        &paths.player_pid_file,
        &paths.status_file,
    ] {
        if let Err(e) = lock::remove_path(path) {
            warn!("cleanup: {}", e);
        }
    }
}

/// Cleanup for a lock left behind by a crashed instance: stop any player it
/// left running and remove everything, lock included.
pub async fn cleanup_stale(config: &Config) -> Result<()> {
    let paths = &config.paths;
    if let Some(pid) = lock::read_pid(&paths.player_pid_file).filter(|pid| lock::pid_alive(*pid)) {
        info!("cleanup: interrupting leftover player {}", pid);
        interrupt(pid);
    }
    cleanup_files(paths);
    lock::remove_path(&paths.pid_file)?;
    lock::remove_path(&paths.lock_dir)?;
    StatusBar::new(config).refresh().await;
    info!("cleanup: stale lock removed");
    Ok(())
}

/// Ask a running instance to shut down.  When the socket is gone and no
/// supervisor is alive, the lock is stale and gets cleaned up locally.
pub async fn stop(config: &Config, channel: Channel) -> Result<()> {
    let paths = &config.paths;
    if !lock::is_running(paths) {
        return Err(Error::NotRunning);
    }
    match Player::new(config, channel).stop_instance().await {
        Ok(()) => Ok(()),
        Err(
            e @ (Error::ControlSocketMissing(_)
            | Error::ControlSocketWrongType(_)
            | Error::Connection { .. }
            | Error::ReadTimeout { .. }),
        ) if !lock::pid_file_alive(&paths.pid_file) => {
            warn!("stop: {} and no live instance, removing stale lock", e);
            cleanup_stale(config).await
        }
        Err(e) => Err(e),
    }
}
