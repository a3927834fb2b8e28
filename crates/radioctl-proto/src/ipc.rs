//! Command Channel: one connection per request to the player's control socket.
//!
//! ```text
//!   send_one(cmd)
//!     ├── instance running?          NotRunning
//!     ├── shutdown requested?        Cancelled
//!     ├── serialise                  InvalidCommandJson
//!     ├── socket present, S_IFSOCK?  ControlSocketMissing / ControlSocketWrongType
//!     ├── connect + write            Connection
//!     ├── settle delay
//!     ├── read (deadline)            ReadTimeout / Connection
//!     └── first line → Response      MalformedResponse
//! ```
//!
//! The socket is a byte stream with no framing, so only the first line of
//! what comes back is trusted.  Nothing is retried at this layer.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock;
use crate::platform::RuntimePaths;
use crate::protocol::{Command, Response};

/// How a batch is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// One at a time; the first failure stops the batch.
    Sequential,
    /// All at once, one task per command.
    Concurrent,
}

/// A batch that did not finish.  `completed` holds the replies that did
/// arrive, in command order; `index` is the position of the failed command.
#[derive(Debug, Error)]
#[error("command {} of {total} failed: {error}", .index + 1)]
pub struct BatchError {
    pub completed: Vec<Response>,
    pub index: usize,
    pub total: usize,
    pub error: Error,
}

impl From<BatchError> for Error {
    fn from(batch: BatchError) -> Self {
        batch.error
    }
}

/// Cheap to clone; every concurrent batch task gets its own copy.
#[derive(Debug, Clone)]
pub struct Channel {
    paths: RuntimePaths,
    settle_delay: Duration,
    read_timeout: Duration,
    read_buffer: usize,
    cancel: CancellationToken,
}

impl Channel {
    pub fn new(config: &Config) -> Self {
        Self {
            paths: config.paths.clone(),
            settle_delay: config.ipc.settle_delay(),
            read_timeout: config.ipc.read_timeout(),
            read_buffer: config.ipc.read_buffer_bytes.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token` before every dispatch and during every pause.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    pub fn is_running(&self) -> bool {
        lock::is_running(&self.paths)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn ensure_live(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::NotRunning);
        }
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Sleep that ends early, with `Cancelled`, when shutdown is requested.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    pub async fn send_one(&self, command: &Command) -> Result<Response> {
        self.ensure_live()?;
        let line = command.to_line()?;
        let socket = &self.paths.control_socket;
        check_socket(socket)?;

        let connection = |source: io::Error| Error::Connection {
            path: socket.clone(),
            source,
        };
        let mut stream = UnixStream::connect(socket).await.map_err(connection)?;
        debug!("ipc -> {}", line.trim_end());
        stream.write_all(line.as_bytes()).await.map_err(connection)?;

        // mpv logs "Write error (Broken pipe)" when the client reads and
        // hangs up before it has finished writing
        self.pause(self.settle_delay).await?;

        let reply = tokio::time::timeout(self.read_timeout, self.read_first_line(&mut stream))
            .await
            .map_err(|_| Error::ReadTimeout {
                path: socket.clone(),
                timeout: self.read_timeout,
            })?
            .map_err(connection)?;
        debug!("ipc <- {}", reply);
        Response::decode(&reply)
    }

    /// Read until a newline shows up, the buffer is full, or the peer hangs up.
    async fn read_first_line(&self, stream: &mut UnixStream) -> io::Result<String> {
        let mut buf = vec![0u8; self.read_buffer];
        let mut filled = 0;
        while filled < buf.len() {
            let n = stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
            if buf[filled - n..filled].contains(&b'\n') {
                break;
            }
        }
        if filled == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed without a reply",
            ));
        }
        let first = buf[..filled]
            .split(|b| *b == b'\n')
            .next()
            .unwrap_or_default();
        Ok(String::from_utf8_lossy(first).into_owned())
    }

    pub async fn send_many(
        &self,
        commands: &[Command],
        dispatch: Dispatch,
    ) -> Result<Vec<Response>, BatchError> {
        let total = commands.len();
        if let Err(error) = self.ensure_live() {
            return Err(BatchError {
                completed: Vec::new(),
                index: 0,
                total,
                error,
            });
        }
        match dispatch {
            Dispatch::Sequential => self.send_sequential(commands).await,
            Dispatch::Concurrent => self.send_concurrent(commands).await,
        }
    }

    async fn send_sequential(&self, commands: &[Command]) -> Result<Vec<Response>, BatchError> {
        let mut completed = Vec::with_capacity(commands.len());
        for (index, command) in commands.iter().enumerate() {
            match self.send_one(command).await {
                Ok(response) => completed.push(response),
                Err(error) => {
                    return Err(BatchError {
                        completed,
                        index,
                        total: commands.len(),
                        error,
                    })
                }
            }
        }
        Ok(completed)
    }

    async fn send_concurrent(&self, commands: &[Command]) -> Result<Vec<Response>, BatchError> {
        let total = commands.len();
        let mut tasks = JoinSet::new();
        for (index, command) in commands.iter().enumerate() {
            let channel = self.clone();
            let command = command.clone();
            tasks.spawn(async move { (index, channel.send_one(&command).await) });
        }

        // one slot per command, each owned by exactly one task
        let mut slots: Vec<Option<Response>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut first_failure: Option<(usize, Error)> = None;
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("ipc: batch task died: {}", e);
                    if first_failure.is_none() {
                        first_failure = Some((total, Error::Io(io::Error::other(e))));
                    }
                    continue;
                }
            };
            match result {
                Ok(response) => {
                    debug_assert!(slots[index].is_none(), "slot {index} written twice");
                    slots[index] = Some(response);
                }
                Err(error) => match &first_failure {
                    Some((seen, _)) if *seen <= index => {}
                    _ => first_failure = Some((index, error)),
                },
            }
        }

        match first_failure {
            None => Ok(slots.into_iter().flatten().collect()),
            Some((index, error)) => Err(BatchError {
                completed: slots.into_iter().flatten().collect(),
                index: index.min(total.saturating_sub(1)),
                total,
                error,
            }),
        }
    }
}

/// A stale regular file at the socket path is a different failure from no
/// file at all.
fn check_socket(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => Ok(()),
        Ok(_) => Err(Error::ControlSocketWrongType(PathBuf::from(path))),
        Err(_) => Err(Error::ControlSocketMissing(PathBuf::from(path))),
    }
}
