use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::platform::PROG_NAME;

/// Every failure radioctl reports.  The CLI treats all of them as fatal; the
/// interactive loops render them on the status line and keep going.
#[derive(Debug, Error)]
pub enum Error {
    #[error("'{}' is not running", PROG_NAME)]
    NotRunning,
    #[error("'{}' is already running or locked", PROG_NAME)]
    AlreadyRunning,
    #[error("invalid command json {raw}: {reason}")]
    InvalidCommandJson { raw: String, reason: String },
    #[error("'{}' no such file or directory", .0.display())]
    ControlSocketMissing(PathBuf),
    #[error("'{}' is not a socket file", .0.display())]
    ControlSocketWrongType(PathBuf),
    #[error("connection to '{}' failed: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no reply from '{}' within {timeout:?}", path.display())]
    ReadTimeout { path: PathBuf, timeout: Duration },
    #[error("invalid json reply {line:?}: {source}")]
    MalformedResponse {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("property '{0}' unavailable")]
    PropertyUnavailable(String),
    #[error("player error: {0}")]
    Player(String),
    #[error("player binary '{0}' not found")]
    PlayerNotFound(String),
    #[error("invalid option '{input}': {reason}")]
    InvalidSelection { input: String, reason: String },
    #[error("too many consecutive errors")]
    TooManyErrors,
    #[error("the terminal window is too small ({rows} rows, need at least {needed})")]
    TerminalTooSmall { rows: u16, needed: u16 },
    #[error("cannot {op} '{}': {source}", path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },
    #[error("interrupted")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn invalid_selection(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidSelection {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
