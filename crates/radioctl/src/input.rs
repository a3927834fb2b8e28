//! Terminal input read on a dedicated thread.
//!
//! ```text
//!   loop ──request──▶ input thread ── blocking read ──▶ reply ──▶ loop
//! ```
//!
//! The thread reads only when asked, so a loop that is not waiting never
//! swallows input meant for the next reader (menu lines, then selector keys).
//! A read still pending at shutdown is left behind: the thread is not part of
//! the tokio runtime, so nothing waits for it on the way out.

use std::io::{self, Read};
use std::sync::mpsc as std_mpsc;

use radioctl_proto::error::{Error, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type Reply<T> = io::Result<Option<T>>;

pub struct Input<T> {
    requests: std_mpsc::Sender<()>,
    replies: mpsc::Receiver<Reply<T>>,
    /// A request is out and its reply has not been taken yet.
    pending: bool,
}

impl<T: Send + 'static> Input<T> {
    fn spawn<F>(name: &str, mut read: F) -> io::Result<Self>
    where
        F: FnMut() -> Reply<T> + Send + 'static,
    {
        let (request_tx, request_rx) = std_mpsc::channel::<()>();
        let (reply_tx, reply_rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while request_rx.recv().is_ok() {
                    if reply_tx.blocking_send(read()).is_err() {
                        break;
                    }
                }
            })?;
        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            pending: false,
        })
    }

    /// Next item, `None` at end of input, `Cancelled` once `cancel` fires.
    pub async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<T>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !self.pending {
            if self.requests.send(()).is_err() {
                return Ok(None);
            }
            self.pending = true;
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            reply = self.replies.recv() => {
                self.pending = false;
                Ok(reply.transpose()?.flatten())
            }
        }
    }
}

/// Whatever one raw-mode read returns, at most three bytes.
pub fn keys<R: Read + Send + 'static>(mut source: R) -> io::Result<Input<Vec<u8>>> {
    Input::spawn("radioctl-keys", move || {
        let mut buf = [0u8; 3];
        let n = source.read(&mut buf)?;
        Ok((n > 0).then(|| buf[..n].to_vec()))
    })
}

/// Line reader over the process's stdin.  `Stdin` buffers internally, so
/// bytes a line read pulled in stay available to a later key reader.
pub fn stdin_lines() -> io::Result<Input<String>> {
    Input::spawn("radioctl-lines", || {
        let mut line = String::new();
        let n = io::stdin().read_line(&mut line)?;
        Ok((n > 0).then_some(line))
    })
}

/// Same as [`stdin_lines`] over any reader.
#[cfg(test)]
pub fn lines<R: Read + Send + 'static>(source: R) -> io::Result<Input<String>> {
    let mut source = io::BufReader::new(source);
    Input::spawn("radioctl-lines", move || {
        let mut line = String::new();
        let n = io::BufRead::read_line(&mut source, &mut line)?;
        Ok((n > 0).then_some(line))
    })
}
