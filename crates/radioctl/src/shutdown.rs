//! Signal delivery as a cancellation token.
//!
//! One background task turns process signals into a single
//! [`CancellationToken`] that the supervisor and both interactive loops check
//! at their suspension points.  The first signal decides the exit code.

use std::sync::{Arc, OnceLock};

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Signals radioctl reacts to.  SIGHUP is caught only so it can be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caught {
    Interrupt,
    Terminate,
    Quit,
    User1,
    User2,
}

impl Caught {
    pub fn name(self) -> &'static str {
        match self {
            Caught::Interrupt => "SIGINT",
            Caught::Terminate => "SIGTERM",
            Caught::Quit => "SIGQUIT",
            Caught::User1 => "SIGUSR1",
            Caught::User2 => "SIGUSR2",
        }
    }

    /// INT, TERM and QUIT are ordinary ways to stop; anything else still
    /// cleans up but reports failure.
    pub fn exit_code(self) -> i32 {
        match self {
            Caught::Interrupt | Caught::Terminate | Caught::Quit => 0,
            Caught::User1 | Caught::User2 => 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    caught: Arc<OnceLock<Caught>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn caught(&self) -> Option<Caught> {
        self.caught.get().copied()
    }

    /// Exit code for the process once cleanup is done.
    pub fn exit_code(&self) -> i32 {
        self.caught().map_or(0, Caught::exit_code)
    }

    /// Record `caught` (first one wins) and cancel everything.
    pub fn trigger(&self, caught: Caught) {
        if self.caught.set(caught).is_err() {
            warn!("{} received while already shutting down", caught.name());
        }
        self.token.cancel();
    }

    /// Install the handlers and start the listener task.
    pub fn listen(&self) -> std::io::Result<JoinHandle<()>> {
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut quit = signal(SignalKind::quit())?;
        let mut user1 = signal(SignalKind::user_defined1())?;
        let mut user2 = signal(SignalKind::user_defined2())?;
        let mut hangup = signal(SignalKind::hangup())?;

        let this = self.clone();
        Ok(tokio::spawn(async move {
            loop {
                let caught = tokio::select! {
                    _ = interrupt.recv() => Caught::Interrupt,
                    _ = terminate.recv() => Caught::Terminate,
                    _ = quit.recv() => Caught::Quit,
                    _ = user1.recv() => Caught::User1,
                    _ = user2.recv() => Caught::User2,
                    _ = hangup.recv() => {
                        info!("SIGHUP ignored");
                        continue;
                    }
                };
                if caught.exit_code() == 0 {
                    info!("received {}", caught.name());
                } else {
                    warn!("received {}, shutting down with failure", caught.name());
                }
                this.trigger(caught);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_signal_decides_exit_code() {
        let shutdown = Shutdown::new();
        assert_eq!(shutdown.exit_code(), 0);
        assert!(!shutdown.is_requested());

        shutdown.trigger(Caught::User1);
        shutdown.trigger(Caught::Interrupt);
        assert!(shutdown.is_requested());
        assert!(shutdown.token().is_cancelled());
        assert_eq!(shutdown.caught(), Some(Caught::User1));
        assert_eq!(shutdown.exit_code(), 1);
    }

    #[test]
    fn test_graceful_signals_exit_zero() {
        for caught in [Caught::Interrupt, Caught::Terminate, Caught::Quit] {
            assert_eq!(caught.exit_code(), 0);
        }
        assert_eq!(Caught::User2.exit_code(), 1);
    }
}
