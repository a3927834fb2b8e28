//! Polling Probe: re-issue a query at a fixed interval until the player
//! reports the wanted field, or the try budget runs out.
//!
//! Used where a property only appears after some asynchronous change inside
//! the player (metadata after a load, for instance).  Fixed spacing, no
//! backoff; each call site picks its own [`Budget`].

use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::ipc::Channel;
use crate::protocol::{Command, Response};

/// How many times to ask, and how long to wait before each ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub tries: u32,
    pub interval: Duration,
}

impl Budget {
    pub fn new(tries: u32, interval: Duration) -> Self {
        Self { tries, interval }
    }
}

/// Sleep one interval, send `command`, and stop at the first successful
/// reply carrying `field` (top level or inside `data`).
///
/// Channel errors end the probe immediately; only "not there yet" is retried.
pub async fn poll_until(
    channel: &Channel,
    command: &Command,
    field: &str,
    budget: Budget,
) -> Result<Response> {
    for attempt in 1..=budget.tries {
        channel.pause(budget.interval).await?;
        let response = channel.send_one(command).await?;
        if response.is_success() && response.has_field(field) {
            debug!("probe: '{}' present after {} tries", field, attempt);
            return Ok(response);
        }
        debug!("probe: '{}' missing ({}/{})", field, attempt, budget.tries);
    }
    Err(Error::PropertyUnavailable(field.to_string()))
}
