//! Shared pieces of radioctl: configuration, runtime paths, the mpv JSON IPC
//! wire types, the Command Channel and Polling Probe, the instance lock and
//! the high-level player operations built on top of them.

pub mod config;
pub mod error;
pub mod ipc;
pub mod lock;
pub mod platform;
pub mod player;
pub mod probe;
pub mod protocol;
pub mod stations;
pub mod status_bar;

pub use error::{Error, Result};

#[cfg(feature = "test-support")]
pub mod testing;
