//! High-level player operations shared by the CLI verbs and both
//! interactive loops.  Everything here goes through the Command Channel;
//! nothing talks to the socket directly.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ipc::{Channel, Dispatch};
use crate::platform;
use crate::probe::{self, Budget};
use crate::protocol::{Command, Response};
use crate::stations::{Catalog, Stream};
use crate::status_bar::StatusBar;

/// What a user-supplied play argument resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Stream(Stream),
    Url(String),
    File(PathBuf),
}

impl Target {
    /// The string handed to `loadfile`.
    pub fn location(&self) -> String {
        match self {
            Target::Stream(stream) => stream.url.clone(),
            Target::Url(url) => url.clone(),
            Target::File(path) => path.display().to_string(),
        }
    }
}

/// Numbers are catalog ids; otherwise an existing path is a local file and
/// anything else must be a stream URL.
pub fn resolve_target(catalog: &Catalog, input: &str) -> Result<Target> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::invalid_selection(input, "empty selection"));
    }
    if let Ok(id) = input.parse::<i64>() {
        return u32::try_from(id)
            .ok()
            .and_then(|id| catalog.get(id))
            .map(|stream| Target::Stream(stream.clone()))
            .ok_or_else(|| Error::invalid_selection(input, "no such stream id"));
    }

    let path = Path::new(input);
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.is_dir() {
            return Err(Error::invalid_selection(input, "is a directory, not a file"));
        }
        return absolute(path).map(Target::File);
    }
    if is_stream_url(input) {
        return Ok(Target::Url(input.to_string()));
    }
    Err(Error::invalid_selection(input, "no such file or stream url"))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| Error::fs("resolve", path, e))?;
    Ok(cwd.join(path))
}

/// Scheme, host and a path.  `url` normalises an empty path to `/`, so a
/// bare `/` only counts when the input actually spelled it.
pub fn is_stream_url(input: &str) -> bool {
    let Ok(url) = url::Url::parse(input) else {
        return false;
    };
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    let has_path = match url.path() {
        "" => false,
        "/" => input.split(&['?', '#'][..]).next().is_some_and(|s| s.ends_with('/')),
        _ => true,
    };
    has_host && has_path
}

/// Property-backed switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Mute,
    Pause,
    Video,
}

impl Toggle {
    pub fn property(self) -> &'static str {
        match self {
            Toggle::Mute => "mute",
            Toggle::Pause => "pause",
            Toggle::Video => "video",
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property())
    }
}

/// Properties shown by `status`, in display order, with their labels.
const STATUS_PROPERTIES: [(&str, &str); 7] = [
    ("mute", "mute"),
    ("pause", "pause"),
    ("video", "video"),
    ("idle", "idle-active"),
    ("song", "media-title"),
    ("path", "path"),
    ("ffmt", "file-format"),
];

pub struct Player<'a> {
    config: &'a Config,
    channel: Channel,
    status_bar: StatusBar,
}

impl<'a> Player<'a> {
    pub fn new(config: &'a Config, channel: Channel) -> Self {
        Self {
            config,
            status_bar: StatusBar::new(config),
            channel,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn catalog(&self) -> &Catalog {
        &self.config.streams
    }

    pub fn is_running(&self) -> bool {
        self.channel.is_running()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(Error::NotRunning)
        }
    }

    /// Send one command and insist on a success reply.
    async fn execute(&self, command: Command) -> Result<Option<Value>> {
        let response = self.channel.send_one(&command).await?;
        response.into_data(command.verb())
    }

    pub async fn property_string(&self, name: &str) -> Result<String> {
        let response = self
            .channel
            .send_one(&Command::get_property_string(name))
            .await?;
        let text = response.data_text();
        response.into_data(name)?;
        Ok(text)
    }

    /// True when nothing is loaded.  Any error reads as "not idle".
    pub async fn is_idle(&self) -> bool {
        matches!(self.property_string("idle-active").await.as_deref(), Ok("yes"))
    }

    /// Path of what is loaded now, if anything.
    pub async fn stream_path(&self) -> Option<String> {
        if !self.is_running() {
            return None;
        }
        self.property_string("path")
            .await
            .ok()
            .filter(|path| !path.is_empty())
    }

    pub async fn play(&self, target: &Target) -> Result<()> {
        self.ensure_running()?;
        if !platform::has_display() {
            self.execute(Command::set_property("video", false)).await?;
        }
        self.play_stop().await?;
        self.status_bar.clear_title()?;

        let location = target.location();
        info!("play: {}", location);
        self.execute(Command::loadfile(&location)).await?;
        self.status_bar.refresh().await;
        Ok(())
    }

    /// Drop the current entry and stop; a no-op when already idle.
    pub async fn play_stop(&self) -> Result<()> {
        self.ensure_running()?;
        if self.is_idle().await {
            debug!("play_stop: player idle");
            return Ok(());
        }
        self.channel
            .send_many(
                &[Command::playlist_remove_current(), Command::stop()],
                Dispatch::Sequential,
            )
            .await?;
        Ok(())
    }

    /// Wait for the freshly loaded media to report metadata.
    pub async fn await_metadata(&self, budget: Budget) -> Result<Response> {
        self.ensure_running()?;
        probe::poll_until(
            &self.channel,
            &Command::get_property("filtered-metadata"),
            "error",
            budget,
        )
        .await
    }

    /// Flip a switch and return the value the player reports afterwards.
    pub async fn toggle(&self, toggle: Toggle) -> Result<String> {
        self.ensure_running()?;
        match toggle {
            Toggle::Video => {
                let current = self.property_string("video").await?;
                let next = match current.as_str() {
                    "auto" | "yes" | "1" => Value::Bool(false),
                    _ => Value::from("auto"),
                };
                self.execute(Command::set_property("video", next)).await?;
            }
            Toggle::Mute | Toggle::Pause => {
                self.execute(Command::cycle(toggle.property())).await?;
            }
        }
        self.property_string(toggle.property()).await
    }

    /// Relative seek; returns the playback time afterwards.
    pub async fn seek(&self, seconds: i64) -> Result<String> {
        self.ensure_running()?;
        self.execute(Command::seek_relative(seconds)).await?;
        self.property_string("playback-time").await
    }

    pub async fn set_volume(&self, level: i64) -> Result<()> {
        let range = &self.config.volume;
        if !(range.min..=range.max).contains(&level) {
            return Err(Error::invalid_selection(
                level.to_string(),
                format!("volume must be between {} and {}", range.min, range.max),
            ));
        }
        self.ensure_running()?;
        self.execute(Command::set_property("volume", level)).await?;
        Ok(())
    }

    /// Ask the player to end playback and exit.  The supervisor notices the
    /// exit and cleans up.
    pub async fn stop_instance(&self) -> Result<()> {
        self.ensure_running()?;
        info!("stopping {}", platform::PROG_NAME);
        self.channel
            .send_many(
                &[
                    Command::playlist_remove_current(),
                    Command::stop(),
                    Command::quit(),
                ],
                Dispatch::Sequential,
            )
            .await?;
        Ok(())
    }

    /// Human-readable status: switches and paths, then the metadata tree.
    pub async fn status(&self) -> Result<String> {
        self.ensure_running()?;
        let metadata = self
            .channel
            .send_one(&Command::get_property("metadata"))
            .await?;
        let commands: Vec<Command> = STATUS_PROPERTIES
            .iter()
            .map(|(_, property)| Command::get_property_string(property))
            .collect();
        let replies = self
            .channel
            .send_many(&commands, Dispatch::Concurrent)
            .await?;

        let mut out = String::new();
        for ((label, _), reply) in STATUS_PROPERTIES.iter().zip(&replies) {
            let pad = 6usize.saturating_sub(label.len());
            out.push_str(&format!("{label}:{:pad$}{}\n", "", reply.data_text()));
        }
        out.push_str("meta:\n");
        match metadata.data() {
            Some(data) => {
                let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
                out.push_str(&pretty);
                out.push('\n');
            }
            None => out.push_str("(none)\n"),
        }
        Ok(out)
    }

    /// Title announced on the status file, else the player's media title.
    pub async fn title(&self) -> Result<String> {
        self.ensure_running()?;
        if let Some(title) = self.status_bar.read_title()? {
            return Ok(title);
        }
        self.property_string("media-title").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_catalog_ids() {
        let catalog = Catalog::default();
        match resolve_target(&catalog, "3").unwrap() {
            Target::Stream(stream) => assert_eq!(stream.name, "Goa Base"),
            other => panic!("unexpected target {other:?}"),
        }
        for missing in ["0", "11", "-4", "99999999999"] {
            assert!(matches!(
                resolve_target(&catalog, missing),
                Err(Error::InvalidSelection { .. })
            ));
        }
    }

    #[test]
    fn test_resolve_urls_and_files() {
        let catalog = Catalog::default();
        assert_eq!(
            resolve_target(&catalog, "https://example.com/live").unwrap(),
            Target::Url("https://example.com/live".to_string())
        );
        assert!(resolve_target(&catalog, "nonsense").is_err());

        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            resolve_target(&catalog, dir.path().to_str().unwrap()),
            Err(Error::InvalidSelection { reason, .. }) if reason.contains("directory")
        ));
        let song = dir.path().join("song.ogg");
        std::fs::write(&song, b"").unwrap();
        assert_eq!(
            resolve_target(&catalog, song.to_str().unwrap()).unwrap(),
            Target::File(song)
        );
    }

    #[test]
    fn test_stream_url_rules() {
        assert!(is_stream_url("http://flyfm.net:8000/flyfm"));
        assert!(is_stream_url("https://example.com/"));
        assert!(!is_stream_url("https://example.com"));
        assert!(!is_stream_url("example.com/stream"));
        assert!(!is_stream_url("test-url"));
    }
}
