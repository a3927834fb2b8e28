//! Stream Menu: a line-at-a-time REPL over the stream catalog.
//!
//! ```text
//!   render ─▶ read line ─▶ step ─▶ render ...
//!                            ├── verb       → player operation, result on the status line
//!                            ├── id / url   → play + probe for metadata
//!                            └── invalid    → counter; MAX consecutive → TooManyErrors
//! ```
//!
//! Errors never end the loop; they become the next frame's status line.
//! The two exceptions are `TooManyErrors` and a shutdown signal.

use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Stdio;

use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use radioctl_proto::config::Config;
use radioctl_proto::error::{Error, Result};
use radioctl_proto::ipc::Channel;
use radioctl_proto::platform::PROG_NAME;
use radioctl_proto::player::{resolve_target, Player, Target, Toggle};
use radioctl_proto::stations::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::input::{self, Input};
use crate::{selector, supervisor};

/// What the loop does after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Browse,
    Exit,
}

#[derive(Debug, Default)]
pub struct MenuState {
    /// Shown under the catalog on the next frame.
    pub status: String,
    pub invalid_inputs: u32,
    /// Catalog id picked in this session.
    pub selected: Option<u32>,
    /// What the player reports as loaded; the player is authoritative.
    pub current_path: Option<String>,
}

pub struct StreamMenu<'a> {
    config: &'a Config,
    player: Player<'a>,
    state: MenuState,
    /// Handed to `radioctl start` when the menu starts an instance.
    config_file: Option<PathBuf>,
}

impl<'a> StreamMenu<'a> {
    pub fn new(config: &'a Config, channel: Channel) -> Self {
        Self {
            config,
            player: Player::new(config, channel),
            state: MenuState::default(),
            config_file: None,
        }
    }

    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    pub fn state(&self) -> &MenuState {
        &self.state
    }

    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let mut lines = input::stdin_lines()?;
        self.drive(&mut std::io::stdout(), &mut lines, &cancel).await
    }

    /// The loop behind [`run`](Self::run), over any screen and line source.
    pub async fn drive<W: Write>(
        &mut self,
        out: &mut W,
        lines: &mut Input<String>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !self.player.is_running() {
            self.state.status = format!("info: '{PROG_NAME}' is not running, see help");
        }
        self.state.current_path = self.player.stream_path().await;

        loop {
            if self.state.status.is_empty() {
                if let Some(stream) = self.marked() {
                    self.state.status = stream.name.clone();
                }
            }
            self.draw(out)?;

            let line = match lines.next(cancel).await {
                Ok(Some(line)) => line,
                Ok(None) | Err(Error::Cancelled) => return Ok(()),
                Err(e) => return Err(e),
            };

            match self.step(&line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) | Err(Error::Cancelled) => return Ok(()),
                Ok(Flow::Browse) => {
                    let channel = self.player.channel().clone();
                    self.state.status =
                        match selector::browse(self.config, channel, cancel.clone()).await {
                            Ok(()) => "info: 'sf' was closed".to_string(),
                            Err(Error::Cancelled) => return Ok(()),
                            Err(e) => e.to_string(),
                        };
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn draw<W: Write>(&self, out: &mut W) -> Result<()> {
        execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        out.write_all(self.render().as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// The entry playing now, by session pick or by the player's path.
    fn marked(&self) -> Option<&Stream> {
        self.config.streams.iter().find(|s| self.is_marked(s))
    }

    fn is_marked(&self, stream: &Stream) -> bool {
        self.state.selected == Some(stream.id)
            || self.state.current_path.as_deref() == Some(stream.url.as_str())
    }

    pub fn render(&self) -> String {
        let width = self.config.streams.id_width();
        let pad = " ".repeat(width);
        let mut out = String::new();
        out.push_str(&format!("{pad}### {} ###\n", PROG_NAME.to_uppercase()));
        out.push_str(&format!("{pad}?) help\n"));
        out.push_str(&format!("{pad}.) sf\n"));
        for stream in self.config.streams.iter() {
            let mark = if self.is_marked(stream) { '*' } else { ' ' };
            out.push_str(&format!("{mark}{:>width$}) {}\n", stream.id, stream.name));
        }
        out.push_str(&format!("\n# {}\n> ", self.state.status.trim_end_matches('\n')));
        out
    }

    /// Dispatch one input line and fold its error into the menu state.
    pub async fn step(&mut self, input: &str) -> Result<Flow> {
        match self.dispatch(input.trim()).await {
            Ok(flow) => {
                self.state.invalid_inputs = 0;
                Ok(flow)
            }
            Err(e @ Error::InvalidSelection { .. }) => {
                self.state.invalid_inputs += 1;
                debug!(
                    "menu: invalid input {}/{}",
                    self.state.invalid_inputs, self.config.menu.max_errors
                );
                if self.state.invalid_inputs >= self.config.menu.max_errors {
                    return Err(Error::TooManyErrors);
                }
                self.state.status = e.to_string();
                Ok(Flow::Continue)
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!("menu: {}", e);
                self.state.invalid_inputs = 0;
                self.state.status = e.to_string();
                Ok(Flow::Continue)
            }
        }
    }

    async fn dispatch(&mut self, input: &str) -> Result<Flow> {
        if let Some(arg) = input.strip_prefix("seek ") {
            if let Some(seconds) = parse_seek(arg) {
                let time = self.player.seek(seconds).await?;
                self.state.status = format!("time: {time}");
                return Ok(Flow::Continue);
            }
        }
        if let Some(arg) = input
            .strip_prefix("volume ")
            .or_else(|| input.strip_prefix("vol "))
        {
            if let Ok(level) = arg.parse::<i64>() {
                self.player.set_volume(level).await?;
                self.state.status = format!("volume: {level}");
                return Ok(Flow::Continue);
            }
        }

        match input {
            "." | "sf" => return Ok(Flow::Browse),
            "?" | "help" => self.state.status = help_text(self.config),
            "clear" => self.state.status.clear(),
            "exit" => return Ok(Flow::Exit),
            "mute" | "pause" | "video" => {
                let toggle = match input {
                    "mute" => Toggle::Mute,
                    "pause" => Toggle::Pause,
                    _ => Toggle::Video,
                };
                let value = self.player.toggle(toggle).await?;
                self.state.status = format!("{toggle}: {value}");
            }
            "number" | "url" => {
                self.state.status = format!("info: simply put the stream {input} and press ENTER");
            }
            "start" => self.start_instance()?,
            "status" => {
                let status = self.player.status().await?;
                self.state.status = format!("status\n{status}");
            }
            "stop" => {
                self.forget_current();
                supervisor::stop(self.config, self.player.channel().clone()).await?;
            }
            "stop-playback" | "stopp" | "stopplay" => {
                self.forget_current();
                self.player.play_stop().await?;
            }
            _ => self.play(input).await?,
        }
        Ok(Flow::Continue)
    }

    fn forget_current(&mut self) {
        self.state.selected = None;
        self.state.current_path = None;
        self.state.status.clear();
    }

    async fn play(&mut self, input: &str) -> Result<()> {
        let target = resolve_target(self.player.catalog(), input)?;
        self.forget_current();
        self.player.play(&target).await?;
        self.player.await_metadata(self.config.probe.menu()).await?;

        let catalog = self.player.catalog();
        let picked = match &target {
            Target::Stream(stream) => Some(stream),
            Target::Url(url) => catalog.find_by_url(url),
            Target::File(_) => None,
        };
        self.state.selected = picked.map(|s| s.id);
        self.state.status = picked.map_or_else(|| input.to_string(), |s| s.name.clone());
        self.state.current_path = Some(target.location());
        info!("menu: playing {}", self.state.status);
        Ok(())
    }

    /// Start an instance in its own process group so it outlives the menu.
    fn start_instance(&mut self) -> Result<()> {
        if self.player.is_running() {
            return Err(Error::AlreadyRunning);
        }
        let exe = std::env::current_exe()?;
        let mut command = std::process::Command::new(exe);
        if let Some(path) = &self.config_file {
            command.arg("--config").arg(path);
        }
        command
            .arg("start")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);
        let mut child = tokio::process::Command::from(command).spawn()?;
        let pid = child.id().unwrap_or_default();
        tokio::spawn(async move {
            let _ = child.wait().await;
        });
        info!("menu: started instance pid {}", pid);
        self.state.status = format!("info: {PROG_NAME} pid: {pid}");
        Ok(())
    }
}

/// `+N` or `-N`, whole seconds.
pub fn parse_seek(arg: &str) -> Option<i64> {
    let digits = arg.strip_prefix(&['+', '-'][..])?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    arg.parse().ok()
}

fn help_text(config: &Config) -> String {
    let volume = &config.volume;
    [
        "help".to_string(),
        "clear       # clear the terminal screen".to_string(),
        "exit        # exits the menu".to_string(),
        "sf          # launches the file selector [.]".to_string(),
        "number      # plays the selected media stream".to_string(),
        "url         # plays the stream url".to_string(),
        format!("start       # starts {PROG_NAME}"),
        format!("stop        # stops {PROG_NAME}"),
        "stopplay    # stops playing the current media [stopp]".to_string(),
        "status      # prints status information".to_string(),
        "seek +n/-n  # seeks forward (+n) or backward (-n) number in seconds".to_string(),
        "mute        # toggles between mute and unmute".to_string(),
        "pause       # toggles between pause and unpause".to_string(),
        "video       # toggles between video auto and off".to_string(),
        format!(
            "volume n    # sets volume number between ({}-{}) [vol]",
            volume.min, volume.max
        ),
        "help        # shows help menu information [?]".to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    use radioctl_proto::protocol::Command;
    use radioctl_proto::stations::Catalog;
    use radioctl_proto::testing::{mpv_like, FakePlayer};

    fn single_stream(player: &FakePlayer) -> Config {
        let mut config = player.config.clone();
        config.streams = Catalog::try_from(vec![Stream::new(1, "Test", "", "test-url")]).unwrap();
        config
    }

    #[tokio::test]
    async fn test_picking_an_id_plays_and_names_the_stream() {
        let player = FakePlayer::start(mpv_like);
        let config = single_stream(&player);
        let mut menu = StreamMenu::new(&config, Channel::new(&config));

        assert_eq!(menu.step("1").await.unwrap(), Flow::Continue);
        assert_eq!(menu.state().status, "Test");
        assert_eq!(menu.state().selected, Some(1));
        assert!(player.requests().contains(&Command::loadfile("test-url")));
        assert_eq!(
            player.requests().last(),
            Some(&Command::get_property("filtered-metadata"))
        );
        assert!(menu.render().contains("*1) Test\n"));
    }

    #[tokio::test]
    async fn test_unknown_id_is_an_invalid_selection() {
        let player = FakePlayer::start(mpv_like);
        let config = single_stream(&player);
        let mut menu = StreamMenu::new(&config, Channel::new(&config));

        assert_eq!(menu.step("7").await.unwrap(), Flow::Continue);
        assert!(menu.state().status.starts_with("invalid option '7'"));
        assert_eq!(menu.state().invalid_inputs, 1);
        assert!(player.requests().is_empty());
    }

    #[tokio::test]
    async fn test_five_bad_inputs_end_the_loop() {
        let player = FakePlayer::start(mpv_like);
        let config = single_stream(&player);
        let mut menu = StreamMenu::new(&config, Channel::new(&config));

        for (n, input) in ["x", "99", "not a url", "", "-"].into_iter().enumerate() {
            let result = menu.step(input).await;
            if n < 4 {
                assert_eq!(result.unwrap(), Flow::Continue);
            } else {
                assert!(matches!(result, Err(Error::TooManyErrors)));
            }
        }
    }

    #[tokio::test]
    async fn test_valid_input_resets_the_counter() {
        let player = FakePlayer::start(mpv_like);
        let config = single_stream(&player);
        let mut menu = StreamMenu::new(&config, Channel::new(&config));

        for _ in 0..4 {
            menu.step("bogus").await.unwrap();
        }
        menu.step("clear").await.unwrap();
        assert_eq!(menu.state().invalid_inputs, 0);
        assert_eq!(menu.step("bogus").await.unwrap(), Flow::Continue);
    }

    #[tokio::test]
    async fn test_verbs_report_on_the_status_line() {
        let player = FakePlayer::start(mpv_like);
        let config = single_stream(&player);
        let mut menu = StreamMenu::new(&config, Channel::new(&config));

        menu.step("mute").await.unwrap();
        assert_eq!(menu.state().status, "mute: no");
        menu.step("seek -5").await.unwrap();
        assert_eq!(menu.state().status, "time: 12.000000");
        menu.step("vol 30").await.unwrap();
        assert_eq!(menu.state().status, "volume: 30");
        menu.step("number").await.unwrap();
        assert!(menu.state().status.contains("stream number"));
        assert_eq!(menu.step("sf").await.unwrap(), Flow::Browse);
        assert_eq!(menu.step("exit").await.unwrap(), Flow::Exit);
    }

    #[tokio::test]
    async fn test_start_while_running_is_reported() {
        let player = FakePlayer::start(mpv_like);
        let config = single_stream(&player);
        let mut menu = StreamMenu::new(&config, Channel::new(&config));

        assert_eq!(menu.step("start").await.unwrap(), Flow::Continue);
        assert_eq!(menu.state().status, Error::AlreadyRunning.to_string());
    }

    #[tokio::test]
    async fn test_shutdown_ends_the_loop_while_input_stays_open() {
        let player = FakePlayer::start(mpv_like);
        let config = single_stream(&player);
        let mut menu = StreamMenu::new(&config, Channel::new(&config));
        let (reader, _writer) = UnixStream::pair().unwrap();
        let mut lines = input::lines(reader).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let mut screen = Vec::new();
        let finished = tokio::time::timeout(
            Duration::from_secs(2),
            menu.drive(&mut screen, &mut lines, &cancel),
        )
        .await;
        assert!(matches!(finished, Ok(Ok(()))));
        assert!(String::from_utf8_lossy(&screen).contains("1) Test"));
    }

    #[tokio::test]
    async fn test_drive_plays_then_exits() {
        let player = FakePlayer::start(mpv_like);
        let config = single_stream(&player);
        let mut menu = StreamMenu::new(&config, Channel::new(&config));
        let mut lines = input::lines(&b"1\nexit\n"[..]).unwrap();

        let mut screen = Vec::new();
        menu.drive(&mut screen, &mut lines, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(menu.state().status, "Test");
        assert!(String::from_utf8_lossy(&screen).contains("*1) Test"));
    }

    #[test]
    fn test_parse_seek() {
        assert_eq!(parse_seek("+10"), Some(10));
        assert_eq!(parse_seek("-3"), Some(-3));
        assert_eq!(parse_seek("10"), None);
        assert_eq!(parse_seek("+"), None);
        assert_eq!(parse_seek("+1x"), None);
    }
}
