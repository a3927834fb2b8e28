//! Interactive File Selector: a paginated, raw-key directory browser.
//!
//! ```text
//!   enter dir ─▶ list + Pager::new ─▶ draw page ─▶ key ─┬─ line move  → repaint two rows + footer
//!       ▲                                               ├─ page move  → draw page
//!       │                                               ├─ file       → play + probe
//!       └───────────────────────────────────────────────┴─ dir        → enter dir
//! ```
//!
//! The working directory is tracked here and never changed for the process.
//! Action failures go to the footer status line and the loop continues;
//! only a shutdown signal or a terminal that is too small ends it early.

mod keys;
mod listing;
mod pager;
mod screen;

use std::io::Write;
use std::path::{Path, PathBuf};

use crossterm::terminal;
use radioctl_proto::config::Config;
use radioctl_proto::error::{Error, Result};
use radioctl_proto::ipc::Channel;
use radioctl_proto::platform;
use radioctl_proto::player::{Player, Target};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::input::{self, Input};
pub use keys::Key;
use listing::{Entry, EntryKind};
use pager::Pager;
use screen::{RawTerminal, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stay,
    Quit,
}

/// Run the selector on the terminal, starting in the current directory.
pub async fn browse(config: &Config, channel: Channel, cancel: CancellationToken) -> Result<()> {
    let (cols, rows) = terminal::size()?;
    let cwd = std::env::current_dir()?;
    let mut selector = Selector::open(config, channel, std::io::stdout(), cwd, cols, rows)?;

    let mut keys = input::keys(std::io::stdin())?;
    let _raw = RawTerminal::enable()?;
    selector.run(&mut keys, &cancel).await
}

pub struct Selector<'a, W: Write> {
    config: &'a Config,
    player: Player<'a>,
    screen: Screen<W>,
    rows: u16,
    cwd: PathBuf,
    previous: Option<PathBuf>,
    entries: Vec<Entry>,
    pager: Pager,
    status: String,
    help_open: bool,
}

impl<'a, W: Write> Selector<'a, W> {
    /// Lists `cwd` and sizes the first page.  Nothing is drawn yet.
    pub fn open(
        config: &'a Config,
        channel: Channel,
        out: W,
        cwd: PathBuf,
        cols: u16,
        rows: u16,
    ) -> Result<Self> {
        let entries = listing::list(&cwd)?;
        let pager = Pager::new(rows, entries.len())?;
        Ok(Self {
            config,
            player: Player::new(config, channel),
            screen: Screen::new(out, cols),
            rows,
            cwd,
            previous: None,
            entries,
            pager,
            status: String::new(),
            help_open: false,
        })
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn output(&self) -> &W {
        self.screen.get_ref()
    }

    pub fn draw(&mut self) -> Result<()> {
        self.screen
            .page(&self.cwd, &self.entries, &self.pager, &self.status)?;
        Ok(())
    }

    fn footer(&mut self) -> Result<()> {
        self.screen.footer(&self.entries, &self.pager, &self.status)?;
        Ok(())
    }

    /// Draw, then handle keys until quit, end of input or `cancel`.
    pub async fn run(
        &mut self,
        keys: &mut Input<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.draw()?;
        while let Some(bytes) = keys.next(cancel).await? {
            let key = keys::decode(&bytes);
            debug!("sf: key {:?}", key);
            if self.handle(key).await? == Outcome::Quit {
                break;
            }
        }
        Ok(())
    }

    pub async fn handle(&mut self, key: Key) -> Result<Outcome> {
        if self.help_open {
            self.help_open = false;
            self.draw()?;
            return Ok(Outcome::Stay);
        }
        match self.act(key).await {
            Ok(outcome) => Ok(outcome),
            Err(e @ (Error::Cancelled | Error::TerminalTooSmall { .. })) => Err(e),
            Err(e) => {
                warn!("sf: {}", e);
                self.status = e.to_string();
                self.footer()?;
                Ok(Outcome::Stay)
            }
        }
    }

    async fn act(&mut self, key: Key) -> Result<Outcome> {
        match key {
            Key::Char('j') | Key::Down => self.move_cursor(Pager::down)?,
            Key::Char('k') | Key::Up => self.move_cursor(Pager::up)?,
            Key::Char('J') | Key::ShiftDown => self.move_cursor(Pager::bottom)?,
            Key::Char('K') | Key::ShiftUp => self.move_cursor(Pager::top)?,
            Key::Char('l') | Key::Right => self.turn_page(Pager::next_page)?,
            Key::Char('h') | Key::Left => self.turn_page(Pager::prev_page)?,
            Key::Enter => self.activate().await?,
            Key::Char('-') => {
                let parent = self.cwd.parent().map(Path::to_path_buf);
                match parent {
                    Some(parent) => self.change_dir(parent)?,
                    None => self.report("already at the root directory")?,
                }
            }
            Key::Char('~') => match platform::home_dir() {
                Some(home) => self.change_dir(home)?,
                None => self.report("home directory unknown")?,
            },
            Key::Char('_' | '^' | 'p') => match self.previous.clone() {
                Some(previous) => self.change_dir(previous)?,
                None => self.report("no previous directory")?,
            },
            Key::Char('.' | 'r') => self.redraw()?,
            Key::Char('?') => {
                self.help_open = true;
                self.screen.help()?;
            }
            Key::Char('q') | Key::Escape => return Ok(Outcome::Quit),
            Key::Partial => {}
            Key::Char(c) => self.report(&format!("invalid key '{c}', press ? for help"))?,
            Key::Unknown => self.report("invalid key, press ? for help")?,
        }
        Ok(Outcome::Stay)
    }

    fn report(&mut self, message: &str) -> Result<()> {
        self.status = message.to_string();
        self.footer()
    }

    fn move_cursor(&mut self, step: fn(&mut Pager) -> bool) -> Result<()> {
        let from = self.pager.cursor();
        if step(&mut self.pager) {
            self.status.clear();
            self.screen
                .moved(&self.entries, &self.pager, from, &self.status)?;
        }
        Ok(())
    }

    fn turn_page(&mut self, step: fn(&mut Pager) -> bool) -> Result<()> {
        if step(&mut self.pager) {
            self.status.clear();
            self.draw()?;
        }
        Ok(())
    }

    /// Re-read the terminal size when there is one and draw everything.
    fn redraw(&mut self) -> Result<()> {
        if let Ok((cols, rows)) = terminal::size() {
            self.pager.resize(rows)?;
            self.rows = rows;
            self.screen.set_cols(cols);
        }
        self.draw()
    }

    /// The listing is read before anything changes, so a failure leaves the
    /// selector where it was.
    fn change_dir(&mut self, target: PathBuf) -> Result<()> {
        let entries = listing::list(&target)?;
        let pager = Pager::new(self.rows, entries.len())?;
        debug!("sf: cd {}", target.display());
        self.previous = Some(std::mem::replace(&mut self.cwd, target));
        self.entries = entries;
        self.pager = pager;
        self.status.clear();
        self.draw()
    }

    async fn activate(&mut self) -> Result<()> {
        let Some(entry) = self
            .pager
            .selected()
            .and_then(|index| self.entries.get(index))
            .cloned()
        else {
            return self.report("empty directory");
        };
        match entry.kind {
            EntryKind::Dir => self.change_dir(entry.path),
            EntryKind::File => {
                let target = Target::File(entry.path);
                self.player.play(&target).await?;
                self.player
                    .await_metadata(self.config.probe.selector())
                    .await?;
                info!("sf: playing {}", entry.name);
                self.report(&format!("playing: {}", entry.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    use radioctl_proto::platform::RuntimePaths;
    use radioctl_proto::protocol::Command;
    use radioctl_proto::testing::{mpv_like, FakePlayer};
    use tempfile::TempDir;

    /// `album/01.flac`, `b.mp3`, `c.mp3`
    fn music_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("album")).unwrap();
        fs::write(dir.path().join("album").join("01.flac"), b"").unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(dir.path().join("c.mp3"), b"").unwrap();
        dir
    }

    fn offline_config(dir: &TempDir) -> Config {
        let mut config =
            Config::default().with_paths(RuntimePaths::under(dir.path(), "tester"));
        config.status_bar.hook = String::new();
        config
    }

    fn open<'a>(config: &'a Config, cwd: &Path, rows: u16) -> Result<Selector<'a, Vec<u8>>> {
        Selector::open(config, Channel::new(config), Vec::new(), cwd.to_path_buf(), 80, rows)
    }

    #[test]
    fn test_small_terminal_fails_before_drawing() {
        let music = music_dir();
        let config = offline_config(&music);
        assert!(matches!(
            open(&config, music.path(), 5),
            Err(Error::TerminalTooSmall { rows: 5, needed: 8 })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_ends_the_loop_while_keyboard_stays_open() {
        let music = music_dir();
        let config = offline_config(&music);
        let mut selector = open(&config, music.path(), 24).unwrap();
        let (reader, _writer) = UnixStream::pair().unwrap();
        let mut keys = input::keys(reader).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let finished =
            tokio::time::timeout(Duration::from_secs(2), selector.run(&mut keys, &cancel)).await;
        assert!(matches!(finished, Ok(Err(Error::Cancelled))));
        assert!(!selector.output().is_empty());
    }

    #[tokio::test]
    async fn test_run_moves_then_quits_on_q() {
        let music = music_dir();
        let config = offline_config(&music);
        let mut selector = open(&config, music.path(), 24).unwrap();
        let (reader, mut writer) = UnixStream::pair().unwrap();
        let mut keys = input::keys(reader).unwrap();
        let cancel = CancellationToken::new();

        let typist = std::thread::spawn(move || {
            writer.write_all(b"j").unwrap();
            std::thread::sleep(Duration::from_millis(50));
            writer.write_all(b"q").unwrap();
            writer
        });
        let finished =
            tokio::time::timeout(Duration::from_secs(2), selector.run(&mut keys, &cancel)).await;
        assert!(matches!(finished, Ok(Ok(()))));
        assert_eq!(selector.pager().cursor(), 1);
        drop(typist.join().unwrap());
    }

    #[tokio::test]
    async fn test_enter_descends_and_navigation_keys() {
        let music = music_dir();
        let config = offline_config(&music);
        let mut selector = open(&config, music.path(), 24).unwrap();

        selector.handle(Key::Enter).await.unwrap();
        assert_eq!(selector.cwd(), music.path().join("album"));
        assert_eq!(selector.pager().len(), 1);

        selector.handle(Key::Char('-')).await.unwrap();
        assert_eq!(selector.cwd(), music.path());

        selector.handle(Key::Char('_')).await.unwrap();
        assert_eq!(selector.cwd(), music.path().join("album"));
        let out = String::from_utf8_lossy(selector.output()).into_owned();
        assert!(out.contains("# 1/1) 01.flac"));
    }

    #[tokio::test]
    async fn test_failed_listing_keeps_directory() {
        let music = music_dir();
        let config = offline_config(&music);
        let mut selector = open(&config, music.path(), 24).unwrap();
        fs::remove_dir_all(music.path().join("album")).unwrap();

        assert_eq!(selector.handle(Key::Enter).await.unwrap(), Outcome::Stay);
        assert_eq!(selector.cwd(), music.path());
        assert!(selector.status().starts_with("cannot list"));
    }

    #[tokio::test]
    async fn test_unknown_key_keeps_cursor() {
        let music = music_dir();
        let config = offline_config(&music);
        let mut selector = open(&config, music.path(), 24).unwrap();

        selector.handle(Key::Char('j')).await.unwrap();
        let cursor = selector.pager().cursor();
        selector.handle(Key::Char('z')).await.unwrap();
        assert_eq!(selector.pager().cursor(), cursor);
        assert_eq!(selector.status(), "invalid key 'z', press ? for help");
        selector.handle(Key::Partial).await.unwrap();
        assert_eq!(selector.pager().cursor(), cursor);
    }

    #[tokio::test]
    async fn test_pages_turn_with_h_and_l() {
        let music = music_dir();
        let config = offline_config(&music);
        let mut selector = open(&config, music.path(), 10).unwrap(); // two per page

        selector.handle(Key::Char('l')).await.unwrap();
        assert_eq!(selector.pager().page(), 2);
        assert_eq!(selector.pager().selected(), Some(2));
        selector.handle(Key::Right).await.unwrap();
        assert_eq!(selector.pager().page(), 2);
        selector.handle(Key::Char('h')).await.unwrap();
        assert_eq!(selector.pager().page(), 1);
    }

    #[tokio::test]
    async fn test_help_overlay_closes_on_any_key() {
        let music = music_dir();
        let config = offline_config(&music);
        let mut selector = open(&config, music.path(), 24).unwrap();

        selector.handle(Key::Char('?')).await.unwrap();
        assert_eq!(selector.handle(Key::Char('q')).await.unwrap(), Outcome::Stay);
        assert_eq!(selector.handle(Key::Char('q')).await.unwrap(), Outcome::Quit);
        assert_eq!(selector.handle(Key::Escape).await.unwrap(), Outcome::Quit);
    }

    #[tokio::test]
    async fn test_enter_on_file_plays_it() {
        let music = music_dir();
        let player = FakePlayer::start(mpv_like);
        let mut selector = open(&player.config, music.path(), 24).unwrap();

        selector.handle(Key::Down).await.unwrap();
        selector.handle(Key::Enter).await.unwrap();
        let path = music.path().join("b.mp3");
        assert!(player
            .requests()
            .contains(&Command::loadfile(&path.display().to_string())));
        assert_eq!(selector.status(), "playing: b.mp3");
    }

    #[tokio::test]
    async fn test_play_without_player_shows_error() {
        let music = music_dir();
        let config = offline_config(&music);
        let mut selector = open(&config, music.path(), 24).unwrap();

        selector.handle(Key::Char('J')).await.unwrap();
        selector.handle(Key::Enter).await.unwrap();
        assert_eq!(selector.status(), Error::NotRunning.to_string());
    }
}
