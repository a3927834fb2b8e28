mod input;
mod menu;
mod selector;
mod shutdown;
mod supervisor;
mod title;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use radioctl_proto::config::Config;
use radioctl_proto::error::Error;
use radioctl_proto::ipc::Channel;
use radioctl_proto::platform::PROG_NAME;
use radioctl_proto::player::{resolve_target, Player, Toggle};
use radioctl_proto::protocol::Command;
use serde_json::Value;
use tracing::info;

use crate::menu::StreamMenu;
use crate::shutdown::Shutdown;

/// Control a background mpv over its JSON IPC socket.
#[derive(Debug, Parser)]
#[command(name = "radioctl", version, arg_required_else_help = true)]
struct Cli {
    /// Config file (default: <config dir>/radioctl/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Verb,
}

#[derive(Debug, Subcommand)]
enum Verb {
    /// Exit non-zero unless an instance is running
    Check,
    /// Interactive stream menu
    Menu,
    /// Interactive file selector in the current directory
    #[command(visible_alias = "sf")]
    Browse,
    /// Toggle mute
    Mute,
    /// Toggle pause
    Pause,
    /// Toggle video between auto and off
    Video,
    /// Seek forward (+N) or backward (-N) seconds
    Seek {
        #[arg(allow_hyphen_values = true, value_parser = seek_offset)]
        offset: i64,
    },
    /// Start the player and supervise it until it exits
    Start,
    /// Print player status
    Status,
    /// Stop the running instance
    Stop,
    /// Stop playing the current media
    #[command(name = "stop-playback", visible_aliases = ["stopp", "stopplay"])]
    StopPlayback,
    /// Print the current media title
    Title,
    /// Set the volume
    #[command(visible_alias = "vol")]
    Volume {
        #[arg(allow_hyphen_values = true)]
        level: i64,
    },
    /// Send one raw JSON command and print the reply
    Raw { json: String },
    /// Play a stream id, stream url or local file
    #[command(external_subcommand)]
    Play(Vec<String>),
}

fn seek_offset(arg: &str) -> Result<i64, String> {
    menu::parse_seek(arg).ok_or_else(|| format!("'{arg}' must look like +N or -N"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config.paths.log_file)?;
    info!("{} {:?}", PROG_NAME, cli.command);

    let shutdown = Shutdown::new();
    let channel = Channel::new(&config).with_cancel(shutdown.token());
    let code = run(cli, &config, channel, &shutdown).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();
    Ok(())
}

/// Dispatch one verb; returns the process exit code.
async fn run(cli: Cli, config: &Config, channel: Channel, shutdown: &Shutdown) -> anyhow::Result<i32> {
    let player = Player::new(config, channel.clone());
    match cli.command {
        Verb::Check => {
            if !player.is_running() {
                return Err(Error::NotRunning.into());
            }
        }
        Verb::Start => {
            let _signals = shutdown.listen()?;
            return Ok(supervisor::start(config, shutdown).await?);
        }
        Verb::Menu => {
            let _signals = shutdown.listen()?;
            StreamMenu::new(config, channel)
                .with_config_file(cli.config)
                .run(shutdown.token())
                .await?;
            return Ok(shutdown.exit_code());
        }
        Verb::Browse => {
            let _signals = shutdown.listen()?;
            match selector::browse(config, channel, shutdown.token()).await {
                Ok(()) | Err(Error::Cancelled) => return Ok(shutdown.exit_code()),
                Err(e) => return Err(e.into()),
            }
        }
        Verb::Mute => {
            player.toggle(Toggle::Mute).await?;
        }
        Verb::Pause => {
            player.toggle(Toggle::Pause).await?;
        }
        Verb::Video => {
            player.toggle(Toggle::Video).await?;
        }
        Verb::Seek { offset } => {
            player.seek(offset).await?;
        }
        Verb::Volume { level } => player.set_volume(level).await?,
        Verb::Status => println!("{}", player.status().await?),
        Verb::Title => println!("title: {}", player.title().await?),
        Verb::Stop => supervisor::stop(config, channel).await?,
        Verb::StopPlayback => player.play_stop().await?,
        Verb::Raw { json } => {
            let command = Command::parse(&json)?;
            let response = channel.send_one(&command).await?;
            println!("{}", Value::Object(response.fields().clone()));
        }
        Verb::Play(args) => {
            let input = args.join(" ");
            let target = resolve_target(player.catalog(), &input)?;
            player.play(&target).await?;
            player.await_metadata(config.probe.cli()).await?;
        }
    }
    Ok(0)
}
