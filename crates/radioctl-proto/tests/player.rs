use radioctl_proto::ipc::Channel;
use radioctl_proto::lock::InstanceLock;
use radioctl_proto::player::{resolve_target, Player, Target, Toggle};
use radioctl_proto::protocol::Command;
use radioctl_proto::stations::{Catalog, Stream};
use radioctl_proto::status_bar::StatusBar;
use radioctl_proto::testing::{mpv_like, success, Answer, FakePlayer};
use radioctl_proto::Error;
use serde_json::json;

fn test_catalog() -> Catalog {
    Catalog::try_from(vec![Stream::new(1, "Test", "", "test-url")]).unwrap()
}

#[tokio::test]
async fn playing_a_stream_loads_its_url() {
    let mut player = FakePlayer::start(mpv_like);
    player.config.streams = test_catalog();
    let ops = Player::new(&player.config, Channel::new(&player.config));

    let target = resolve_target(ops.catalog(), "1").unwrap();
    assert!(matches!(&target, Target::Stream(s) if s.name == "Test"));
    ops.play(&target).await.unwrap();
    ops.await_metadata(player.config.probe.menu()).await.unwrap();

    let requests = player.requests();
    assert!(requests.contains(&Command::loadfile("test-url")));
    // idle player: nothing to stop first
    assert!(!requests.contains(&Command::stop()));
    assert_eq!(
        requests.last().unwrap(),
        &Command::get_property("filtered-metadata")
    );
}

#[tokio::test]
async fn playing_clears_the_previous_title() {
    let player = FakePlayer::start(mpv_like);
    let bar = StatusBar::new(&player.config);
    bar.write_title("Old Song").unwrap();

    let ops = Player::new(&player.config, Channel::new(&player.config));
    ops.play(&Target::Url("https://example.com/live".into()))
        .await
        .unwrap();
    assert_eq!(bar.read_title().unwrap(), None);
}

#[tokio::test]
async fn play_stop_skips_an_idle_player() {
    let player = FakePlayer::start(mpv_like);
    let ops = Player::new(&player.config, Channel::new(&player.config));
    ops.play_stop().await.unwrap();
    assert_eq!(player.verbs(), ["get_property_string"]);
}

#[tokio::test]
async fn play_stop_removes_the_current_entry() {
    let player = FakePlayer::start(|command: &Command| match command.args().first() {
        Some(name) if name == "idle-active" => success(json!("no")),
        _ => success(json!(null)),
    });
    let ops = Player::new(&player.config, Channel::new(&player.config));
    ops.play_stop().await.unwrap();
    assert_eq!(
        player.verbs(),
        ["get_property_string", "playlist-remove", "stop"]
    );
}

#[tokio::test]
async fn stop_while_not_running_touches_nothing() {
    let player = FakePlayer::stopped();
    let before = player.runtime_files();
    let ops = Player::new(&player.config, Channel::new(&player.config));

    assert!(matches!(ops.stop_instance().await, Err(Error::NotRunning)));
    assert_eq!(player.runtime_files(), before);
    assert!(player.requests().is_empty());
}

#[tokio::test]
async fn stop_sends_the_shutdown_sequence() {
    let player = FakePlayer::start(mpv_like);
    let ops = Player::new(&player.config, Channel::new(&player.config));
    ops.stop_instance().await.unwrap();
    assert_eq!(player.verbs(), ["playlist-remove", "stop", "quit"]);
}

#[tokio::test]
async fn start_while_running_is_rejected() {
    let player = FakePlayer::start(mpv_like);
    assert!(matches!(
        InstanceLock::acquire(player.paths()),
        Err(Error::AlreadyRunning)
    ));
}

#[tokio::test]
async fn video_toggle_reads_then_writes() {
    let player = FakePlayer::start(mpv_like);
    let ops = Player::new(&player.config, Channel::new(&player.config));
    let value = ops.toggle(Toggle::Video).await.unwrap();
    assert_eq!(value, "auto");

    let requests = player.requests();
    assert_eq!(requests[0], Command::get_property_string("video"));
    assert_eq!(requests[1], Command::set_property("video", false));
    assert_eq!(requests[2], Command::get_property_string("video"));
}

#[tokio::test]
async fn mute_toggle_cycles() {
    let player = FakePlayer::start(mpv_like);
    let ops = Player::new(&player.config, Channel::new(&player.config));
    assert_eq!(ops.toggle(Toggle::Mute).await.unwrap(), "no");
    assert_eq!(player.requests()[0], Command::cycle("mute"));
}

#[tokio::test]
async fn volume_outside_range_is_an_invalid_selection() {
    let player = FakePlayer::start(mpv_like);
    let ops = Player::new(&player.config, Channel::new(&player.config));
    assert!(matches!(
        ops.set_volume(101).await,
        Err(Error::InvalidSelection { .. })
    ));
    assert!(player.requests().is_empty());

    ops.set_volume(40).await.unwrap();
    assert_eq!(player.requests(), [Command::set_property("volume", 40)]);
}

#[tokio::test]
async fn failed_commands_surface_the_player_message() {
    let player = FakePlayer::start(|command: &Command| match command.verb() {
        "seek" => Answer::Line(r#"{"error":"error running command"}"#.to_string()),
        _ => success(json!(null)),
    });
    let ops = Player::new(&player.config, Channel::new(&player.config));
    assert!(matches!(
        ops.seek(10).await,
        Err(Error::Player(message)) if message == "error running command"
    ));
}

#[tokio::test]
async fn status_lists_properties_and_metadata() {
    let player = FakePlayer::start(mpv_like);
    let ops = Player::new(&player.config, Channel::new(&player.config));
    let status = ops.status().await.unwrap();

    assert!(status.starts_with("mute:  no\npause: no\nvideo: auto\nidle:  yes\n"));
    assert!(status.contains("song:  Fake Title\n"));
    assert!(status.contains("ffmt:  mp3\n"));
    assert!(status.contains("\"icy-title\": \"Artist - Song\""));
}

#[tokio::test]
async fn title_prefers_the_status_file() {
    let player = FakePlayer::start(mpv_like);
    let ops = Player::new(&player.config, Channel::new(&player.config));
    assert_eq!(ops.title().await.unwrap(), "Fake Title");

    StatusBar::new(&player.config).write_title("From Log").unwrap();
    assert_eq!(ops.title().await.unwrap(), "From Log");
}
