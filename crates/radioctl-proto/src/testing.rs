//! A stand-in for mpv's JSON IPC server, shared by the tests of every crate
//! in the workspace.  It listens on the control socket of a throwaway runtime
//! root, records every request, and answers from a script.
//!
//! Only built with the `test-support` feature.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::lock::InstanceLock;
use crate::platform::RuntimePaths;
use crate::protocol::Command;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

/// How the fake reacts to one request.
#[derive(Debug, Clone)]
pub enum Answer {
    Line(String),
    /// Close the connection without writing anything.
    HangUp,
    /// Keep the connection open and never answer.
    Silent,
}

pub fn success(data: Value) -> Answer {
    Answer::Line(json!({ "data": data, "request_id": 0, "error": "success" }).to_string())
}

pub fn failure(message: &str) -> Answer {
    Answer::Line(json!({ "request_id": 0, "error": message }).to_string())
}

/// Roughly what an idle mpv says.
pub fn mpv_like(command: &Command) -> Answer {
    let name = command
        .args()
        .first()
        .and_then(Value::as_str)
        .unwrap_or_default();
    match (command.verb(), name) {
        ("get_property_string", "idle-active") => success(json!("yes")),
        ("get_property_string", "mute") => success(json!("no")),
        ("get_property_string", "pause") => success(json!("no")),
        ("get_property_string", "video") => success(json!("auto")),
        ("get_property_string", "media-title") => success(json!("Fake Title")),
        ("get_property_string", "path") => success(json!("test-url")),
        ("get_property_string", "file-format") => success(json!("mp3")),
        ("get_property_string", "playback-time") => success(json!("12.000000")),
        ("get_property", "metadata" | "filtered-metadata") => {
            success(json!({ "icy-title": "Artist - Song" }))
        }
        ("get_property" | "get_property_string", _) => failure("property unavailable"),
        _ => success(Value::Null),
    }
}

pub struct FakePlayer {
    pub config: Config,
    requests: Arc<Mutex<Vec<Command>>>,
    lock: Option<InstanceLock>,
    server: Option<JoinHandle<()>>,
    dir: TempDir,
}

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default().with_paths(RuntimePaths::under(dir.path(), "tester"));
    config.ipc.settle_delay_ms = 1;
    config.ipc.read_timeout_ms = 300;
    config.probe.interval_ms = 5;
    config.probe.interactive_interval_ms = 5;
    config.status_bar.hook = String::new();
    config
}

impl FakePlayer {
    /// An instance that looks running: lock held, socket listening.
    pub fn start<F>(responder: F) -> Self
    where
        F: Fn(&Command) -> Answer + Send + Sync + 'static,
    {
        let dir = TempDir::new().expect("temp dir");
        let config = test_config(&dir);
        let lock = InstanceLock::acquire(&config.paths).expect("lock");
        let listener = UnixListener::bind(&config.paths.control_socket).expect("bind socket");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let server = tokio::spawn(serve(listener, Arc::new(responder), requests.clone()));
        Self {
            config,
            requests,
            lock: Some(lock),
            server: Some(server),
            dir,
        }
    }

    /// Nothing running, nothing listening.
    pub fn stopped() -> Self {
        let dir = TempDir::new().expect("temp dir");
        Self {
            config: test_config(&dir),
            requests: Arc::new(Mutex::new(Vec::new())),
            lock: None,
            server: None,
            dir,
        }
    }

    pub fn paths(&self) -> &RuntimePaths {
        &self.config.paths
    }

    pub fn requests(&self) -> Vec<Command> {
        self.requests.lock().expect("requests").clone()
    }

    pub fn verbs(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|c| c.verb().to_string())
            .collect()
    }

    /// Files currently present in the runtime root.
    pub fn runtime_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .expect("read temp dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Drop for FakePlayer {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

async fn serve(
    listener: UnixListener,
    responder: Arc<dyn Fn(&Command) -> Answer + Send + Sync>,
    requests: Arc<Mutex<Vec<Command>>>,
) {
    while let Ok((stream, _)) = listener.accept().await {
        let responder = responder.clone();
        let requests = requests.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                return;
            }
            let answer = match Command::parse(line.trim_end()) {
                Ok(command) => {
                    let answer = responder(&command);
                    requests.lock().expect("requests").push(command);
                    answer
                }
                Err(_) => failure("invalid parameter"),
            };
            let mut stream = reader.into_inner();
            match answer {
                Answer::Line(reply) => {
                    let _ = stream.write_all(format!("{reply}\n").as_bytes()).await;
                }
                Answer::HangUp => {}
                Answer::Silent => tokio::time::sleep(Duration::from_secs(30)).await,
            }
        });
    }
}
