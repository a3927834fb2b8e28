//! mpv JSON IPC wire types.
//!
//! Requests are single lines `{"command": [verb, args...]}`; replies are single
//! lines carrying at least `error` (`"success"` on success) and, for property
//! queries, `data`.  Replies are decoded once into [`Reply`] here so callers
//! never poke at raw maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// mpv's `error` value for a successful command.
pub const SUCCESS: &str = "success";
/// mpv's `error` value for a property that does not exist (yet).
pub const PROPERTY_UNAVAILABLE: &str = "property unavailable";

/// An immutable player command.  Serialised as-is onto the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireCommand", try_from = "WireCommand")]
pub struct Command {
    verb: String,
    args: Vec<Value>,
}

#[derive(Serialize, Deserialize)]
struct WireCommand {
    command: Vec<Value>,
}

impl From<Command> for WireCommand {
    fn from(cmd: Command) -> Self {
        let mut command = Vec::with_capacity(cmd.args.len() + 1);
        command.push(Value::String(cmd.verb));
        command.extend(cmd.args);
        WireCommand { command }
    }
}

impl TryFrom<WireCommand> for Command {
    type Error = String;

    fn try_from(wire: WireCommand) -> std::result::Result<Self, Self::Error> {
        let mut parts = wire.command.into_iter();
        match parts.next() {
            Some(Value::String(verb)) if !verb.is_empty() => Ok(Command {
                verb,
                args: parts.collect(),
            }),
            Some(other) => Err(format!("command verb must be a string, got {other}")),
            None => Err("command array is empty".to_string()),
        }
    }
}

impl Command {
    pub fn new(verb: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            verb: verb.into(),
            args,
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Parse a raw JSON request, e.g. one typed by the user.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidCommandJson {
            raw: raw.to_string(),
            reason: e.to_string(),
        })
    }

    /// The newline-terminated request line.
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self).map_err(|e| Error::InvalidCommandJson {
            raw: format!("{self:?}"),
            reason: e.to_string(),
        })?;
        line.push('\n');
        Ok(line)
    }

    pub fn get_property(name: &str) -> Self {
        Self::new("get_property", vec![name.into()])
    }

    pub fn get_property_string(name: &str) -> Self {
        Self::new("get_property_string", vec![name.into()])
    }

    pub fn set_property(name: &str, value: impl Into<Value>) -> Self {
        Self::new("set_property", vec![name.into(), value.into()])
    }

    pub fn cycle(name: &str) -> Self {
        Self::new("cycle", vec![name.into()])
    }

    /// Load a file or stream, replacing whatever is playing.
    pub fn loadfile(location: &str) -> Self {
        Self::new("loadfile", vec![location.into(), "replace".into()])
    }

    pub fn seek_relative(seconds: i64) -> Self {
        Self::new("seek", vec![seconds.into(), "relative".into()])
    }

    pub fn playlist_remove_current() -> Self {
        Self::new("playlist-remove", vec!["current".into()])
    }

    pub fn stop() -> Self {
        Self::new("stop", Vec::new())
    }

    pub fn quit() -> Self {
        Self::new("quit", Vec::new())
    }
}

/// What a reply means, decoded once at the channel boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Success { data: Option<Value> },
    Failure { message: String },
    PropertyMissing,
}

/// One decoded reply line.  Keeps the top-level fields so the Polling Probe can
/// look for a named field without re-parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    reply: Reply,
    fields: Map<String, Value>,
}

impl Response {
    pub fn decode(line: &str) -> Result<Self> {
        let malformed = |source| Error::MalformedResponse {
            line: line.to_string(),
            source,
        };
        let value: Value = serde_json::from_str(line).map_err(malformed)?;
        let Value::Object(fields) = value else {
            return Err(malformed(<serde_json::Error as serde::de::Error>::custom(
                "expected a json object",
            )));
        };

        let reply = match fields.get("error").and_then(Value::as_str) {
            Some(SUCCESS) => Reply::Success {
                data: fields.get("data").cloned(),
            },
            Some(PROPERTY_UNAVAILABLE) => Reply::PropertyMissing,
            Some(message) => Reply::Failure {
                message: message.to_string(),
            },
            None => Reply::Failure {
                message: "reply carries no error field".to_string(),
            },
        };
        Ok(Self { reply, fields })
    }

    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    /// Every top-level field of the reply line, as received.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_success(&self) -> bool {
        matches!(self.reply, Reply::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match &self.reply {
            Reply::Success { data } => data.as_ref(),
            _ => None,
        }
    }

    /// `data` rendered for display: strings verbatim, anything else as JSON.
    pub fn data_text(&self) -> String {
        match self.data() {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// True when `field` is a top-level key or a key of the `data` object.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
            || self
                .data()
                .and_then(Value::as_object)
                .is_some_and(|data| data.contains_key(field))
    }

    /// Turn a non-success reply into an error; `property` names what was asked for.
    pub fn into_data(self, property: &str) -> Result<Option<Value>> {
        match self.reply {
            Reply::Success { data } => Ok(data),
            Reply::PropertyMissing => Err(Error::PropertyUnavailable(property.to_string())),
            Reply::Failure { message } => Err(Error::Player(message)),
        }
    }
}
