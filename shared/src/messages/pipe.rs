//! Pipe wire protocol
//!
//! Every frame is one line of UTF-8 text, `"<command>;<payload>\n"`. The
//! command is the trimmed text before the first `;`, the payload the trimmed
//! text after it. A frame without `;` has an empty payload.

use std::fmt;

use crate::errors::{SharedError, SharedResult};
use crate::types::ChannelIdentity;

/// Command names reserved by the protocol
pub mod commands {
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const JOIN: &str = "join";
    pub const JOINED: &str = "joined";
    pub const LEAVE: &str = "leave";
    pub const LEFT: &str = "left";
    pub const SPEAKING: &str = "speaking";
    pub const INFO: &str = "info";
    pub const ERROR: &str = "error";
}

/// Payload of a `speaking` frame when nobody is speaking
pub const NOBODY_SPEAKING: &str = "_";

const SEPARATOR: char = ';';
const TERMINATOR: u8 = b'\n';

/// One decoded frame. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    command: String,
    payload: String,
}

impl Message {
    /// Build a message, trimming both parts the way the decoder does.
    ///
    /// Fails when the command is empty or contains `;`, or when either part
    /// contains a line break.
    pub fn new(command: impl Into<String>, payload: impl Into<String>) -> SharedResult<Self> {
        let command = command.into().trim().to_string();
        let payload = payload.into().trim().to_string();

        if command.is_empty() || command.contains(SEPARATOR) || command.contains('\n') {
            return Err(SharedError::InvalidCommand { command });
        }
        if payload.contains('\n') {
            return Err(SharedError::malformed("payload contains a line break"));
        }

        Ok(Self { command, payload })
    }

    /// Internal constructor for the fixed protocol commands
    /// Build a frame for a known command; line breaks in the payload become spaces
    fn fixed(command: &'static str, payload: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            payload: payload.into().replace(['\r', '\n'], " "),
        }
    }

    pub fn ping() -> Self {
        Self::fixed(commands::PING, "")
    }

    pub fn pong() -> Self {
        Self::fixed(commands::PONG, "")
    }

    pub fn info_request() -> Self {
        Self::fixed(commands::INFO, "")
    }

    pub fn leave() -> Self {
        Self::fixed(commands::LEAVE, "")
    }

    pub fn left() -> Self {
        Self::fixed(commands::LEFT, "")
    }

    pub fn join(identity: &ChannelIdentity) -> Self {
        Self::fixed(commands::JOIN, identity.to_string())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn is(&self, command: &str) -> bool {
        self.command == command
    }

    /// Encode as a newline-terminated frame
    pub fn encode(&self) -> Vec<u8> {
        format!("{}{}{}\n", self.command, SEPARATOR, self.payload).into_bytes()
    }

    /// Decode one frame, with or without its trailing newline
    pub fn decode(frame: &[u8]) -> SharedResult<Self> {
        let frame = frame.strip_suffix(&[TERMINATOR]).unwrap_or(frame);
        let text = std::str::from_utf8(frame)
            .map_err(|e| SharedError::malformed(format!("invalid UTF-8: {e}")))?;

        let (command, payload) = match text.split_once(SEPARATOR) {
            Some((command, payload)) => (command.trim(), payload.trim()),
            None => (text.trim(), ""),
        };

        if command.is_empty() {
            return Err(SharedError::malformed(format!("empty command in {text:?}")));
        }
        if payload.contains('\n') {
            return Err(SharedError::malformed("frame spans more than one line"));
        }

        Ok(Self {
            command: command.to_string(),
            payload: payload.to_string(),
        })
    }

    /// Interpret the frame by its command name
    pub fn parse(&self) -> Command {
        Command::from(self)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.command, SEPARATOR, self.payload)
    }
}

/// Typed view of a [`Message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Pong,
    Join(ChannelIdentity),
    /// Acknowledgement a bot child sends once it starts joining
    Joined(ChannelIdentity),
    Leave,
    Left,
    /// Display names of everyone speaking, empty when nobody is
    Speaking(Vec<String>),
    InfoRequest,
    Info(ChannelIdentity),
    Error(String),
    /// Unrecognised command, or a known command with an unparseable payload
    Unknown(Message),
}

impl From<&Message> for Command {
    fn from(message: &Message) -> Self {
        let payload = message.payload();
        let identity = || payload.parse::<ChannelIdentity>().ok();

        let parsed = match message.command() {
            commands::PING => Some(Command::Ping),
            commands::PONG => Some(Command::Pong),
            commands::JOIN => identity().map(Command::Join),
            commands::JOINED => identity().map(Command::Joined),
            commands::LEAVE => Some(Command::Leave),
            commands::LEFT => Some(Command::Left),
            commands::SPEAKING => Some(Command::Speaking(parse_names(payload))),
            commands::INFO if payload.is_empty() => Some(Command::InfoRequest),
            commands::INFO => identity().map(Command::Info),
            commands::ERROR => Some(Command::Error(payload.to_string())),
            _ => None,
        };

        parsed.unwrap_or_else(|| Command::Unknown(message.clone()))
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        match command {
            Command::Ping => Message::ping(),
            Command::Pong => Message::pong(),
            Command::Join(identity) => Message::join(&identity),
            Command::Joined(identity) => Message::fixed(commands::JOINED, identity.to_string()),
            Command::Leave => Message::leave(),
            Command::Left => Message::left(),
            Command::Speaking(names) if names.is_empty() => {
                Message::fixed(commands::SPEAKING, NOBODY_SPEAKING)
            }
            Command::Speaking(names) => Message::fixed(commands::SPEAKING, names.join(",")),
            Command::InfoRequest => Message::info_request(),
            Command::Info(identity) => Message::fixed(commands::INFO, identity.to_string()),
            Command::Error(text) => Message::fixed(commands::ERROR, text),
            Command::Unknown(message) => message,
        }
    }
}

fn parse_names(payload: &str) -> Vec<String> {
    if payload.is_empty() || payload == NOBODY_SPEAKING {
        return Vec::new();
    }
    payload
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_splits_on_first_separator() {
        let message = Message::decode(b"error; bad thing; really bad \n").unwrap();

        assert_eq!(message.command(), "error");
        assert_eq!(message.payload(), "bad thing; really bad");
    }

    #[test]
    fn test_decode_without_separator_has_empty_payload() {
        let message = Message::decode(b"  pong  ").unwrap();

        assert_eq!(message.command(), "pong");
        assert_eq!(message.payload(), "");
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert!(Message::decode(b"").is_err());
        assert!(Message::decode(b";payload only\n").is_err());
        assert!(Message::decode(&[0xff, 0xfe, b';', b'x']).is_err());
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            ("ping", ""),
            ("join", "551446223496675329,551446224000253973"),
            ("speaking", "Alice,Bob,Carol"),
            ("error", "x;y;z"),
            ("custom", "anything goes"),
        ];

        for (command, payload) in cases {
            let message = Message::new(command, payload).unwrap();
            let decoded = Message::decode(&message.encode()).unwrap();
            assert_eq!(decoded, message);
            assert_eq!(decoded.command(), command);
            assert_eq!(decoded.payload(), payload);
        }
    }

    #[test]
    fn test_new_rejects_invalid_commands() {
        assert!(Message::new("", "x").is_err());
        assert!(Message::new("a;b", "x").is_err());
        assert!(Message::new("ping", "two\nlines").is_err());
    }

    #[test]
    fn test_encoded_frame_layout() {
        let identity = ChannelIdentity::new("1", "2");
        assert_eq!(Message::join(&identity).encode(), b"join;1,2\n".to_vec());
        assert_eq!(Message::ping().encode(), b"ping;\n".to_vec());
    }

    #[test]
    fn test_info_request_and_reply_are_distinct() {
        assert_eq!(Message::info_request().parse(), Command::InfoRequest);

        let reply = Message::new("info", "-1,-1").unwrap();
        assert_eq!(reply.parse(), Command::Info(ChannelIdentity::sentinel()));
    }

    #[test]
    fn test_speaking_payloads() {
        let nobody: Message = Command::Speaking(Vec::new()).into();
        assert_eq!(nobody.payload(), "_");
        assert_eq!(nobody.parse(), Command::Speaking(Vec::new()));

        let some = Message::new("speaking", "Alice, Bob").unwrap();
        assert_eq!(
            some.parse(),
            Command::Speaking(vec!["Alice".to_string(), "Bob".to_string()])
        );
    }

    #[test]
    fn test_line_breaks_never_split_a_frame() {
        let speaking: Message = Command::Speaking(vec!["a\nb".to_string(), "c\r\nd".to_string()]).into();
        let encoded = speaking.encode();
        assert_eq!(encoded.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(speaking.payload(), "a b,c  d");

        let joined: Message = Command::Joined(ChannelIdentity::new("g\n1", "c1")).into();
        assert!(!joined.payload().contains('\n'));

        let error: Message = Command::Error("first\nsecond".to_string()).into();
        assert_eq!(error.payload(), "first second");
    }

    #[test]
    fn test_unknown_and_unparseable_commands() {
        let unknown = Message::new("dance", "now").unwrap();
        assert_eq!(unknown.parse(), Command::Unknown(unknown.clone()));

        let bad_join = Message::new("join", "nope").unwrap();
        assert!(matches!(bad_join.parse(), Command::Unknown(_)));
    }
}
