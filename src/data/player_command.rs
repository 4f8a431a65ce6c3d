/// Transport commands that the queue tools send to a playback device
use serde::{Serialize, Deserialize};
use strum_macros::EnumString;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportCommand {
    /// Skip to the next track in the queue
    Next,

    /// Return to the previous track
    Previous,

    /// Pause playback
    Pause,
}

impl TransportCommand {
    /// HTTP method the Spotify Web API expects for this command
    pub fn http_method(&self) -> &'static str {
        match self {
            TransportCommand::Next | TransportCommand::Previous => "POST",
            TransportCommand::Pause => "PUT",
        }
    }
}

impl std::fmt::Display for TransportCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportCommand::Next => write!(f, "next"),
            TransportCommand::Previous => write!(f, "previous"),
            TransportCommand::Pause => write!(f, "pause"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_and_display() {
        for cmd in [TransportCommand::Next, TransportCommand::Previous, TransportCommand::Pause] {
            assert_eq!(TransportCommand::from_str(&cmd.to_string()).unwrap(), cmd);
        }
        assert!(TransportCommand::from_str("rewind").is_err());
    }

    #[test]
    fn test_http_method() {
        assert_eq!(TransportCommand::Next.http_method(), "POST");
        assert_eq!(TransportCommand::Pause.http_method(), "PUT");
    }
}
