use serde::{Deserialize, Serialize};

use duplex_core::events::{Channel, HubEvent};

/// Messages an observer may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join { channel: String },
    Leave { channel: String },
    Ping,
    SetFilter { events: Vec<String> },
}

/// Messages the hub sends to observers.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Sent once on handshake completion; lists the joinable channels.
    Welcome { channels: Vec<&'static str> },
    RoomJoined { channel: Channel },
    RoomLeft { channel: Channel },
    Pong,
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        valid_channels: Vec<&'static str>,
    },
    Event {
        #[serde(flatten)]
        event: HubEvent,
    },
}

impl ServerMessage {
    pub fn welcome() -> Self {
        Self::Welcome {
            channels: Channel::names(),
        }
    }

    pub fn invalid_channel(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            valid_channels: Channel::names(),
        }
    }

    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join","channel":"dashboard"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Join { channel } if channel == "dashboard"));
    }

    #[test]
    fn parses_ping_and_set_filter() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));

        let filter: ClientMessage =
            serde_json::from_str(r#"{"type":"set-filter","events":["metrics"]}"#).unwrap();
        assert!(matches!(filter, ClientMessage::SetFilter { events } if events == ["metrics"]));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn welcome_lists_all_channels() {
        let json = serde_json::to_value(ServerMessage::welcome()).unwrap();
        assert_eq!(json["type"], "welcome");
        assert_eq!(
            json["channels"],
            serde_json::json!(["dashboard", "analytics", "monitoring"])
        );
    }

    #[test]
    fn room_acks_carry_channel() {
        let json = serde_json::to_value(ServerMessage::RoomJoined {
            channel: Channel::Analytics,
        })
        .unwrap();
        assert_eq!(json["type"], "room-joined");
        assert_eq!(json["channel"], "analytics");

        let json = serde_json::to_value(ServerMessage::RoomLeft {
            channel: Channel::Analytics,
        })
        .unwrap();
        assert_eq!(json["type"], "room-left");
    }

    #[test]
    fn error_lists_valid_set() {
        let json = serde_json::to_value(ServerMessage::invalid_channel("unknown channel: foo"))
            .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["validChannels"][2], "monitoring");
    }

    #[test]
    fn event_message_flattens_the_event() {
        let event = HubEvent::new(
            Channel::Dashboard,
            "revenue_snapshot",
            serde_json::json!({"revenue": 1250.0}),
        );
        let json = serde_json::to_value(ServerMessage::Event { event }).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["channel"], "dashboard");
        assert_eq!(json["eventName"], "revenue_snapshot");
        assert_eq!(json["payload"]["revenue"], 1250.0);
        assert!(json["timestamp"].is_string());
    }
}
