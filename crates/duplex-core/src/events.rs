use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Named interest groups observers can join. The set is closed — join
/// requests for any other name are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Dashboard,
    Analytics,
    Monitoring,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Dashboard, Channel::Analytics, Channel::Monitoring];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Analytics => "analytics",
            Self::Monitoring => "monitoring",
        }
    }

    /// All valid channel names, for welcome and error payloads.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.as_str()).collect()
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(Self::Dashboard),
            "analytics" => Ok(Self::Analytics),
            "monitoring" => Ok(Self::Monitoring),
            other => Err(format!(
                "unknown channel: {other} (valid: {})",
                Self::names().join(", ")
            )),
        }
    }
}

/// An event in flight through the hub. Immutable once published; never
/// queued to disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HubEvent {
    pub channel: Channel,
    #[serde(rename = "eventName")]
    pub name: String,
    pub payload: serde_json::Value,
    pub timestamp: String,
}

impl HubEvent {
    pub fn new(channel: Channel, name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            channel,
            name: name.into(),
            payload,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_roundtrip() {
        for c in Channel::ALL {
            let parsed: Channel = c.as_str().parse().unwrap();
            assert_eq!(parsed, c);
        }
    }

    #[test]
    fn unknown_channel_error_lists_valid_set() {
        let err = "metrics".parse::<Channel>().unwrap_err();
        assert!(err.contains("dashboard"));
        assert!(err.contains("analytics"));
        assert!(err.contains("monitoring"));
    }

    #[test]
    fn event_wire_shape() {
        let e = HubEvent::new(
            Channel::Monitoring,
            "observer_connected",
            serde_json::json!({"count": 1}),
        );
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["channel"], "monitoring");
        assert_eq!(json["eventName"], "observer_connected");
        assert_eq!(json["payload"]["count"], 1);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn event_timestamp_is_rfc3339() {
        let e = HubEvent::new(Channel::Dashboard, "tick", serde_json::Value::Null);
        assert!(chrono::DateTime::parse_from_rfc3339(&e.timestamp).is_ok());
    }
}
