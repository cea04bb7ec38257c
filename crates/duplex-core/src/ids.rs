use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! branded_id {
    ($name:ident, $prefix:expr) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }

            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id!(NoteId, "note");
branded_id!(ObserverId, "obs");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_id_has_prefix() {
        let id = NoteId::new();
        assert!(id.as_str().starts_with("note_"), "got: {id}");
    }

    #[test]
    fn observer_id_has_prefix() {
        let id = ObserverId::new();
        assert!(id.as_str().starts_with("obs_"), "got: {id}");
    }

    #[test]
    fn ids_are_unique() {
        let a = NoteId::new();
        let b = NoteId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_and_from_str_roundtrip() {
        let id = ObserverId::new();
        let s = id.to_string();
        let parsed: ObserverId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_roundtrip() {
        let id = NoteId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: NoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_raw_preserves_value() {
        let id = NoteId::from_raw("42");
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn monotonic_ordering() {
        let ids: Vec<NoteId> = (0..100).map(|_| NoteId::new()).collect();
        for w in ids.windows(2) {
            assert!(w[0].as_str() < w[1].as_str(), "not monotonic: {} >= {}", w[0], w[1]);
        }
    }
}
