use serde::{Deserialize, Serialize};

use crate::ids::NoteId;

/// One of the two independently managed data stores.
///
/// Ord is derived so merged read output has a deterministic tie-break when
/// two notes share a creation timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    Primary,
    Analytics,
}

impl BackendId {
    pub const ALL: [BackendId; 2] = [BackendId::Primary, BackendId::Analytics];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Analytics => "analytics",
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "analytics" => Ok(Self::Analytics),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Which backends a write should address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteTarget {
    Primary,
    Analytics,
    Both,
}

impl WriteTarget {
    /// The concrete backends this target expands to, in fixed order.
    pub fn targets(&self) -> Vec<BackendId> {
        match self {
            Self::Primary => vec![BackendId::Primary],
            Self::Analytics => vec![BackendId::Analytics],
            Self::Both => vec![BackendId::Primary, BackendId::Analytics],
        }
    }
}

impl From<BackendId> for WriteTarget {
    fn from(b: BackendId) -> Self {
        match b {
            BackendId::Primary => Self::Primary,
            BackendId::Analytics => Self::Analytics,
        }
    }
}

impl std::str::FromStr for WriteTarget {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "analytics" => Ok(Self::Analytics),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown write target: {other}")),
        }
    }
}

/// A stored note. Identifiers are unique within a backend only — the same
/// logical note written to both stores carries two unrelated ids, so a note
/// is always addressed as (backend, id).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub backend: BackendId,
    pub created_at: String,
    pub updated_at: String,
}

/// Caller-supplied fields for a new or updated note.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Title must be non-empty; content may be empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_id_roundtrip() {
        for b in BackendId::ALL {
            let parsed: BackendId = b.as_str().parse().unwrap();
            assert_eq!(parsed, b);
        }
        assert!("mysql".parse::<BackendId>().is_err());
    }

    #[test]
    fn backend_id_ordering_is_stable() {
        assert!(BackendId::Primary < BackendId::Analytics);
    }

    #[test]
    fn write_target_expands() {
        assert_eq!(WriteTarget::Primary.targets(), vec![BackendId::Primary]);
        assert_eq!(WriteTarget::Analytics.targets(), vec![BackendId::Analytics]);
        assert_eq!(
            WriteTarget::Both.targets(),
            vec![BackendId::Primary, BackendId::Analytics]
        );
    }

    #[test]
    fn write_target_parses() {
        assert_eq!("both".parse::<WriteTarget>().unwrap(), WriteTarget::Both);
        assert!("neither".parse::<WriteTarget>().is_err());
    }

    #[test]
    fn draft_requires_title() {
        assert!(NoteDraft::new("", "body").validate().is_err());
        assert!(NoteDraft::new("   ", "").validate().is_err());
        assert!(NoteDraft::new("A", "").validate().is_ok());
    }

    #[test]
    fn write_target_serde_is_snake_case() {
        let json = serde_json::to_string(&WriteTarget::Both).unwrap();
        assert_eq!(json, "\"both\"");
        let parsed: WriteTarget = serde_json::from_str("\"primary\"").unwrap();
        assert_eq!(parsed, WriteTarget::Primary);
    }
}
