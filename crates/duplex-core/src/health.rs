use serde::{Deserialize, Serialize};

use crate::note::BackendId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Disconnected,
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Disconnected => "disconnected",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Point-in-time health of one backend. Recomputed on every probe, owned by
/// that backend's connection manager, exposed only as a snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendHealth {
    pub backend: BackendId,
    pub status: HealthStatus,
    pub latency_ms: Option<u64>,
    pub last_error: Option<String>,
    pub checked_at: Option<String>,
}

impl BackendHealth {
    /// State before the first probe has run.
    pub fn unknown(backend: BackendId) -> Self {
        Self {
            backend,
            status: HealthStatus::Unknown,
            latency_ms: None,
            last_error: None,
            checked_at: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Whether this backend should be included in a merged read.
    pub fn is_readable(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy | HealthStatus::Unknown)
    }
}
