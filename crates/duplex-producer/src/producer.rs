use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use duplex_core::events::{Channel, HubEvent};
use duplex_core::note::{NoteDraft, WriteTarget};
use duplex_server::{Hub, NotesOrchestrator};

use crate::generator;

/// Tick intervals for the three timers.
pub struct ProducerConfig {
    pub fast_secs: u64,
    pub medium_secs: u64,
    pub slow_secs: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            fast_secs: 10,
            medium_secs: 30,
            slow_secs: 60,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum TickKind {
    Fast,
    Medium,
    Slow,
}

impl TickKind {
    fn event_name(&self) -> &'static str {
        match self {
            Self::Fast => "performance_metrics",
            Self::Medium => "analytics_events",
            Self::Slow => "business_snapshot",
        }
    }

    fn channel(&self) -> Channel {
        match self {
            Self::Fast => Channel::Monitoring,
            Self::Medium => Channel::Analytics,
            Self::Slow => Channel::Dashboard,
        }
    }

    fn generate(&self) -> serde_json::Value {
        let mut rng = rand::thread_rng();
        match self {
            Self::Fast => generator::metrics_batch(&mut rng),
            Self::Medium => generator::analytics_batch(&mut rng),
            Self::Slow => generator::business_batch(&mut rng),
        }
    }
}

/// One tick: persist the batch through the analytics write path, then
/// publish it live. A persistence failure is logged and ignored so the
/// publish still happens and the schedule never stalls.
pub(crate) async fn run_tick(kind: TickKind, orchestrator: &NotesOrchestrator, hub: &Hub) {
    let batch = kind.generate();

    let draft = NoteDraft::new(
        format!("{} {}", kind.event_name(), Utc::now().to_rfc3339()),
        batch.to_string(),
    );
    if let Err(e) = orchestrator
        .write_to_all(&draft, WriteTarget::Analytics)
        .await
    {
        warn!(kind = ?kind, error = %e, "Batch persistence failed, publishing anyway");
    }

    let delivered = hub
        .publish(HubEvent::new(kind.channel(), kind.event_name(), batch))
        .await;
    debug!(kind = ?kind, delivered, "Producer tick");
}

/// Start the three timers. Each fires immediately, then on its interval,
/// until the handle is shut down.
pub fn start(
    config: ProducerConfig,
    orchestrator: Arc<NotesOrchestrator>,
    hub: Arc<Hub>,
) -> ProducerHandle {
    let cancel = CancellationToken::new();
    let schedule = [
        (TickKind::Fast, config.fast_secs),
        (TickKind::Medium, config.medium_secs),
        (TickKind::Slow, config.slow_secs),
    ];

    let tasks = schedule
        .into_iter()
        .map(|(kind, secs)| {
            let orchestrator = Arc::clone(&orchestrator);
            let hub = Arc::clone(&hub);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(secs));
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => run_tick(kind, &orchestrator, &hub).await,
                    }
                }
            })
        })
        .collect();

    tracing::info!(
        fast = config.fast_secs,
        medium = config.medium_secs,
        slow = config.slow_secs,
        "Event producer started"
    );
    ProducerHandle { cancel, tasks }
}

pub struct ProducerHandle {
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl ProducerHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            task.await.ok();
        }
    }
}
