use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};

use duplex_core::events::{Channel, HubEvent};
use duplex_core::ids::ObserverId;

use crate::protocol::{ClientMessage, ServerMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Observers that send nothing for this long get evicted by the sweep.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("invalid channel: {0}")]
    InvalidChannel(String),
    #[error("unknown observer: {0}")]
    UnknownObserver(ObserverId),
}

/// A connected observer and its subscriptions.
pub struct Observer {
    pub id: ObserverId,
    pub tx: mpsc::Sender<String>,
    pub channels: HashSet<Channel>,
    pub event_filter: Option<HashSet<String>>,
    pub connected: AtomicBool,
    pub last_activity: AtomicU64,
}

impl Observer {
    fn new(id: ObserverId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            channels: HashSet::new(),
            event_filter: None,
            connected: AtomicBool::new(true),
            last_activity: AtomicU64::new(now_secs()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn touch(&self) {
        self.last_activity.store(now_secs(), Ordering::Relaxed);
    }

    fn idle_for(&self) -> u64 {
        now_secs().saturating_sub(self.last_activity.load(Ordering::Relaxed))
    }

    /// Whether a published event should reach this observer.
    fn wants(&self, event: &HubEvent) -> bool {
        if !self.channels.contains(&event.channel) {
            return false;
        }
        match &self.event_filter {
            Some(filter) => filter.contains(&event.name),
            None => true,
        }
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Fan-out hub for live events. Holds every connected observer, routes
/// published events to channel members, and retains the last event per
/// channel so late joiners get an immediate snapshot.
pub struct Hub {
    observers: DashMap<ObserverId, Arc<Mutex<Observer>>>,
    last_event: DashMap<Channel, HubEvent>,
    max_send_queue: usize,
    idle_timeout: Duration,
}

impl Hub {
    pub fn new(max_send_queue: usize, idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            observers: DashMap::new(),
            last_event: DashMap::new(),
            max_send_queue,
            idle_timeout,
        })
    }

    /// Register a new observer. Queues the welcome message and announces
    /// the connection on the monitoring channel.
    pub async fn register(&self) -> (ObserverId, mpsc::Receiver<String>) {
        let id = ObserverId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let observer = Arc::new(Mutex::new(Observer::new(id.clone(), tx)));
        self.observers.insert(id.clone(), observer);
        tracing::info!(observer_id = %id, observers = self.observers.len(), "Observer connected");

        self.send_to(&id, ServerMessage::welcome()).await;
        self.publish(HubEvent::new(
            Channel::Monitoring,
            "observer_connected",
            serde_json::json!({ "observerId": id.to_string(), "observers": self.count() }),
        ))
        .await;
        (id, rx)
    }

    /// Remove an observer and announce the departure on monitoring.
    pub async fn unregister(&self, id: &ObserverId) {
        if let Some((_, observer)) = self.observers.remove(id) {
            observer.lock().await.connected.store(false, Ordering::Relaxed);
            tracing::info!(observer_id = %id, observers = self.observers.len(), "Observer disconnected");
            self.publish(HubEvent::new(
                Channel::Monitoring,
                "observer_disconnected",
                serde_json::json!({ "observerId": id.to_string(), "observers": self.count() }),
            ))
            .await;
        }
    }

    /// Join a channel. Invalid names get an error message on their own
    /// socket; valid joins are acked and immediately replayed the last
    /// event seen on that channel.
    pub async fn join(&self, id: &ObserverId, channel_name: &str) -> Result<Channel, HubError> {
        let channel: Channel = match channel_name.parse() {
            Ok(c) => c,
            Err(msg) => {
                self.send_to(id, ServerMessage::invalid_channel(&msg)).await;
                return Err(HubError::InvalidChannel(channel_name.to_string()));
            }
        };

        let observer = self
            .observers
            .get(id)
            .ok_or_else(|| HubError::UnknownObserver(id.clone()))?
            .clone();
        {
            let mut obs = observer.lock().await;
            obs.channels.insert(channel);
            obs.touch();
        }
        tracing::debug!(observer_id = %id, channel = %channel, "Joined channel");

        self.send_to(id, ServerMessage::RoomJoined { channel }).await;

        // Snapshot replay: the channel's most recent event, or a marker
        // when nothing has been published yet.
        let snapshot = self
            .last_event
            .get(&channel)
            .map(|e| e.clone())
            .unwrap_or_else(|| HubEvent::new(channel, "snapshot", serde_json::Value::Null));
        self.send_to(id, ServerMessage::Event { event: snapshot }).await;

        Ok(channel)
    }

    /// Leave a channel. Leaving a channel the observer never joined is
    /// still acked.
    pub async fn leave(&self, id: &ObserverId, channel_name: &str) -> Result<Channel, HubError> {
        let channel: Channel = match channel_name.parse() {
            Ok(c) => c,
            Err(msg) => {
                self.send_to(id, ServerMessage::invalid_channel(&msg)).await;
                return Err(HubError::InvalidChannel(channel_name.to_string()));
            }
        };

        if let Some(observer) = self.observers.get(id).map(|o| o.clone()) {
            let mut obs = observer.lock().await;
            obs.channels.remove(&channel);
            obs.touch();
        }
        self.send_to(id, ServerMessage::RoomLeft { channel }).await;
        Ok(channel)
    }

    /// Replace the observer's event-name filter. An empty list clears it.
    pub async fn set_filter(&self, id: &ObserverId, events: Vec<String>) {
        if let Some(observer) = self.observers.get(id).map(|o| o.clone()) {
            let mut obs = observer.lock().await;
            obs.event_filter = if events.is_empty() {
                None
            } else {
                Some(events.into_iter().collect())
            };
            obs.touch();
        }
    }

    pub async fn record_activity(&self, id: &ObserverId) {
        if let Some(observer) = self.observers.get(id).map(|o| o.clone()) {
            observer.lock().await.touch();
        }
    }

    /// Publish an event to every member of its channel. The recipient set
    /// is snapshotted first so a slow or failing observer never blocks the
    /// rest. Returns how many observers the event was queued for.
    pub async fn publish(&self, event: HubEvent) -> usize {
        self.last_event.insert(event.channel, event.clone());

        let mut targets = Vec::new();
        let entries: Vec<Arc<Mutex<Observer>>> =
            self.observers.iter().map(|e| e.value().clone()).collect();
        for observer in entries {
            let obs = observer.lock().await;
            if obs.is_connected() && obs.wants(&event) {
                targets.push((obs.id.clone(), obs.tx.clone()));
            }
        }

        let Some(json) = (ServerMessage::Event { event: event.clone() }).to_json() else {
            return 0;
        };

        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(json.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(observer_id = %id, event = %event.name, "Send queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(observer_id = %id, "Observer channel closed");
                }
            }
        }
        tracing::trace!(channel = %event.channel, event = %event.name, delivered, "Published event");
        delivered
    }

    /// Evict observers that have been silent past the idle timeout.
    /// Each eviction is announced on the monitoring channel.
    pub async fn sweep_idle(&self) -> usize {
        let timeout = self.idle_timeout.as_secs();
        let idle: Vec<ObserverId> = self
            .observers
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .try_lock()
                    .ok()
                    .filter(|obs| obs.idle_for() > timeout)
                    .map(|obs| obs.id.clone())
            })
            .collect();

        let evicted = idle.len();
        for id in idle {
            if let Some((_, observer)) = self.observers.remove(&id) {
                observer.lock().await.connected.store(false, Ordering::Relaxed);
            }
            tracing::info!(observer_id = %id, "Evicted idle observer");
            self.publish(HubEvent::new(
                Channel::Monitoring,
                "observer_evicted",
                serde_json::json!({ "observerId": id.to_string(), "observers": self.count() }),
            ))
            .await;
        }
        evicted
    }

    pub fn count(&self) -> usize {
        self.observers.len()
    }

    async fn send_to(&self, id: &ObserverId, message: ServerMessage) {
        let Some(json) = message.to_json() else { return };
        if let Some(observer) = self.observers.get(id).map(|o| o.clone()) {
            let tx = observer.lock().await.tx.clone();
            if let Err(e) = tx.try_send(json) {
                tracing::warn!(observer_id = %id, error = %e, "Failed to queue message");
            }
        }
    }
}

/// Handle one observer's WebSocket: writer forwards queued messages and
/// pings on a heartbeat, reader dispatches inbound messages to the hub.
pub async fn handle_ws_connection(
    socket: WebSocket,
    observer_id: ObserverId,
    mut rx: mpsc::Receiver<String>,
    hub: Arc<Hub>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        // Every sender is gone (eviction or shutdown) —
                        // tell the peer before the sink drops.
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = ws_tx.send(WsMessage::Close(None)).await;
    });

    let reader_id = observer_id.clone();
    let reader_hub = Arc::clone(&hub);
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    dispatch(&reader_hub, &reader_id, &text).await;
                }
                WsMessage::Pong(_) => {
                    reader_hub.record_activity(&reader_id).await;
                }
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) => {} // axum replies automatically
                _ => {}
            }
        }
    });

    // Whichever half finishes first, the survivor still holds its half of
    // the socket; abort it so an evicted observer's connection is torn
    // down instead of lingering half-open.
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    hub.unregister(&observer_id).await;
}

async fn dispatch(hub: &Arc<Hub>, id: &ObserverId, text: &str) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(observer_id = %id, error = %e, "Unparseable message");
            return;
        }
    };

    match msg {
        ClientMessage::Join { channel } => {
            let _ = hub.join(id, &channel).await;
        }
        ClientMessage::Leave { channel } => {
            let _ = hub.leave(id, &channel).await;
        }
        ClientMessage::Ping => {
            hub.record_activity(id).await;
            hub.send_to(id, ServerMessage::Pong).await;
        }
        ClientMessage::SetFilter { events } => {
            hub.set_filter(id, events).await;
        }
    }
}

/// Periodic idle-observer sweep.
pub fn start_sweep_task(hub: Arc<Hub>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let evicted = hub.sweep_idle().await;
            if evicted > 0 {
                tracing::info!(evicted, "Idle observer sweep");
            }
        }
    })
}
