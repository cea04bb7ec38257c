use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use duplex_core::events::{Channel, HubEvent};

use crate::handlers;
use crate::hub::{self, Hub};
use crate::orchestrator::NotesOrchestrator;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    pub max_send_queue: usize,
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub probe_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_send_queue: 256,
            idle_timeout_secs: 30 * 60,
            sweep_interval_secs: 60,
            probe_interval_secs: 30,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<NotesOrchestrator>,
    pub hub: Arc<Hub>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(handlers::health))
        .route(
            "/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route(
            "/notes/{backend}/{id}",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle that keeps the background
/// tasks alive.
pub async fn start(
    config: ServerConfig,
    orchestrator: Arc<NotesOrchestrator>,
) -> Result<ServerHandle, std::io::Error> {
    let hub = Hub::new(
        config.max_send_queue,
        Duration::from_secs(config.idle_timeout_secs),
    );

    // Seed the health snapshots so /health never serves pre-probe Unknowns.
    orchestrator.probe_all().await;

    let _sweep = hub::start_sweep_task(
        Arc::clone(&hub),
        Duration::from_secs(config.sweep_interval_secs),
    );
    let _probe = start_probe_task(
        Arc::clone(&orchestrator),
        Arc::clone(&hub),
        Duration::from_secs(config.probe_interval_secs),
    );

    let state = AppState {
        orchestrator,
        hub: Arc::clone(&hub),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "Duplex server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        hub,
        _server: server_handle,
        _sweep,
        _probe,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    pub hub: Arc<Hub>,
    _server: tokio::task::JoinHandle<()>,
    _sweep: tokio::task::JoinHandle<()>,
    _probe: tokio::task::JoinHandle<()>,
}

/// Periodically probe both backends and publish the snapshots on the
/// monitoring channel.
fn start_probe_task(
    orchestrator: Arc<NotesOrchestrator>,
    hub: Arc<Hub>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // `start` seeded the snapshots; first refresh is one interval out.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshots = orchestrator.probe_all().await;
            hub.publish(HubEvent::new(
                Channel::Monitoring,
                "backend_health",
                serde_json::json!({ "backends": snapshots }),
            ))
            .await;
        }
    })
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (observer_id, rx) = state.hub.register().await;
    hub::handle_ws_connection(socket, observer_id, rx, state.hub).await;
}
