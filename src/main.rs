use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use duplex_core::note::BackendId;
use duplex_server::NotesOrchestrator;
use duplex_store::{BackendManager, SqliteBackend};

/// Redundant notes service with live event distribution.
#[derive(Parser, Debug)]
#[command(name = "duplexd", version)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Directory for database files when explicit paths are not given.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path to the primary store's database file.
    #[arg(long)]
    primary_db: Option<PathBuf>,

    /// Path to the analytics store's database file.
    #[arg(long)]
    analytics_db: Option<PathBuf>,

    /// Disable the scheduled event producer.
    #[arg(long)]
    no_producer: bool,

    /// Seconds of observer silence before eviction.
    #[arg(long, default_value_t = 30 * 60)]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!("Starting duplexd");

    let data_dir = args
        .data_dir
        .unwrap_or_else(|| dirs_home().join(".duplex"));
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory");

    let primary_path = args
        .primary_db
        .unwrap_or_else(|| data_dir.join("primary.db"));
    let analytics_path = args
        .analytics_db
        .unwrap_or_else(|| data_dir.join("analytics.db"));

    let primary = BackendManager::new(BackendId::Primary, &primary_path);
    let analytics = BackendManager::new(BackendId::Analytics, &analytics_path);

    // First probe reports initial reachability; failures are non-fatal,
    // the managers reconnect on demand.
    let p = primary.probe().await;
    let a = analytics.probe().await;
    tracing::info!(
        primary = %p.status,
        analytics = %a.status,
        "Initial backend probe"
    );

    let orchestrator = Arc::new(NotesOrchestrator::new(
        Arc::new(SqliteBackend::new(Arc::clone(&primary))),
        Arc::new(SqliteBackend::new(Arc::clone(&analytics))),
    ));

    let config = duplex_server::ServerConfig {
        port: args.port,
        idle_timeout_secs: args.idle_timeout_secs,
        ..Default::default()
    };
    let handle = duplex_server::start(config, Arc::clone(&orchestrator))
        .await
        .expect("Failed to start server");
    tracing::info!(port = handle.port, "duplexd ready");

    let producer = if args.no_producer {
        None
    } else {
        Some(duplex_producer::start(
            duplex_producer::ProducerConfig::default(),
            Arc::clone(&orchestrator),
            Arc::clone(&handle.hub),
        ))
    };

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
    if let Some(producer) = producer {
        producer.shutdown().await;
    }
    orchestrator.close_all().await;
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
