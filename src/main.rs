use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use sportspot_server::config::Config;
use sportspot_server::ledger::{LedgerSeed, MemoryLedger, SharedLedger};
use sportspot_server::routes::create_routes;
use sportspot_server::state::{spawn_calendar_sweeper, AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let ledger = match &config.ledger_seed {
        Some(path) => {
            let seed = LedgerSeed::from_file(path).expect("Failed to load ledger seed");
            MemoryLedger::from_seed(seed)
        }
        None => MemoryLedger::new(),
    };
    let ledger: SharedLedger = Arc::new(ledger);

    tracing::info!(timezone = %config.timezone, "Venue hours interpreted in local time zone");

    let state = Arc::new(AppState::new(ledger, config.timezone, config.calendar_idle));
    spawn_calendar_sweeper(state.clone());
    tracing::info!(
        idle_secs = config.calendar_idle.as_secs(),
        "Idle booking calendars will be evicted"
    );

    let app = create_routes(state, &config);

    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
