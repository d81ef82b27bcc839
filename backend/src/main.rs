//! Consignment Ledger - Backend Server

use consignment_ledger::{config::Config, create_app, store, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "ledger_server=debug,consignment_ledger=debug,tower_http=debug,sqlx=warn".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Consignment Ledger Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!(
        "Reconciliation pricing basis: {:?}",
        config.reconciliation.pricing_basis
    );

    // Open the ledger store
    let store = store::connect(&config).await?;

    // Create application state
    let addr = config.bind_addr();
    let state = AppState::new(store, config);

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
