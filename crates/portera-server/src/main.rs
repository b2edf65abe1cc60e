use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portera_server::config::AppConfig;
use portera_server::db;
use portera_server::mailer::{BrevoMailer, DisabledNotifier, Notifier};
use portera_server::routes;
use portera_server::state::AppState;

/// Wait for Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let db = db::connect(&config.database_url).await?;
    Migrator::up(&db, None).await?;

    let notifier: Arc<dyn Notifier> = match config.mailer.as_ref() {
        Some(mailer_config) => Arc::new(BrevoMailer::new(mailer_config)?),
        None => {
            warn!("mailer is not configured; verification emails will not be sent");
            Arc::new(DisabledNotifier)
        }
    };

    let state = AppState::new(db, notifier, &config);
    let shutdown_tx = state.shutdown.clone();

    let app = routes::router(state);
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "portera listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Stop in-flight registration monitors with the server.
            let _ = shutdown_tx.send(());
        })
        .await?;

    Ok(())
}
