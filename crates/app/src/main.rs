//! Questionnaire HTTP server.

mod config;
mod error;
mod logging;
mod routes;
mod state;

use clap::Parser;
use services::{AppServices, Clock};
use tracing::{error, info};

use crate::config::{Args, Settings};
use crate::state::AppState;

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = Settings::resolve(args, std::env::var("DATABASE_URL").ok())?;

    // Catalog and database are both opened before binding so a bad config never serves.
    settings.db.prepare()?;
    let services =
        AppServices::bootstrap(settings.db.url(), &settings.questions, Clock::system()).await?;

    let app = routes::router(AppState::new(services.controller()));

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    info!(addr = %settings.addr, db = settings.db.url(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(err) = run().await {
        error!(error = %err, "startup failed");
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
