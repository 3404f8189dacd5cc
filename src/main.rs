use std::{process, sync::Arc};

use clap::Parser;
use thiserror::Error;
use tracing::{dispatcher, error, info};

use colloquy::{
    application::syndication::SyndicationService,
    cache::FeedCache,
    config::{self, CliArgs},
    infra::{
        http::{HttpState, build_router},
        memory::{MemoryComments, SeedError},
        telemetry::{self, TelemetryError},
    },
};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Settings(#[from] config::SettingsError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_startup_error(&error);
        process::exit(1);
    }
}

fn report_startup_error(error: &StartupError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "startup failed");
    } else {
        eprintln!("startup failed: {error}");
    }
}

async fn run() -> Result<(), StartupError> {
    let cli = CliArgs::parse();
    let settings = config::load(&cli)?;
    telemetry::init(&settings.logging)?;

    let comments = match &settings.store.seed_file {
        Some(path) => {
            let comments = MemoryComments::from_file(path).await?;
            info!(seed_file = %path.display(), comments = comments.len(), "seeded comment store");
            comments
        }
        None => MemoryComments::default(),
    };

    let mut syndication = SyndicationService::new(Arc::new(comments), settings.feed.options());
    if settings.cache.enabled {
        let cache = FeedCache::new(settings.cache.capacity_non_zero());
        syndication = syndication.with_cache(Arc::new(cache));
    }

    let router = build_router(HttpState {
        syndication: Arc::new(syndication),
    });

    let addr = settings.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, cache = settings.cache.enabled, "serving comment feeds");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
