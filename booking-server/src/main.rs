use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_server::server::{ConfigError, ConnectionWorkerPool, RequestRouter, ServerConfig};
use booking_server::store::{MemoryStore, Seed, SeedError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;

    let seed = Seed::load(&config.seed_path)?;
    let store = Arc::new(MemoryStore::from_seed(seed)?);
    info!(
        seed = %config.seed_path.display(),
        tickets = store.ticket_count().unwrap_or_default(),
        "loaded network"
    );

    let router = Arc::new(RequestRouter::new(store, config.lock_timeout));
    let pool = ConnectionWorkerPool::new(router, &config);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.listen_addr,
            source,
        })?;
    info!(
        addr = %config.listen_addr,
        workers = config.workers,
        io_timeout = ?config.io_timeout,
        lock_timeout = ?config.lock_timeout,
        "booking server listening"
    );

    pool.serve(listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "could not listen for ctrl-c; shutting down");
        }
        info!("shutdown requested");
    })
    .await;

    Ok(())
}
