//! Connection worker pool.
//!
//! Accepts TCP connections and serves each one (read a request line,
//! dispatch it, write a response line) on its own task. At most `workers`
//! connections are served at once: when every permit is taken the accept
//! loop stops accepting until one is returned, leaving further clients in
//! the kernel's listen backlog.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::store::Store;

use super::config::ServerConfig;
use super::protocol::Response;
use super::request::RouterError;
use super::router::RequestRouter;

/// Back-off after a failed `accept`, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Errors on a single connection. The peer is gone or misbehaving, so these
/// are logged and never answered.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Serves connections with a bounded number of concurrent workers.
pub struct ConnectionWorkerPool<S> {
    router: Arc<RequestRouter<S>>,
    permits: Arc<Semaphore>,
    io_timeout: Duration,
    max_request_bytes: usize,
}

impl<S: Store + 'static> ConnectionWorkerPool<S> {
    /// Create a pool dispatching to `router`.
    pub fn new(router: Arc<RequestRouter<S>>, config: &ServerConfig) -> Self {
        Self {
            router,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            io_timeout: config.io_timeout,
            max_request_bytes: config.max_request_bytes,
        }
    }

    /// Accept and serve connections until `shutdown` completes.
    ///
    /// Connections already accepted are served to completion before this
    /// returns.
    pub async fn serve(&self, listener: TcpListener, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut tasks = JoinSet::new();

        loop {
            // Wait for a free worker before accepting.
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }

            let router = Arc::clone(&self.router);
            let io_timeout = self.io_timeout;
            let max_request_bytes = self.max_request_bytes;
            tasks.spawn(async move {
                let _permit = permit;
                debug!(%peer, "connection accepted");
                if let Err(e) =
                    serve_connection(&*router, stream, io_timeout, max_request_bytes).await
                {
                    warn!(%peer, error = %e, "transport fault");
                }
            });
        }

        info!(in_flight = tasks.len(), "stopped accepting; draining connections");
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
        info!("all connections drained");
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "connection task failed");
    }
}

/// Read one request line from `stream`, answer it, and close.
async fn serve_connection<S: Store>(
    router: &RequestRouter<S>,
    mut stream: TcpStream,
    io_timeout: Duration,
    max_request_bytes: usize,
) -> Result<(), TransportError> {
    let peer: Option<SocketAddr> = stream.peer_addr().ok();
    let (reader, mut writer) = stream.split();

    // One byte over the limit is enough to tell an oversized line apart.
    let limit = u64::try_from(max_request_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut reader = BufReader::new(reader).take(limit);
    let mut line = Vec::new();
    let read = tokio::time::timeout(io_timeout, reader.read_until(b'\n', &mut line))
        .await
        .map_err(|_| TransportError::ReadTimeout(io_timeout))??;

    if read == 0 {
        debug!(?peer, "peer closed without a request");
        return Ok(());
    }

    let complete = line.last() == Some(&b'\n');
    if complete {
        line.pop();
    }

    let response = if !complete && line.len() > max_request_bytes {
        let err = RouterError::TooLarge {
            limit: max_request_bytes,
        };
        warn!(?peer, limit = max_request_bytes, "request too large");
        Response::error(err.kind(), err.to_string())
    } else {
        router.handle_bytes(&line).await
    };

    let mut payload = serde_json::to_vec(&response)?;
    payload.push(b'\n');

    tokio::time::timeout(io_timeout, async {
        writer.write_all(&payload).await?;
        writer.flush().await?;
        writer.shutdown().await
    })
    .await
    .map_err(|_| TransportError::WriteTimeout(io_timeout))??;

    Ok(())
}
