use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use crate::counters::{Counter, Counters, StatisticsWorker, STATISTICS_INTERVAL};
use crate::monitor::{Core, CoreError};
use crate::output::Response;
use crate::store::Store;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    /// JSON snapshot to load the core from; an empty core otherwise
    pub objects_path: Option<PathBuf>,
    pub stats_interval: Duration,
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/periscope.sock"),
            objects_path: None,
            stats_interval: STATISTICS_INTERVAL,
            max_request_bytes: 1024 * 1024, // 1MB
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load objects: {0}")]
    Core(#[from] CoreError),
}

/// Run the socket server until Ctrl+C
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let core = match &config.objects_path {
        Some(path) => {
            let core = Core::load(path)?;
            let graph = core.read();
            tracing::info!(
                "Loaded {} hosts, {} services, {} log entries from {}",
                graph.hosts.len(),
                graph.services.len(),
                graph.log.len(),
                path.display()
            );
            drop(graph);
            core
        }
        None => {
            tracing::info!("No object snapshot configured, starting with an empty core");
            Core::default()
        }
    };

    let counters = Arc::new(Counters::with_interval(config.stats_interval));
    let store = Arc::new(Store::new(Arc::new(core), Arc::clone(&counters)));

    // Start background workers
    let stats_worker = Arc::new(StatisticsWorker::new(
        Arc::clone(&counters),
        config.stats_interval,
    ));
    let stats_handle = Arc::clone(&stats_worker).start();

    // A socket left behind by an earlier run would make bind fail
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)?;
    tracing::info!("Starting Periscope on {}", config.socket_path.display());

    serve(listener, store, config.max_request_bytes, shutdown_signal()).await;

    stats_worker.stop();
    stats_handle.abort();
    if let Err(e) = std::fs::remove_file(&config.socket_path) {
        tracing::warn!("Failed to remove socket {}: {}", config.socket_path.display(), e);
    }

    tracing::info!("Periscope stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Accept connections until `shutdown` completes
pub async fn serve(
    listener: UnixListener,
    store: Arc<Store>,
    max_request_bytes: usize,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    store.counters().increment(Counter::Connections);
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, store, max_request_bytes).await {
                            tracing::debug!("Connection closed with error: {}", e);
                        }
                    });
                }
                Err(e) => tracing::warn!("Failed to accept connection: {}", e),
            },
        }
    }
}

/// What reading one request block produced
enum Incoming {
    Request(Vec<u8>),
    TooLarge,
    Closed,
}

/// Read up to the blank line ending a request block. No more than
/// `max_request_bytes + 1` bytes are buffered, newline or not.
async fn read_request(
    reader: &mut BufReader<tokio::net::unix::OwnedReadHalf>,
    max_request_bytes: usize,
) -> std::io::Result<Incoming> {
    let mut block: Vec<u8> = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    loop {
        line.clear();
        let budget = (max_request_bytes - block.len()) as u64 + 1;
        let n = (&mut *reader).take(budget).read_until(b'\n', &mut line).await?;
        if n == 0 {
            // The client may half-close instead of sending a blank line
            return Ok(if block.iter().all(u8::is_ascii_whitespace) {
                Incoming::Closed
            } else {
                Incoming::Request(block)
            });
        }
        if line.iter().all(|&b| b == b'\r' || b == b'\n') {
            if block.is_empty() {
                continue;
            }
            return Ok(Incoming::Request(block));
        }
        if block.len() + line.len() > max_request_bytes {
            return Ok(Incoming::TooLarge);
        }
        block.extend_from_slice(&line);
    }
}

async fn handle_connection(
    stream: UnixStream,
    store: Arc<Store>,
    max_request_bytes: usize,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let block = match read_request(&mut reader, max_request_bytes).await? {
            Incoming::Request(block) => block,
            Incoming::Closed => break,
            Incoming::TooLarge => {
                let response = Response::error(
                    413,
                    format!("Request exceeds the limit of {} bytes", max_request_bytes),
                );
                write_half.write_all(response.render().as_bytes()).await?;
                break;
            }
        };

        // Evaluation holds the core's read lock and never yields
        let answering = Arc::clone(&store);
        let response = tokio::task::spawn_blocking(move || answering.answer_bytes(&block))
            .await
            .unwrap_or_else(|e| Response::error(500, format!("Request failed: {}", e)));

        write_half.write_all(response.render().as_bytes()).await?;
        if !response.keep_alive {
            break;
        }
    }

    write_half.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Snapshot;

    fn test_store() -> Arc<Store> {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "hosts": [
                {"name": "web01", "state": 0},
                {"name": "db01", "state": 2}
            ]
        }))
        .unwrap();
        let core = Arc::new(Core::from_snapshot(snapshot).unwrap());
        Arc::new(Store::new(core, Arc::new(Counters::new())))
    }

    async fn start(
        store: Arc<Store>,
        max_request_bytes: usize,
    ) -> (tempfile::TempDir, PathBuf, tokio::sync::oneshot::Sender<()>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(serve(listener, store, max_request_bytes, async {
            let _ = rx.await;
        }));
        (dir, path, tx)
    }

    async fn roundtrip(stream: &mut UnixStream, request: &str) -> String {
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_query_over_socket() {
        let store = test_store();
        let (_dir, path, _tx) = start(Arc::clone(&store), 1024).await;

        let mut stream = UnixStream::connect(&path).await.unwrap();
        let response = roundtrip(&mut stream, "GET hosts\nColumns: name\nFilter: state = 2\n\n").await;
        assert_eq!(response, "db01\n");
        assert_eq!(store.counters().read(Counter::Connections), 1);
        assert_eq!(store.counters().read(Counter::Requests), 1);
    }

    #[tokio::test]
    async fn test_keep_alive_with_fixed16() {
        let (_dir, path, _tx) = start(test_store(), 1024).await;

        let mut stream = UnixStream::connect(&path).await.unwrap();
        stream
            .write_all(b"GET hosts\nStats: state = 2\nKeepAlive: on\nResponseHeader: fixed16\n\n")
            .await
            .unwrap();

        let mut header = [0u8; 16];
        stream.read_exact(&mut header).await.unwrap();
        assert_eq!(&header, b"200           2\n");
        let mut body = [0u8; 2];
        stream.read_exact(&mut body).await.unwrap();
        assert_eq!(&body, b"1\n");

        // The connection stays open for a second request
        let response = roundtrip(&mut stream, "GET hosts\nStats: state = 0\n\n").await;
        assert_eq!(response, "1\n");
    }

    #[tokio::test]
    async fn test_oversized_request_rejected() {
        let (_dir, path, _tx) = start(test_store(), 32).await;

        let mut stream = UnixStream::connect(&path).await.unwrap();
        let request = format!("GET hosts\nColumns: {}\n\n", "name ".repeat(20));
        let response = roundtrip(&mut stream, &request).await;
        assert!(response.starts_with("Request exceeds the limit"));
    }

    #[tokio::test]
    async fn test_unterminated_line_capped_at_limit() {
        let (_dir, path, _tx) = start(test_store(), 64).await;

        let mut stream = UnixStream::connect(&path).await.unwrap();
        // No newline ever arrives; the server must answer without waiting for one
        stream.write_all(&[b'x'; 4096]).await.unwrap();
        let mut response = String::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
            .await
            .unwrap()
            .unwrap();
        assert!(response.starts_with("Request exceeds the limit of 64 bytes"));
    }

    #[tokio::test]
    async fn test_non_utf8_request_answered_with_error() {
        let (_dir, path, _tx) = start(test_store(), 1024).await;

        let mut stream = UnixStream::connect(&path).await.unwrap();
        stream
            .write_all(b"GET hosts\nResponseHeader: fixed16\nFilter: name = caf\xe9\n\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();

        let response = String::from_utf8(response).unwrap();
        assert!(response.starts_with("400 "));
        assert!(response[16..].starts_with("Request is not valid UTF-8"));
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, test_store(), 1024, async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
