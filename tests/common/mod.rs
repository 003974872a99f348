//! Shared test infrastructure: an in-process WebSocket server that
//! records client frames and lets tests script server-delivered ones.

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, broadcast};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// How long test helpers wait for an expected condition.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize logging for the test binary. Safe to call from every
/// test; only the first call wins.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Minimal chat server double: accepts every connection, logs received
/// text frames, and forwards injected frames to connected clients.
pub struct TestServer {
    /// Base URL for the client under test (`ws://127.0.0.1:port`).
    pub url: String,
    inject_tx: broadcast::Sender<String>,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    accept_handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Bind an ephemeral port and start accepting connections.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (inject_tx, _) = broadcast::channel::<String>(64);
        let received = Arc::new(Mutex::new(Vec::new()));

        let connections = Arc::new(AtomicUsize::new(0));

        let tx = inject_tx.clone();
        let log = received.clone();
        let conn_count = connections.clone();
        let accept_handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let ws = match accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(_) => continue,
                };
                let (mut write, mut read) = ws.split();
                // Subscribe before the connection becomes countable, so
                // a test that waited on the count can inject safely.
                let mut inject_rx = tx.subscribe();
                conn_count.fetch_add(1, Ordering::SeqCst);
                let log = log.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            frame = inject_rx.recv() => {
                                let Ok(text) = frame else { return };
                                if write.send(Message::Text(text.into())).await.is_err() {
                                    return;
                                }
                            }
                            frame = read.next() => {
                                match frame {
                                    Some(Ok(Message::Text(text))) => {
                                        log.lock().await.push(text.to_string());
                                    }
                                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                                    Some(Ok(_)) => {}
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            url: format!("ws://{addr}"),
            inject_tx,
            received,
            connections,
            accept_handle,
        }
    }

    /// Number of client connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Deliver a raw text frame to every connected client.
    pub fn inject(&self, frame: impl Into<String>) {
        let _ = self.inject_tx.send(frame.into());
    }

    /// Text frames received from clients so far.
    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_handle.abort();
    }
}

/// Poll a condition until it holds or the wait times out.
pub async fn wait_until<F>(what: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll an async condition until it holds or the wait times out.
pub async fn wait_until_async<F, Fut>(what: &str, condition: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !condition().await {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
