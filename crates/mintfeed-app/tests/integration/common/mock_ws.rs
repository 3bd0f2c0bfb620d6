//! Mock WebSocket server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections
//! - Push text frames to every connected client
//! - Close connections with a close frame, or drop them without one
//! - Go silent after the handshake so client pings are never answered

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Instruction fanned out to every live connection.
#[derive(Debug, Clone)]
enum Command {
    Send(String),
    Close,
    Drop,
}

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    commands: broadcast::Sender<Command>,
    connections: Arc<AtomicU32>,
    active: Arc<AtomicU32>,
}

impl MockWsServer {
    /// Start a new mock WebSocket server on an available port.
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Start a server that completes the handshake and then never reads,
    /// so pings from the client go unanswered.
    pub async fn start_silent() -> Self {
        Self::spawn(true).await
    }

    async fn spawn(silent: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (commands, _) = broadcast::channel::<Command>(64);
        let connections = Arc::new(AtomicU32::new(0));
        let active = Arc::new(AtomicU32::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let commands_clone = commands.clone();
        let connections_clone = connections.clone();
        let active_clone = active.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        // Subscribe before the handshake so no command sent
                        // after the client sees Open is missed.
                        let commands = commands_clone.subscribe();
                        connections_clone.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(handle_connection(
                            stream,
                            commands,
                            active_clone.clone(),
                            silent,
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            commands,
            connections,
            active,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}/connect", self.addr)
    }

    /// Number of connections accepted so far.
    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Number of connections currently open.
    pub fn active_count(&self) -> u32 {
        self.active.load(Ordering::SeqCst)
    }

    /// Push a text frame to every connected client.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::Send(text.into()));
    }

    /// Push a listing frame built from its four fields.
    pub fn send_entry(&self, name: &str, symbol: &str, uri: &str, mint: &str) {
        let frame = serde_json::json!({
            "name": name,
            "symbol": symbol,
            "uri": uri,
            "mint": mint,
        });
        self.send_text(frame.to_string());
    }

    /// Close every connection with a normal close frame.
    pub fn close_all(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Drop every connection without a closing handshake.
    pub fn drop_all(&self) {
        let _ = self.commands.send(Command::Drop);
    }

    /// Wait until at least `count` connections have been accepted.
    pub async fn wait_for_connections(&self, count: u32, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            while self.connection_count() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    /// Shutdown the server. Open connections are left to the clients.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    mut commands: broadcast::Receiver<Command>,
    active: Arc<AtomicU32>,
    silent: bool,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    active.fetch_add(1, Ordering::SeqCst);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Ok(Command::Send(text)) => {
                        if write.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Command::Close) => {
                        let frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "server closing".into(),
                        };
                        let _ = write.send(Message::Close(Some(frame))).await;
                        break;
                    }
                    Ok(Command::Drop) | Err(_) => break,
                }
            }
            msg = read.next(), if !silent => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    active.fetch_sub(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        assert_eq!(server.connection_count(), 0);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_silent_server_accepts_handshake() {
        let server = MockWsServer::start_silent().await;
        let (_ws, _) = tokio_tungstenite::connect_async(server.url()).await.unwrap();

        assert!(server.wait_for_connections(1, Duration::from_secs(2)).await);
        server.drop_all();
        server.shutdown().await;
    }
}
