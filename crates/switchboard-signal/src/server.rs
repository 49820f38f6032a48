//! WebSocket signal server implementation

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use switchboard_core::{Config, PeerId};

use crate::error::SignalError;
use crate::http::{self, RequestHead, MAX_REQUEST_HEAD};
use crate::hub::{Hub, HubHandle};
use crate::messages::ClientEvent;
use crate::outbox::Outbox;
use crate::registry::Admission;

/// Wait between peeks while a request head trickles in
const HEAD_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A bound signal server
pub struct SignalServer {
    listener: TcpListener,
    hub: HubHandle,
    hub_task: JoinHandle<()>,
    config: Arc<Config>,
}

impl SignalServer {
    /// Bind the listener and start the hub
    pub async fn bind(config: Config) -> Result<Self, SignalError> {
        let listener = TcpListener::bind(config.server.addr()).await?;
        let (hub, hub_task) = Hub::spawn(config.relay.hub_queue_capacity);

        Ok(Self {
            listener,
            hub,
            hub_task,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SignalError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the hub, for monitoring
    pub fn hub(&self) -> HubHandle {
        self.hub.clone()
    }

    /// Accept connections forever
    pub async fn serve(self) -> Result<(), SignalError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), SignalError>
    where
        F: Future<Output = ()>,
    {
        info!("Signal server listening on {}", self.local_addr()?);

        let SignalServer {
            listener,
            hub,
            hub_task,
            config,
        } = self;

        tokio::select! {
            _ = accept_loop(listener, hub, config) => {}
            _ = shutdown => info!("Shutting down signal server"),
        }

        hub_task.abort();
        Ok(())
    }
}

async fn accept_loop(listener: TcpListener, hub: HubHandle, config: Arc<Config>) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let hub = hub.clone();
        let config = config.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, hub, config).await {
                debug!("Connection error from {}: {:?}", peer_addr, e);
            }
        });
    }
}

/// Handle a single connection (HTTP or WebSocket)
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    hub: HubHandle,
    config: Arc<Config>,
) -> Result<(), SignalError> {
    let handshake_timeout = config.server.handshake_timeout();

    let head = timeout(handshake_timeout, peek_request_head(&stream))
        .await
        .map_err(|_| SignalError::HandshakeTimeout)??;

    if !head.upgrade {
        return handle_http_request(&mut stream, &head, &hub, &config).await;
    }

    let mut ws_stream = timeout(handshake_timeout, accept_async(stream))
        .await
        .map_err(|_| SignalError::HandshakeTimeout)??;

    let peer_id = PeerId::try_generate().map_err(|e| io::Error::other(e.to_string()))?;
    debug!("New connection from {} as {}", peer_addr, peer_id);

    let (outbox, mut outbound) = Outbox::channel(config.relay.outbox_capacity);
    if hub.open(peer_id.clone(), outbox).await? == Admission::Duplicate {
        let _ = ws_stream.close(None).await;
        return Ok(());
    }

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Ends once the hub drops this peer's outbox or the socket stops accepting writes
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    debug!("Failed to encode {}: {}", event.name(), e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // tungstenite queues pong replies itself while reading
    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket error from {}: {:?}", peer_id, e);
                break;
            }
        };

        match ClientEvent::from_json(&text) {
            Ok(event) => {
                if hub.message(peer_id.clone(), event).await.is_err() {
                    break;
                }
            }
            Err(e) => debug!("Ignoring frame from {}: {}", peer_id, e),
        }
    }

    let closed = hub.close(peer_id.clone()).await;
    let _ = writer.await;

    debug!("Connection closed: {}", peer_id);
    closed
}

/// Peek until a full request head is buffered, leaving it unread
async fn peek_request_head(stream: &TcpStream) -> Result<RequestHead, SignalError> {
    let mut buf = vec![0u8; MAX_REQUEST_HEAD];
    loop {
        let n = stream.peek(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        if let Some(head) = http::parse_request_head(&buf[..n]) {
            return Ok(head);
        }

        if n == buf.len() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "request head too large").into());
        }

        tokio::time::sleep(HEAD_POLL_INTERVAL).await;
    }
}

/// Answer a plain HTTP request and close
async fn handle_http_request(
    stream: &mut TcpStream,
    head: &RequestHead,
    hub: &HubHandle,
    config: &Config,
) -> Result<(), SignalError> {
    // Consume the peeked head so closing doesn't reset the connection
    let mut consumed = vec![0u8; head.len];
    stream.read_exact(&mut consumed).await?;

    let peers = hub.stats().await?.peers;
    let response = http::respond(head, &config.http, peers).await;
    debug!("{} {} -> {}", head.method, head.path, response.status);

    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
