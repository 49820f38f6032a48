//! End-to-end tests against a live relay on a loopback port

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use switchboard_core::{Config, PeerId};
use switchboard_signal::{ClientEvent, HubHandle, ServerEvent, SignalServer};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server(public_dir: &Path) -> (SocketAddr, HubHandle) {
    let mut config = Config::default();
    config.server.bind = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.server.port = 0;
    config.http.public_dir = public_dir.to_path_buf();

    let server = SignalServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let hub = server.hub();
    tokio::spawn(server.serve());
    (addr, hub)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    ws
}

async fn recv(ws: &mut Client) -> ServerEvent {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return ServerEvent::from_json(&text).unwrap();
        }
    }
}

async fn send(ws: &mut Client, event: &ClientEvent) {
    ws.send(Message::Text(event.to_json().unwrap())).await.unwrap();
}

async fn assert_silent(ws: &mut Client) {
    assert!(
        timeout(Duration::from_millis(200), ws.next()).await.is_err(),
        "expected no event"
    );
}

fn single_user(event: ServerEvent) -> PeerId {
    match event {
        ServerEvent::UpdateUserList { mut users } if users.len() == 1 => users.remove(0),
        other => panic!("expected a single-user list, got {:?}", other),
    }
}

/// Connect `a` then `b`; returns both clients with their ids
async fn pair(addr: SocketAddr) -> (Client, PeerId, Client, PeerId) {
    let mut a = connect(addr).await;
    assert_eq!(recv(&mut a).await, ServerEvent::UpdateUserList { users: vec![] });

    let mut b = connect(addr).await;
    let a_id = single_user(recv(&mut b).await);
    let b_id = single_user(recv(&mut a).await);
    (a, a_id, b, b_id)
}

#[tokio::test]
async fn test_third_peer_sees_full_roster() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _hub) = start_server(dir.path()).await;
    let (mut a, a_id, mut b, b_id) = pair(addr).await;

    let mut c = connect(addr).await;
    assert_eq!(
        recv(&mut c).await,
        ServerEvent::UpdateUserList {
            users: vec![a_id.clone(), b_id.clone()]
        }
    );

    let c_from_a = single_user(recv(&mut a).await);
    let c_from_b = single_user(recv(&mut b).await);
    assert_eq!(c_from_a, c_from_b);
    assert_ne!(c_from_a, a_id);
    assert_ne!(c_from_a, b_id);
}

#[tokio::test]
async fn test_offer_answer_reject() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _hub) = start_server(dir.path()).await;
    let (mut a, a_id, mut b, b_id) = pair(addr).await;

    let offer = json!({"type": "offer", "sdp": "v=0\r\no=- 1 2 IN IP4 127.0.0.1"});
    send(
        &mut a,
        &ClientEvent::CallUser {
            to: b_id.clone(),
            offer: offer.clone(),
        },
    )
    .await;
    assert_eq!(
        recv(&mut b).await,
        ServerEvent::CallMade {
            offer,
            socket: a_id.clone(),
        }
    );

    let answer = json!({"type": "answer", "sdp": "v=0"});
    send(
        &mut b,
        &ClientEvent::MakeAnswer {
            to: a_id.clone(),
            answer: answer.clone(),
        },
    )
    .await;
    assert_eq!(
        recv(&mut a).await,
        ServerEvent::AnswerMade {
            socket: b_id.clone(),
            answer,
        }
    );

    send(&mut b, &ClientEvent::RejectCall { from: a_id.clone() }).await;
    assert_eq!(
        recv(&mut a).await,
        ServerEvent::CallRejected { socket: b_id }
    );
}

#[tokio::test]
async fn test_disconnect_broadcasts_removal() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _hub) = start_server(dir.path()).await;
    let (mut a, _a_id, mut b, b_id) = pair(addr).await;

    b.close(None).await.unwrap();
    assert_eq!(
        recv(&mut a).await,
        ServerEvent::RemoveUser {
            socket_id: b_id.clone()
        }
    );

    // Routing to the departed peer is a silent drop
    send(
        &mut a,
        &ClientEvent::CallUser {
            to: b_id,
            offer: json!("sdp"),
        },
    )
    .await;
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_unknown_target_and_garbage_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _hub) = start_server(dir.path()).await;
    let (mut a, a_id, mut b, b_id) = pair(addr).await;

    send(
        &mut a,
        &ClientEvent::CallUser {
            to: PeerId::from("0000000000000000"),
            offer: json!("sdp"),
        },
    )
    .await;
    a.send(Message::Text("not json".into())).await.unwrap();
    a.send(Message::Text(r#"{"event":"join-room","data":{}}"#.into()))
        .await
        .unwrap();
    a.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    assert_silent(&mut a).await;
    assert_silent(&mut b).await;

    // The connection is still usable afterwards
    send(&mut a, &ClientEvent::RejectCall { from: b_id }).await;
    assert_eq!(recv(&mut b).await, ServerEvent::CallRejected { socket: a_id });
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    timeout(RECV_TIMEOUT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();
    response
}

#[tokio::test]
async fn test_http_on_signaling_port() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.css"), "body{}").unwrap();
    let (addr, _hub) = start_server(dir.path()).await;

    let landing = http_get(addr, "/").await;
    assert!(landing.starts_with("HTTP/1.1 200 OK"));
    assert!(landing.ends_with("<h1>Hello World</h1>"));

    let css = http_get(addr, "/app.css").await;
    assert!(css.contains("Content-Type: text/css"));
    assert!(css.ends_with("body{}"));

    assert!(http_get(addr, "/missing.js").await.starts_with("HTTP/1.1 404"));

    let _a = connect(addr).await;
    // Admission happens asynchronously after the handshake
    let mut health = String::new();
    for _ in 0..50 {
        health = http_get(addr, "/health").await;
        if health.contains(r#""peers":1"#) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(health.ends_with(r#"{"status":"healthy","peers":1}"#));
}

/// Connect and read presence events until `others` peers are known
async fn join_and_learn(addr: SocketAddr, others: usize) -> (Client, Vec<PeerId>) {
    let mut ws = connect(addr).await;
    let mut known = match recv(&mut ws).await {
        ServerEvent::UpdateUserList { users } => users,
        other => panic!("expected the roster first, got {:?}", other),
    };
    while known.len() < others {
        known.push(single_user(recv(&mut ws).await));
    }
    (ws, known)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_and_leaves() {
    const CLIENTS: usize = 20;

    let dir = tempfile::tempdir().unwrap();
    let (addr, hub) = start_server(dir.path()).await;

    let joins: Vec<_> = (0..CLIENTS)
        .map(|_| tokio::spawn(join_and_learn(addr, CLIENTS - 1)))
        .collect();
    let mut clients = Vec::new();
    for join in joins {
        clients.push(join.await.unwrap());
    }

    // Every id is announced exactly once to each other peer
    let everyone: HashSet<PeerId> = clients
        .iter()
        .flat_map(|(_, known)| known.iter().cloned())
        .collect();
    assert_eq!(everyone.len(), CLIENTS);

    let mut peers = Vec::new();
    for (ws, known) in clients {
        let known_set: HashSet<PeerId> = known.iter().cloned().collect();
        assert_eq!(known_set.len(), CLIENTS - 1, "duplicate presence event");
        let own: Vec<PeerId> = everyone.difference(&known_set).cloned().collect();
        assert_eq!(own.len(), 1);
        peers.push((ws, own[0].clone()));
    }
    assert_eq!(hub.stats().await.unwrap().peers, CLIENTS);

    let survivors = peers.split_off(CLIENTS / 2);
    let departed: HashSet<PeerId> = peers.iter().map(|(_, id)| id.clone()).collect();

    let leaves: Vec<_> = peers
        .into_iter()
        .map(|(mut ws, _)| tokio::spawn(async move { ws.close(None).await.unwrap() }))
        .collect();
    let watchers: Vec<_> = survivors
        .into_iter()
        .map(|(mut ws, _)| {
            let expected = departed.len();
            tokio::spawn(async move {
                let mut removed = HashSet::new();
                while removed.len() < expected {
                    match recv(&mut ws).await {
                        ServerEvent::RemoveUser { socket_id } => {
                            assert!(removed.insert(socket_id), "removal announced twice");
                        }
                        other => panic!("expected remove-user, got {:?}", other),
                    }
                }
                (ws, removed)
            })
        })
        .collect();

    for leave in leaves {
        leave.await.unwrap();
    }
    let mut remaining = Vec::new();
    for watcher in watchers {
        let (ws, removed) = watcher.await.unwrap();
        assert_eq!(removed, departed);
        remaining.push(ws);
    }

    // Removals are applied before they are broadcast
    assert_eq!(hub.stats().await.unwrap().peers, CLIENTS - CLIENTS / 2);
    for ws in &mut remaining {
        assert_silent(ws).await;
    }
}
