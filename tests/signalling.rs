//! End-to-end signaling tests over real WebSocket connections.

use std::time::Duration;

use actix::Actor as _;
use actix_codec::Framed;
use awc::{
    ws::{Codec, Frame, Message},
    BoxedSocket,
};
use futures::{SinkExt as _, StreamExt as _};
use serde_json::json;
use tokio::time::timeout;

use wizzeye::{
    api::client::{
        msg::{Msg, Role},
        server::{self, SIGNALING_PROTOCOL},
    },
    conf::Conf,
    signalling::Router,
};

/// Longest time a test waits for an expected message.
const RECV_DEADLINE: Duration = Duration::from_secs(5);

type Socket = Framed<BoxedSocket, Codec>;

/// Starts a server with the given pong timeout on an ephemeral port and
/// returns its address.
fn start_server(pong_timeout: Duration) -> String {
    let mut conf = Conf::default();
    conf.server.listen = String::from("127.0.0.1:0");
    conf.rpc.pong_timeout = pong_timeout;
    let router = Router::new().start();
    let (srv, addrs) = server::bind(&conf, "webroot".into(), router).unwrap();
    actix_rt::spawn(async move {
        let _ = srv.await;
    });
    addrs[0].to_string()
}

/// Opens a signaling connection to the server at `addr`.
async fn connect(addr: &str) -> Socket {
    let (_, framed) = awc::Client::new()
        .ws(format!("ws://{}/ws", addr))
        .protocols(vec![SIGNALING_PROTOCOL])
        .connect()
        .await
        .unwrap();
    framed
}

async fn send(socket: &mut Socket, msg: &Msg) {
    let json = serde_json::to_string(msg).unwrap();
    socket.send(Message::Text(json.into())).await.unwrap();
}

/// Receives the next signaling message, transparently answering transport
/// pings on the way.
async fn recv(socket: &mut Socket) -> Msg {
    timeout(RECV_DEADLINE, async {
        loop {
            match socket.next().await.unwrap().unwrap() {
                Frame::Text(text) => {
                    break serde_json::from_slice(&text).unwrap();
                }
                Frame::Ping(data) => {
                    socket.send(Message::Pong(data)).await.unwrap();
                }
                Frame::Pong(_) => (),
                frame => panic!("unexpected frame: {:?}", frame),
            }
        }
    })
    .await
    .expect("no message within deadline")
}

/// Receives the next transport ping, leaving it unanswered.
async fn recv_ping(socket: &mut Socket) {
    timeout(RECV_DEADLINE, async {
        loop {
            match socket.next().await.unwrap().unwrap() {
                Frame::Ping(_) => break,
                Frame::Text(text) => panic!(
                    "unexpected message: {}",
                    String::from_utf8_lossy(&text),
                ),
                _ => (),
            }
        }
    })
    .await
    .expect("no ping within deadline")
}

fn join(room: &str, role: Role) -> Msg {
    Msg::Join {
        room: room.into(),
        role: Some(role),
    }
}

fn error_code(msg: &Msg) -> u16 {
    match msg {
        Msg::Error { code, .. } => *code,
        other => panic!("expected error, got {:?}", other),
    }
}

#[actix_rt::test]
async fn peers_rendezvous_in_room() {
    let addr = start_server(Duration::from_secs(5));
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    send(&mut a, &join("demo-room", Role::GlassWearer)).await;
    send(&mut b, &join("demo-room", Role::Observer)).await;

    assert_eq!(
        recv(&mut a).await,
        Msg::Join {
            room: "demo-room".into(),
            role: Some(Role::Observer),
        },
    );
    assert_eq!(
        recv(&mut b).await,
        Msg::Join {
            room: "demo-room".into(),
            role: Some(Role::GlassWearer),
        },
    );
}

#[actix_rt::test]
async fn forwards_offer_to_the_other_peer_only() {
    let addr = start_server(Duration::from_secs(5));
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    send(&mut a, &join("demo-room", Role::GlassWearer)).await;
    send(&mut b, &join("demo-room", Role::Observer)).await;
    recv(&mut a).await;
    recv(&mut b).await;

    let offer = Msg::Offer {
        payload: Some(json!({ "x": 1 })),
        ice_servers: None,
    };
    send(&mut a, &offer).await;
    assert_eq!(recv(&mut b).await, offer);

    // An application ping flushes A's queue, proving nothing else arrived.
    send(&mut a, &Msg::Ping).await;
    assert_eq!(recv(&mut a).await, Msg::Pong);
}

#[actix_rt::test]
async fn errors_on_forward_without_room() {
    let addr = start_server(Duration::from_secs(5));
    let mut c = connect(&addr).await;

    send(
        &mut c,
        &Msg::Offer {
            payload: Some(json!({})),
            ice_servers: None,
        },
    )
    .await;

    assert_eq!(error_code(&recv(&mut c).await), 3);
}

#[actix_rt::test]
async fn rejects_malformed_room_name() {
    let addr = start_server(Duration::from_secs(5));
    let mut c = connect(&addr).await;

    send(&mut c, &join("Hi!", Role::Observer)).await;

    assert_eq!(error_code(&recv(&mut c).await), 5);
}

#[actix_rt::test]
async fn rejects_unknown_role() {
    let addr = start_server(Duration::from_secs(5));
    let mut c = connect(&addr).await;

    let raw = "{\"type\":\"join\",\"room\":\"demo-room\",\"role\":\"pilot\"}";
    c.send(Message::Text(raw.into())).await.unwrap();

    assert_eq!(error_code(&recv(&mut c).await), 2);
}

#[actix_rt::test]
async fn live_incumbent_keeps_its_seat() {
    let addr = start_server(Duration::from_secs(2));
    let mut a = connect(&addr).await;
    send(&mut a, &join("room-one", Role::GlassWearer)).await;
    // Wait until the join is processed before contending for the seat.
    send(&mut a, &Msg::Ping).await;
    assert_eq!(recv(&mut a).await, Msg::Pong);

    let mut c = connect(&addr).await;
    send(&mut c, &join("room-one", Role::GlassWearer)).await;

    // A answers the takeover probe, so C must be turned away.
    recv_ping(&mut a).await;
    a.send(Message::Pong(Vec::new().into())).await.unwrap();

    assert_eq!(error_code(&recv(&mut c).await), 4);

    // A never observed the contention.
    send(&mut a, &Msg::Ping).await;
    assert_eq!(recv(&mut a).await, Msg::Pong);
}

#[actix_rt::test]
async fn dead_incumbent_is_replaced() {
    let addr = start_server(Duration::from_secs(1));
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    send(&mut a, &join("room-one", Role::GlassWearer)).await;
    send(&mut b, &join("room-one", Role::Observer)).await;
    recv(&mut a).await;
    recv(&mut b).await;

    // A goes silent from here on and never answers the takeover probe.
    let mut c = connect(&addr).await;
    send(&mut c, &join("room-one", Role::GlassWearer)).await;

    assert_eq!(
        recv(&mut b).await,
        Msg::Leave {
            room: Some("room-one".into()),
            role: Some(Role::GlassWearer),
        },
    );
    assert_eq!(
        recv(&mut b).await,
        Msg::Join {
            room: "room-one".into(),
            role: Some(Role::GlassWearer),
        },
    );
    assert_eq!(
        recv(&mut c).await,
        Msg::Join {
            room: "room-one".into(),
            role: Some(Role::Observer),
        },
    );
    drop(a);
}

#[actix_rt::test]
async fn newer_waiter_displaces_previous_one() {
    let addr = start_server(Duration::from_secs(2));
    let mut a = connect(&addr).await;
    send(&mut a, &join("room-one", Role::GlassWearer)).await;
    send(&mut a, &Msg::Ping).await;
    assert_eq!(recv(&mut a).await, Msg::Pong);

    let mut c1 = connect(&addr).await;
    send(&mut c1, &join("room-one", Role::GlassWearer)).await;
    // Wait until the join is processed before racing the second waiter.
    send(&mut c1, &Msg::Ping).await;
    assert_eq!(recv(&mut c1).await, Msg::Pong);

    let mut c2 = connect(&addr).await;
    send(&mut c2, &join("room-one", Role::GlassWearer)).await;

    assert_eq!(error_code(&recv(&mut c1).await), 4);

    recv_ping(&mut a).await;
    a.send(Message::Pong(Vec::new().into())).await.unwrap();

    assert_eq!(error_code(&recv(&mut c2).await), 4);
}

#[actix_rt::test]
async fn leave_frees_the_seat() {
    let addr = start_server(Duration::from_secs(5));
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    send(&mut a, &join("demo-room", Role::GlassWearer)).await;
    send(&mut b, &join("demo-room", Role::Observer)).await;
    recv(&mut a).await;
    recv(&mut b).await;

    send(
        &mut b,
        &Msg::Leave {
            room: None,
            role: None,
        },
    )
    .await;
    assert_eq!(
        recv(&mut a).await,
        Msg::Leave {
            room: Some("demo-room".into()),
            role: Some(Role::Observer),
        },
    );

    let mut b2 = connect(&addr).await;
    send(&mut b2, &join("demo-room", Role::Observer)).await;
    assert_eq!(
        recv(&mut a).await,
        Msg::Join {
            room: "demo-room".into(),
            role: Some(Role::Observer),
        },
    );
    assert_eq!(
        recv(&mut b2).await,
        Msg::Join {
            room: "demo-room".into(),
            role: Some(Role::GlassWearer),
        },
    );
}

#[actix_rt::test]
async fn refuses_upgrade_without_subprotocol() {
    let addr = start_server(Duration::from_secs(5));

    let result = awc::Client::new()
        .ws(format!("ws://{}/ws", addr))
        .connect()
        .await;

    assert!(result.is_err());
}
