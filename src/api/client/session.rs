//! WebSocket session of one connected client.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use actix::{
    Actor, ActorContext, Addr, AsyncContext, Handler, Message, Recipient,
    StreamHandler,
};
use actix_web_actors::ws;

use crate::{
    api::client::{
        connection::{Client, ClientId, Connection},
        msg::Msg,
    },
    conf::Rpc,
    log::prelude::*,
    signalling::router::{Alive, Inbound, Router},
};

/// Period of the watchdog checking a session's read deadline.
const WATCHDOG_PERIOD: Duration = Duration::from_secs(1);

/// Message bound for the remote client of a [`WsSession`].
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct Outbound(pub Msg);

/// Request to verify that the remote client is still responsive, issued by
/// the router while arbitrating a seat takeover.
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct Probe;

/// Actor owning one WebSocket connection for its entire lifetime.
///
/// Reads arrive through the [`StreamHandler`] impl, writes go through the
/// actor's mailbox, and two interval timers provide the keepalive heartbeat
/// and the read-deadline watchdog. The read deadline is the only liveness
/// mechanism: it is reset by every received frame, and tightened to the
/// pong timeout while a takeover probe is outstanding.
pub struct WsSession {
    /// ID of this connection.
    id: ClientId,

    /// Handle under which the router knows this session. Set when the actor
    /// starts.
    client: Option<Client>,

    /// Router this session reports to.
    router: Addr<Router>,

    /// Remote peer address, used for logging only.
    remote: String,

    /// Liveness timing taken from the configuration.
    rpc: Rpc,

    /// Moment after which the connection is considered dead.
    idle_deadline: Instant,

    /// Set while a takeover probe is outstanding. Makes concurrent probe
    /// requests coalesce into one.
    probe_pending: bool,

    /// Counter used as the payload of transport-level pings.
    last_ping_num: u32,
}

impl WsSession {
    /// Creates a new session for a freshly upgraded connection.
    #[must_use]
    pub fn new(
        id: ClientId,
        router: Addr<Router>,
        remote: String,
        rpc: Rpc,
    ) -> Self {
        let idle_deadline =
            Instant::now() + rpc.ping_interval + rpc.pong_timeout;
        Self {
            id,
            client: None,
            router,
            remote,
            rpc,
            idle_deadline,
            probe_pending: false,
            last_ping_num: 0,
        }
    }

    /// Resets the read deadline after a successfully received frame.
    ///
    /// Any inbound traffic also resolves an outstanding takeover probe: the
    /// peer has just proven it is reachable.
    fn mark_alive(&mut self) {
        self.idle_deadline =
            Instant::now() + self.rpc.ping_interval + self.rpc.pong_timeout;
        if self.probe_pending {
            self.probe_pending = false;
            if let Some(client) = &self.client {
                self.router.do_send(Alive(client.clone()));
            }
        }
    }

    /// Emits a transport-level ping carrying a counter payload.
    fn ping(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        self.last_ping_num += 1;
        ctx.ping(&self.last_ping_num.to_be_bytes());
    }

    /// Stamps `msg` with this session as its origin and hands it to the
    /// router.
    fn forward_to_router(&self, msg: Msg) {
        if let Some(client) = &self.client {
            self.router.do_send(Inbound {
                origin: client.clone(),
                msg,
            });
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    /// Builds the routable [`Client`] handle of this session and schedules
    /// the heartbeat and the read-deadline watchdog.
    fn started(&mut self, ctx: &mut Self::Context) {
        self.client = Some(Client::new(
            self.id,
            Arc::new(WsConnection {
                msgs: ctx.address().recipient(),
                probes: ctx.address().recipient(),
            }),
        ));

        ctx.run_interval(self.rpc.ping_interval, Self::ping);
        ctx.run_interval(WATCHDOG_PERIOD, |this, ctx| {
            if Instant::now() >= this.idle_deadline {
                info!("{}: connection timed out", this.remote);
                ctx.stop();
            }
        });
    }

    /// Announces the departure to the router. This is the session's
    /// unconditional last word: it fires on clean closes, read errors and
    /// timeouts alike.
    fn stopped(&mut self, _: &mut Self::Context) {
        info!("{}: disconnected", self.remote);
        if let Some(client) = self.client.take() {
            self.router.do_send(Inbound {
                origin: client,
                msg: Msg::Leave {
                    room: None,
                    role: None,
                },
            });
        }
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        debug!("{}: >> {:?}", self.remote, msg.0);
        ctx.text(serde_json::to_string(&msg.0).unwrap());
    }
}

impl Handler<Probe> for WsSession {
    type Result = ();

    /// Tightens the read deadline to the pong timeout and pings the peer.
    /// A probe already in flight absorbs the request.
    fn handle(&mut self, _: Probe, ctx: &mut Self::Context) {
        if self.probe_pending {
            return;
        }
        self.probe_pending = true;
        self.idle_deadline = Instant::now() + self.rpc.pong_timeout;
        debug!("{}: probing liveness", self.remote);
        self.ping(ctx);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(
        &mut self,
        msg: Result<ws::Message, ws::ProtocolError>,
        ctx: &mut Self::Context,
    ) {
        let frame = match msg {
            Ok(frame) => frame,
            Err(err) => {
                error!("{}: read error: {}", self.remote, err);
                ctx.stop();
                return;
            }
        };
        self.mark_alive();
        match frame {
            ws::Message::Text(text) => {
                match serde_json::from_str::<Msg>(&text) {
                    Ok(msg) => {
                        debug!("{}: << {:?}", self.remote, msg);
                        self.forward_to_router(msg);
                    }
                    Err(err) => {
                        warn!("{}: undecodable frame: {}", self.remote, err);
                        ctx.stop();
                    }
                }
            }
            ws::Message::Ping(data) => ctx.pong(&data),
            ws::Message::Pong(_) => (),
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Binary(_) | ws::Message::Continuation(_) => {
                warn!("{}: unsupported frame", self.remote);
            }
            ws::Message::Nop => (),
        }
    }

    /// The remote side went away without a close handshake.
    fn finished(&mut self, ctx: &mut Self::Context) {
        ctx.stop();
    }
}

/// Transport side of a [`WsSession`], handed to the router inside a
/// [`Client`] handle. Sends go through the session's mailbox and are
/// dropped once the session has stopped.
struct WsConnection {
    msgs: Recipient<Outbound>,
    probes: Recipient<Probe>,
}

impl Connection for WsConnection {
    fn send(&self, msg: Msg) {
        let _ = self.msgs.do_send(Outbound(msg));
    }

    fn probe(&self) {
        let _ = self.probes.do_send(Probe);
    }
}

impl fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsConnection").finish()
    }
}
