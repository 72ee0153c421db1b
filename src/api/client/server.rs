//! HTTP server exposing the signaling endpoint and the static pages served
//! around it.

use std::{
    io,
    net::SocketAddr,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use actix::Addr;
use actix_files::{Files, NamedFile};
use actix_web::{
    dev::Server,
    http::header,
    middleware,
    web::{self, Data, Payload},
    App, Error, HttpRequest, HttpResponse, HttpServer,
};
use actix_web_actors::ws;

use crate::{
    api::client::{connection::ClientId, session::WsSession},
    conf::{Conf, Rpc},
    log::prelude::*,
    signalling::router::Router,
};

/// Subprotocol token clients must offer during the upgrade handshake.
pub const SIGNALING_PROTOCOL: &str = "v1.signaling.wizzeye.app";

/// Shared state of the HTTP server.
struct Context {
    /// Router all sessions report to.
    router: Addr<Router>,

    /// Liveness timing handed to every new session.
    rpc: Rpc,

    /// Directory with the static pages served next to `/ws`.
    webroot: PathBuf,

    /// Source of unique IDs for new connections.
    next_client_id: AtomicU64,
}

/// Handles an HTTP upgrade request on `/ws`, refusing clients that do not
/// offer the signaling subprotocol.
async fn create_ws(
    request: HttpRequest,
    state: Data<Context>,
    payload: Payload,
) -> Result<HttpResponse, Error> {
    let remote = remote_addr(&request);
    if !offers_signaling_protocol(&request) {
        info!("{}: subprotocol mismatch", remote);
        return Ok(HttpResponse::BadRequest().body("Subprotocol mismatch"));
    }
    let id = ClientId(state.next_client_id.fetch_add(1, Ordering::Relaxed));
    info!("{}: new connection", remote);
    ws::start_with_protocols(
        WsSession::new(id, state.router.clone(), remote, state.rpc.clone()),
        &[SIGNALING_PROTOCOL],
        &request,
        payload,
    )
}

/// Returns the remote peer address of `request`, honoring reverse-proxy
/// headers.
fn remote_addr(request: &HttpRequest) -> String {
    request
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("-")
        .to_owned()
}

/// Checks whether the upgrade `request` offers the [`SIGNALING_PROTOCOL`]
/// among its subprotocols.
fn offers_signaling_protocol(request: &HttpRequest) -> bool {
    request
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|h| h.to_str().ok())
        .map_or(false, |protocols| {
            protocols.split(',').any(|p| p.trim() == SIGNALING_PROTOCOL)
        })
}

/// Serves the landing page of the web root.
async fn index_page(state: Data<Context>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open(state.webroot.join("index.html"))?)
}

/// Serves the room page. Any path that is neither `/ws` nor a static asset
/// rewrites here, so room URLs can be opened directly.
async fn room_page(state: Data<Context>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open(state.webroot.join("room.html"))?)
}

/// Binds the server to the configured listen address.
///
/// Returns the running [`Server`] handle along with the actually bound
/// addresses (useful when binding to port `0`).
///
/// # Errors
///
/// Errors if the listen address cannot be bound.
pub fn bind(
    conf: &Conf,
    webroot: PathBuf,
    router: Addr<Router>,
) -> io::Result<(Server, Vec<SocketAddr>)> {
    let state = Data::new(Context {
        router,
        rpc: conf.rpc.clone(),
        webroot,
        next_client_id: AtomicU64::new(0),
    });
    let server = HttpServer::new(move || {
        let static_dir = state.webroot.join("s");
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .service(web::resource("/ws").route(web::get().to(create_ws)))
            .service(Files::new("/s", static_dir))
            .service(web::resource("/").route(web::get().to(index_page)))
            .default_service(web::route().to(room_page))
    })
    .bind(&conf.server.listen)?
    .shutdown_timeout(conf.rpc.write_timeout.as_secs());
    let addrs = server.addrs();

    Ok((server.run(), addrs))
}

/// Runs the server until it is stopped by a shutdown signal.
///
/// # Errors
///
/// Errors if the listen address cannot be bound, or the server dies
/// abnormally.
pub async fn run(
    conf: Conf,
    webroot: PathBuf,
    router: Addr<Router>,
) -> io::Result<()> {
    let (server, _) = bind(&conf, webroot, router)?;
    info!("Listening on {}", conf.server.listen);
    server.await
}
