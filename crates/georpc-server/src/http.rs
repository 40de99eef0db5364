use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{Html, IntoResponse, Response};
use axum::http::StatusCode;
use axum::routing::{get, on, MethodFilter};
use axum::Router;
use hyper_util::rt::TokioIo;

use crate::server::Server;

/// Builds the router every `georpc` HTTP listener mounts: a CONNECT tunnel
/// at [`georpc_protocol::DEFAULT_RPC_PATH`] for clients that can't open a
/// raw TCP socket directly, and a debug page at
/// [`georpc_protocol::DEFAULT_DEBUG_PATH`] listing registered services,
/// methods and call counts.
pub fn router(server: Arc<Server>) -> Router {
    Router::new()
        .route(
            georpc_protocol::DEFAULT_RPC_PATH,
            on(MethodFilter::CONNECT, handle_connect).fallback(reject_non_connect),
        )
        .route(georpc_protocol::DEFAULT_DEBUG_PATH, get(debug_page))
        .with_state(server)
}

/// Any method other than CONNECT on the tunnel path is a client mistake, not
/// a route to actually serve.
async fn reject_non_connect() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "405 must CONNECT\n").into_response()
}

/// Hijacks a CONNECT request the way `server/server.go`'s `ServeHTTP` hijacks
/// the underlying `net.Conn`: the client gets back a 200 and the connection
/// is handed, byte for byte, to [`crate::Server::serve_conn`]. Unlike the
/// original this goes through `hyper`'s typed upgrade machinery rather than
/// a hand-parsed HTTP/1.0 status line, so there's no raw-byte handshake to
/// keep in sync between client and server beyond the status code itself.
async fn handle_connect(State(server): State<Arc<Server>>, mut req: Request) -> Response {
    let upgrade = hyper::upgrade::on(&mut req);
    tokio::spawn(async move {
        match upgrade.await {
            Ok(upgraded) => {
                let io = TokioIo::new(upgraded);
                if let Err(e) = server.serve_conn(Box::new(io)).await {
                    tracing::warn!(error = %e, "tunnel connection ended with error");
                }
            }
            Err(e) => tracing::warn!(error = %e, "CONNECT upgrade failed"),
        }
    });
    (StatusCode::OK, georpc_protocol::CONNECTED_REASON).into_response()
}

async fn debug_page(State(server): State<Arc<Server>>) -> Html<String> {
    let mut out = String::from("<html><head><title>georpc services</title></head><body>");
    out.push_str("<h1>georpc services</h1>");
    for service in server.service_map().services() {
        out.push_str(&format!("<h2>{}</h2><table border=\"1\">", service.name()));
        out.push_str("<tr><th>Method</th><th>Calls</th></tr>");
        for method in service.methods() {
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                method.name(),
                method.call_count()
            ));
        }
        out.push_str("</table>");
    }
    out.push_str("</body></html>");
    Html(out)
}

/// Binds `addr` and serves the HTTP CONNECT tunnel plus the debug page until
/// the process is shut down.
pub async fn accept_http(server: Arc<Server>, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "georpc HTTP tunnel listening");
    axum::serve(listener, router(server)).await
}
