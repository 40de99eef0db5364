use std::sync::Arc;

use bytes::Bytes;
use georpc_protocol::ConnectOption;
use http_body_util::Empty;
use hyper::client::conn::http1;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::client::Client;
use crate::error::ClientError;

/// Dials a server that only accepts HTTP connections by issuing a CONNECT
/// request to [`georpc_protocol::DEFAULT_RPC_PATH`] and, once the server
/// answers 200, treating the upgraded connection as a plain duplex stream
/// for the usual handshake-then-codec dance. Mirrors `client/client.go`'s
/// `NewHTTPClient`, but through `hyper`'s typed upgrade API rather than a
/// hand-parsed HTTP/1.0 status line.
pub(crate) async fn dial_http_tunnel(
    addr: &str,
    option: ConnectOption,
) -> Result<Arc<Client>, ClientError> {
    let stream = TcpStream::connect(addr).await?;
    let io = TokioIo::new(stream);
    let (mut sender, conn) = http1::handshake(io)
        .await
        .map_err(|e| ClientError::Tunnel(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(e) = conn.with_upgrades().await {
            tracing::warn!(error = %e, "tunnel connection driver failed");
        }
    });

    let request = Request::builder()
        .method(Method::CONNECT)
        .uri(georpc_protocol::DEFAULT_RPC_PATH)
        .body(Empty::<Bytes>::new())
        .map_err(|e| ClientError::Tunnel(e.to_string()))?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|e| ClientError::Tunnel(e.to_string()))?;
    if response.status() != StatusCode::OK {
        return Err(ClientError::Tunnel(format!(
            "unexpected CONNECT status {}",
            response.status()
        )));
    }

    let upgraded = hyper::upgrade::on(response)
        .await
        .map_err(|e| ClientError::Tunnel(e.to_string()))?;
    Client::handshake_and_new(Box::new(TokioIo::new(upgraded)), option).await
}
