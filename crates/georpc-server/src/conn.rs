use std::sync::Arc;
use std::time::Duration;

use georpc_codec::{Codec, CodecError, DuplexStream};
use georpc_protocol::Header;
use tokio::task::JoinSet;

use crate::error::ServerError;
use crate::service_map::ServiceMap;

/// Reads the [`georpc_protocol::ConnectOption`] handshake off `stream`,
/// picks the negotiated codec, and serves requests until the peer closes
/// the connection or sends something the codec can't frame.
///
/// Used for raw TCP/Unix connections and for HTTP-tunneled ones alike —
/// both eventually reduce to "a [`DuplexStream`] plus a negotiated codec".
pub async fn serve_conn(
    mut stream: Box<dyn DuplexStream>,
    service_map: Arc<ServiceMap>,
    default_handle_timeout: Duration,
) -> Result<(), ServerError> {
    let option = georpc_codec::handshake::read_option(&mut stream).await?;
    if option.type_number != georpc_protocol::TYPE_NUMBER {
        return Err(ServerError::BadTypeNumber(option.type_number));
    }
    let codec: Arc<dyn Codec> = Arc::from(georpc_codec::construct_codec(&option.codec_type, stream)?);
    let handle_timeout = if option.handle_timeout_ms > 0 {
        option.handle_timeout()
    } else {
        default_handle_timeout
    };
    serve_codec(codec, service_map, handle_timeout).await
}

async fn serve_codec(
    codec: Arc<dyn Codec>,
    service_map: Arc<ServiceMap>,
    handle_timeout: Duration,
) -> Result<(), ServerError> {
    let mut calls = JoinSet::new();
    loop {
        let header = match codec.read_header().await {
            Ok(header) => header,
            Err(CodecError::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "read_header failed, closing connection");
                break;
            }
        };
        let body = match codec.read_body().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "read_body failed, closing connection");
                break;
            }
        };
        let codec = codec.clone();
        let service_map = service_map.clone();
        calls.spawn(async move {
            handle_call(&codec, &service_map, header, body, handle_timeout).await;
        });
    }
    // Drain in-flight calls so their responses (if the write race already
    // started) still land before the connection is torn down.
    while calls.join_next().await.is_some() {}
    let _ = codec.close().await;
    Ok(())
}

async fn handle_call(
    codec: &Arc<dyn Codec>,
    service_map: &Arc<ServiceMap>,
    header: Header,
    body: Vec<u8>,
    handle_timeout: Duration,
) {
    let seq = header.seq;
    let service_method = header.service_method.clone();
    let service_map = service_map.clone();
    let invoke = tokio::spawn(async move { invoke_method(&service_map, &service_method, body).await });

    let result = if handle_timeout.is_zero() {
        invoke
            .await
            .unwrap_or_else(|e| Err(format!("handler task panicked: {e}")))
    } else {
        let mut invoke = invoke;
        tokio::select! {
            res = &mut invoke => res.unwrap_or_else(|e| Err(format!("handler task panicked: {e}"))),
            () = tokio::time::sleep(handle_timeout) => {
                // `invoke` is a JoinHandle, already running on the runtime:
                // not awaiting it further doesn't cancel it, it just keeps
                // going in the background and its eventual result is
                // dropped. The client already has its timeout error.
                tracing::warn!(seq, service_method = %header.service_method, "handler timed out");
                Err(georpc_protocol::HANDLE_TIMEOUT_MARKER.to_owned())
            }
        }
    };

    let (error, reply) = match result {
        Ok(bytes) => (String::new(), bytes),
        Err(message) => (message, Vec::new()),
    };
    let response_header = Header {
        service_method: header.service_method,
        seq,
        error,
    };
    if let Err(e) = codec.write(&response_header, &reply).await {
        tracing::warn!(seq, error = %e, "failed to write response");
    }
}

async fn invoke_method(
    service_map: &ServiceMap,
    service_method: &str,
    body: Vec<u8>,
) -> Result<Vec<u8>, String> {
    let (service_name, method_name) =
        georpc_protocol::split_service_method(service_method).map_err(|e| e.to_string())?;
    let service = service_map.get(service_name).map_err(|e| e.to_string())?;
    let method = service.method(method_name).map_err(|e| e.to_string())?;
    method.invoke(body).await.map_err(|e| e.to_string())
}
