use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use georpc_codec::{Codec, DuplexStream};
use georpc_protocol::{ConnectOption, Header, ProtocolError};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::call::{Call, PendingEntry};
use crate::error::ClientError;

/// `go()` completion channel capacity used by `call()`. A single call only
/// ever needs one slot, but this matches the buffer the original client
/// hands every call by default.
const DEFAULT_CALL_BUFFER: usize = 10;

struct ClientState {
    seq: u64,
    pending: HashMap<u64, PendingEntry>,
    /// Set once `close()` has been called by this side.
    closed: bool,
    /// Set once the receive loop has observed the connection end, whether
    /// or not this side asked for it.
    shutdown: bool,
}

/// A multiplexed connection to one `georpc` server: many calls can be in
/// flight over the same socket at once, matched back to their caller by
/// [`Header::seq`].
///
/// Two distinct locks, deliberately not merged into one:
/// - `sending` serializes the "assign a seq, then write the request" pair
///   so two concurrent callers' writes can't land with their seqs swapped
///   relative to registration order.
/// - `state` guards the pending-call table, `seq` counter and the
///   closed/shutdown flags, and is only ever held for the instant it takes
///   to mutate a `HashMap` — never across an `.await`.
///
/// Keeping them separate means a slow write (the peer's TCP receive window
/// is full, say) blocks only other senders, never the receive loop's
/// bookkeeping or a concurrent caller just checking [`Client::is_available`].
pub struct Client {
    codec: Arc<dyn Codec>,
    sending: AsyncMutex<()>,
    state: StdMutex<ClientState>,
}

impl Client {
    pub fn new(codec: Arc<dyn Codec>) -> Arc<Self> {
        let client = Arc::new(Self {
            codec,
            sending: AsyncMutex::new(()),
            state: StdMutex::new(ClientState {
                seq: 1,
                pending: HashMap::new(),
                closed: false,
                shutdown: false,
            }),
        });
        let receiver = client.clone();
        tokio::spawn(async move { receiver.receive_loop().await });
        client
    }

    /// Parses `rpc_addr` as `"<network> <target>"` and dials accordingly:
    /// `tcp`/`unix` open a raw socket, `http` tunnels through a CONNECT
    /// request to [`georpc_protocol::DEFAULT_RPC_PATH`].
    pub async fn dial(rpc_addr: &str, option: ConnectOption) -> Result<Arc<Self>, ClientError> {
        let (network, address) = georpc_protocol::split_address(rpc_addr)?;
        match network {
            "http" => crate::tunnel::dial_http_tunnel(address, option).await,
            "unix" => Self::dial_unix(address, option).await,
            "tcp" => Self::dial_tcp(address, option).await,
            other => Err(ClientError::Protocol(ProtocolError::MalformedAddress(
                format!("unknown network {other:?} in {rpc_addr:?}"),
            ))),
        }
    }

    pub async fn dial_tcp(addr: &str, option: ConnectOption) -> Result<Arc<Self>, ClientError> {
        let stream = race_connect(TcpStream::connect(addr), option.connection_timeout()).await?;
        Self::handshake_and_new(Box::new(stream), option).await
    }

    #[cfg(unix)]
    pub async fn dial_unix(path: &str, option: ConnectOption) -> Result<Arc<Self>, ClientError> {
        let stream = race_connect(
            tokio::net::UnixStream::connect(path),
            option.connection_timeout(),
        )
        .await?;
        Self::handshake_and_new(Box::new(stream), option).await
    }

    #[cfg(not(unix))]
    pub async fn dial_unix(_path: &str, _option: ConnectOption) -> Result<Arc<Self>, ClientError> {
        Err(ClientError::Tunnel("unix sockets unsupported on this platform".to_owned()))
    }

    pub(crate) async fn handshake_and_new(
        mut stream: Box<dyn DuplexStream>,
        option: ConnectOption,
    ) -> Result<Arc<Self>, ClientError> {
        georpc_codec::handshake::write_option(&mut stream, &option).await?;
        let codec = georpc_codec::construct_codec(&option.codec_type, stream)?;
        Ok(Self::new(Arc::from(codec)))
    }

    pub fn is_available(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        !state.closed && !state.shutdown
    }

    pub async fn close(&self) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if state.closed {
                return Err(ClientError::ConnectionClosed);
            }
            state.closed = true;
        }
        self.codec.close().await.map_err(ClientError::from)
    }

    /// Registers a call and writes it to the wire, returning a handle the
    /// caller can wait on. `buf` is the completion channel's capacity and
    /// must be at least 1.
    pub async fn go<Req: Serialize>(
        &self,
        service_method: &str,
        args: &Req,
        buf: usize,
    ) -> Result<Call, ClientError> {
        if buf == 0 {
            return Err(ClientError::InvalidBufferSize);
        }
        let (tx, rx) = mpsc::channel(buf);
        let seq = {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if state.closed || state.shutdown {
                return Err(ClientError::ConnectionClosed);
            }
            let seq = state.seq;
            state.seq += 1;
            state.pending.insert(seq, PendingEntry { tx });
            seq
        };

        let body = georpc_codec::encode(args)?;
        let header = Header::request(service_method, seq);
        let _sending = self.sending.lock().await;
        if let Err(e) = self.codec.write(&header, &body).await {
            self.remove_pending(seq);
            return Err(e.into());
        }
        Ok(Call {
            seq,
            service_method: service_method.to_owned(),
            rx,
        })
    }

    /// Sends a call and waits for its reply, optionally bounded by
    /// `timeout`. On timeout the pending entry is removed so a reply that
    /// eventually does show up is silently dropped rather than leaking.
    pub async fn call<Req, Res>(
        &self,
        service_method: &str,
        args: &Req,
        timeout: Option<Duration>,
    ) -> Result<Res, ClientError>
    where
        Req: Serialize,
        Res: serde::de::DeserializeOwned,
    {
        let call = self.go(service_method, args, DEFAULT_CALL_BUFFER).await?;
        let seq = call.seq;
        let bytes = match timeout {
            None => call.recv_bytes().await?,
            Some(d) => match tokio::time::timeout(d, call.recv_bytes()).await {
                Ok(result) => result?,
                Err(_) => {
                    self.remove_pending(seq);
                    return Err(ClientError::CallTimeout);
                }
            },
        };
        georpc_codec::decode(&bytes).map_err(ClientError::from)
    }

    fn remove_pending(&self, seq: u64) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.pending.remove(&seq);
    }

    async fn receive_loop(self: Arc<Self>) {
        loop {
            let header = match self.codec.read_header().await {
                Ok(h) => h,
                Err(_) => break,
            };
            // Always drain the body, error reply or not: the codec wrote a
            // body frame (possibly empty) for every response, so skipping
            // this on an error header would desync the stream for every
            // call that follows.
            let body = match self.codec.read_body().await {
                Ok(b) => b,
                Err(_) => break,
            };
            let entry = {
                let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                state.pending.remove(&header.seq)
            };
            let Some(entry) = entry else {
                tracing::warn!(seq = header.seq, "response for unknown or already-resolved call");
                continue;
            };
            let result = if header.is_error() {
                Err(ClientError::Remote(header.error))
            } else {
                Ok(body)
            };
            let _ = entry.tx.try_send(result);
        }
        self.terminate_calls(ClientError::ConnectionClosed);
    }

    fn terminate_calls(&self, err: ClientError) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.shutdown = true;
        for (_, entry) in state.pending.drain() {
            let _ = entry.tx.try_send(Err(err.clone()));
        }
    }
}

async fn race_connect<F, T>(connect: F, timeout: Duration) -> Result<T, ClientError>
where
    F: std::future::Future<Output = std::io::Result<T>>,
{
    if timeout.is_zero() {
        return Ok(connect.await?);
    }
    tokio::select! {
        res = connect => Ok(res?),
        () = tokio::time::sleep(timeout) => Err(ClientError::DialTimeout),
    }
}
