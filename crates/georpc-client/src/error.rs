#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec: {0}")]
    Codec(#[from] georpc_codec::CodecError),
    #[error("protocol: {0}")]
    Protocol(#[from] georpc_protocol::ProtocolError),
    #[error("remote: {0}")]
    Remote(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("dial timed out")]
    DialTimeout,
    #[error("call timed out")]
    CallTimeout,
    #[error("buffer size must be at least 1")]
    InvalidBufferSize,
    #[error("http tunnel: {0}")]
    Tunnel(String),
}

impl Clone for ClientError {
    /// Needed so the same terminal error (connection dropped, codec error)
    /// can be delivered to every still-pending call when the receive loop
    /// exits, without each one needing to own the original.
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Codec(e) => Self::Remote(format!("codec: {e}")),
            Self::Protocol(e) => Self::Remote(format!("protocol: {e}")),
            Self::Remote(s) => Self::Remote(s.clone()),
            Self::ConnectionClosed => Self::ConnectionClosed,
            Self::DialTimeout => Self::DialTimeout,
            Self::CallTimeout => Self::CallTimeout,
            Self::InvalidBufferSize => Self::InvalidBufferSize,
            Self::Tunnel(s) => Self::Tunnel(s.clone()),
        }
    }
}
