#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer closed the connection")]
    Eof,
    #[error("encode: {0}")]
    Encode(#[from] bincode::Error),
    #[error("handshake encode: {0}")]
    HandshakeEncode(serde_json::Error),
    #[error("handshake decode: {0}")]
    HandshakeDecode(serde_json::Error),
    #[error("handshake line exceeded {0} bytes without a terminator")]
    HandshakeTooLong(usize),
    #[error("unknown codec type {0:?}")]
    UnknownCodec(String),
    #[error("frame of {0} bytes exceeds the {1}-byte limit")]
    FrameTooLarge(u32, u32),
}
