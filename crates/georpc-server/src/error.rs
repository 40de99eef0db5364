#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec: {0}")]
    Codec(#[from] georpc_codec::CodecError),
    #[error("protocol: {0}")]
    Protocol(#[from] georpc_protocol::ProtocolError),
    #[error("unexpected type number {0:#x}, expected {expected:#x}", expected = georpc_protocol::TYPE_NUMBER)]
    BadTypeNumber(u32),
    #[error("service {0:?} already registered")]
    AlreadyRegistered(String),
    #[error("unknown service {0:?}")]
    UnknownService(String),
}
