#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("decode request: {0}")]
    Decode(georpc_codec::CodecError),
    #[error("encode response: {0}")]
    Encode(georpc_codec::CodecError),
    #[error("{0}")]
    Handler(String),
    #[error("unknown method {method:?} on service {service:?}")]
    UnknownMethod { service: String, method: String },
}
