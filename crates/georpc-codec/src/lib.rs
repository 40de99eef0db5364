//! Wire framing and body encoding shared by the server, client and xclient
//! crates: the [`Codec`] trait and its built-in `gob` implementation, the
//! newline-JSON [`ConnectOption`] handshake, and the `bincode` helpers used
//! to turn a concrete `Req`/`Res` into the opaque bytes a [`Codec`] frames.

mod codec;
mod error;
mod gob;
pub mod handshake;

pub use codec::{construct_codec, register_codec, Codec, CodecConstructor, DuplexStream, MAX_FRAME_BYTES};
pub use error::CodecError;
pub use gob::GobCodec;

/// Encodes a value into the byte representation every built-in codec
/// expects as a request/response body.
pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(bincode::serialize(value)?)
}

/// The inverse of [`encode`].
pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(bincode::deserialize(bytes)?)
}
