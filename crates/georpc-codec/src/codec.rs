use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use async_trait::async_trait;
use georpc_protocol::Header;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CodecError;

/// Refuses to allocate a buffer for a frame larger than this, so a peer
/// sending a corrupt or hostile length prefix can't exhaust memory.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Anything a codec can be built on: a full-duplex, owned byte stream.
/// Implemented for `TcpStream`, `UnixStream`, and the hijacked HTTP-tunnel
/// stream alike.
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> DuplexStream for T {}

/// A framer for request/response headers and bodies over a [`DuplexStream`].
///
/// The body is carried as opaque, already-encoded bytes: the codec only
/// frames it, it never inspects or type-checks its contents. Callers encode
/// a `Req`/`Res` into bytes before calling [`Codec::write`] and decode the
/// bytes [`Codec::read_body`] returns back into a concrete type — see
/// [`crate::encode`]/[`crate::decode`].
///
/// `&self` methods rather than `&mut self`: every method is backed by an
/// internal lock, so a `Codec` can be shared behind an `Arc` and called
/// concurrently by the server's reader loop, its in-flight handler tasks,
/// and (on the client) both the sender and the reader task, all at once.
#[async_trait]
pub trait Codec: Send + Sync {
    async fn read_header(&self) -> Result<Header, CodecError>;
    async fn read_body(&self) -> Result<Vec<u8>, CodecError>;
    async fn write(&self, header: &Header, body: &[u8]) -> Result<(), CodecError>;
    async fn close(&self) -> Result<(), CodecError>;
}

pub(crate) async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<u8>, CodecError> {
    let mut len_buf = [0u8; 4];
    if let Err(e) = r.read_exact(&mut len_buf).await {
        return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::Eof
        } else {
            CodecError::Io(e)
        });
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge(len, MAX_FRAME_BYTES));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                CodecError::Eof
            } else {
                CodecError::Io(e)
            }
        })?;
    Ok(buf)
}

pub(crate) async fn write_frame<W: AsyncWrite + Unpin>(
    w: &mut W,
    bytes: &[u8],
) -> Result<(), CodecError> {
    let len = u32::try_from(bytes.len()).map_err(|_| CodecError::FrameTooLarge(u32::MAX, MAX_FRAME_BYTES))?;
    w.write_all(&len.to_be_bytes()).await?;
    w.write_all(bytes).await?;
    Ok(())
}

/// Builds a boxed [`Codec`] over a freshly split stream; registered per
/// codec-type name in the process-wide registry below.
pub type CodecConstructor = fn(Box<dyn DuplexStream>) -> Box<dyn Codec>;

fn registry() -> &'static RwLock<HashMap<String, CodecConstructor>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, CodecConstructor>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert(
            georpc_protocol::GOB_CODEC.to_owned(),
            crate::gob::GobCodec::construct as CodecConstructor,
        );
        RwLock::new(m)
    })
}

/// Registers a codec constructor under `name`, overwriting any prior entry.
/// Lets a caller add their own body codec without forking this crate.
pub fn register_codec(name: impl Into<String>, ctor: CodecConstructor) {
    registry()
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .insert(name.into(), ctor);
}

pub fn construct_codec(
    name: &str,
    stream: Box<dyn DuplexStream>,
) -> Result<Box<dyn Codec>, CodecError> {
    let guard = registry()
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let ctor = guard
        .get(name)
        .ok_or_else(|| CodecError::UnknownCodec(name.to_owned()))?;
    Ok(ctor(stream))
}
