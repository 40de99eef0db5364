use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

use crate::codec::{read_frame, write_frame, Codec, DuplexStream};
use crate::error::CodecError;
use async_trait::async_trait;
use georpc_protocol::Header;

/// The built-in body codec, registered under [`georpc_protocol::GOB_CODEC`].
///
/// Despite the name it doesn't speak Go's `encoding/gob` wire format — there
/// is no Rust implementation of that format worth depending on, and nothing
/// in this workspace needs cross-wire compatibility with the language this
/// protocol originated in. It's a length-prefixed `bincode` encoding instead;
/// the name is kept because it is what every `ConnectOption.codec_type`
/// string on the wire already says.
pub struct GobCodec {
    reader: Mutex<ReadHalf<Box<dyn DuplexStream>>>,
    writer: Mutex<WriteHalf<Box<dyn DuplexStream>>>,
}

impl GobCodec {
    pub fn new(stream: Box<dyn DuplexStream>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    pub(crate) fn construct(stream: Box<dyn DuplexStream>) -> Box<dyn Codec> {
        Box::new(Self::new(stream))
    }
}

#[async_trait]
impl Codec for GobCodec {
    async fn read_header(&self) -> Result<Header, CodecError> {
        let bytes = {
            let mut reader = self.reader.lock().await;
            read_frame(&mut *reader).await?
        };
        Ok(bincode::deserialize(&bytes)?)
    }

    async fn read_body(&self) -> Result<Vec<u8>, CodecError> {
        let mut reader = self.reader.lock().await;
        read_frame(&mut *reader).await
    }

    async fn write(&self, header: &Header, body: &[u8]) -> Result<(), CodecError> {
        let header_bytes = bincode::serialize(header)?;
        let result = async {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &header_bytes).await?;
            write_frame(&mut *writer, body).await?;
            writer.flush().await?;
            Ok::<_, CodecError>(())
        }
        .await;
        if result.is_err() {
            let _ = self.close().await;
        }
        result
    }

    async fn close(&self) -> Result<(), CodecError> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await.map_err(CodecError::Io)
    }
}
