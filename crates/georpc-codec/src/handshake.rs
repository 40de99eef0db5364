use georpc_protocol::ConnectOption;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::CodecError;

/// Caps how long a [`ConnectOption`] line can be before a peer that never
/// sends a newline is treated as misbehaving rather than hung forever.
const MAX_HANDSHAKE_BYTES: usize = 16 * 1024;

/// Writes a [`ConnectOption`] as a single newline-terminated JSON line.
///
/// The handshake is carried outside the negotiated body codec — it's what
/// *picks* the body codec — so it always speaks JSON, framed simply enough
/// (a line) that the reader doesn't need a push-based streaming parser.
pub async fn write_option<W: tokio::io::AsyncWrite + Unpin>(
    w: &mut W,
    option: &ConnectOption,
) -> Result<(), CodecError> {
    let mut line = serde_json::to_vec(option).map_err(CodecError::HandshakeEncode)?;
    line.push(b'\n');
    w.write_all(&line).await?;
    w.flush().await?;
    Ok(())
}

/// Reads a [`ConnectOption`] line.
///
/// Reads one byte at a time off the raw stream rather than through a
/// `BufReader`: a `BufReader` would read ahead past the newline into the
/// first header frame, and since the reader isn't kept around for the codec
/// built afterwards those bytes would simply be lost. One byte at a time is
/// wasteful for throughput but this runs exactly once per connection.
pub async fn read_option<R: tokio::io::AsyncRead + Unpin>(
    r: &mut R,
) -> Result<ConnectOption, CodecError> {
    let mut line = Vec::new();
    loop {
        if line.len() >= MAX_HANDSHAKE_BYTES {
            return Err(CodecError::HandshakeTooLong(MAX_HANDSHAKE_BYTES));
        }
        let byte = r.read_u8().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                CodecError::Eof
            } else {
                CodecError::Io(e)
            }
        })?;
        if byte == b'\n' {
            break;
        }
        line.push(byte);
    }
    serde_json::from_slice(&line).map_err(CodecError::HandshakeDecode)
}
