//! Framed async message I/O over a reliable byte stream
//!
//! A message on the wire is the kind byte followed by a self-delimiting
//! body (the body's leading `u32` is its own total length). The reader
//! never allocates more than [`MAX_BODY_LEN`] bytes for a declared body.

use byteorder::{ByteOrder, LittleEndian};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{CodecError, Result};
use crate::message::{MessageKind, WireMessage};

/// Upper bound on a message body. A declared length beyond this is treated
/// as a framing error, not an allocation request.
pub const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

/// Body records must at least hold their own length field.
const MIN_BODY_LEN: usize = 4;

/// Write one message to the stream.
pub async fn write_message<W>(writer: &mut W, message: &WireMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&message.encode()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message from the stream.
///
/// Returns `Ok(None)` on a clean end-of-stream before the kind byte; an
/// end-of-stream anywhere inside a message is [`CodecError::TruncatedInput`].
pub async fn read_message<R>(reader: &mut R) -> Result<Option<WireMessage>>
where
    R: AsyncRead + Unpin,
{
    let mut kind_buf = [0u8; 1];
    match reader.read_exact(&mut kind_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let kind = MessageKind::from_byte(kind_buf[0])?;
    if kind == MessageKind::Shutdown {
        return Ok(Some(WireMessage::Shutdown));
    }

    let mut len_buf = [0u8; 4];
    read_exact_or_truncated(reader, &mut len_buf).await?;
    let declared = LittleEndian::read_u32(&len_buf) as usize;
    if declared > MAX_BODY_LEN {
        return Err(CodecError::OversizedMessage {
            declared,
            limit: MAX_BODY_LEN,
        });
    }
    if declared < MIN_BODY_LEN {
        return Err(CodecError::MalformedLength {
            field: "message body",
            declared,
            expected: MIN_BODY_LEN,
        });
    }

    let mut body = vec![0u8; declared];
    body[..4].copy_from_slice(&len_buf);
    read_exact_or_truncated(reader, &mut body[4..]).await?;

    WireMessage::decode_body(kind, &body).map(Some)
}

async fn read_exact_or_truncated<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let needed = buf.len();
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        // The stream ended mid-message; exact bytes read are unknown.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(CodecError::TruncatedInput {
                needed,
                available: 0,
            })
        }
        Err(e) => Err(e.into()),
    }
}
