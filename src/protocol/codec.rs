//! Wire codec
//!
//! Fixed binary layout shared by the collector and producers. Integers on
//! the wire are little-endian; the public key is PEM text terminated by its
//! END line.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::auth::{SIGNATURE_LEN, Signature};
use crate::client::Identity;
use crate::error::{CollectorError, ProtocolError};
use crate::protocol::ResponseCode;

const PEM_END: &[u8] = b"-----END PUBLIC KEY-----";

/// A signed value as received from a producer.
#[derive(Debug, Clone)]
pub struct Submission {
    pub value: i32,
    pub signature: Signature,
}

/// Reads the PEM public key a producer sends as its first message.
///
/// Stops after the END line; fails if the peer closes first or the key grows
/// past `max_len` bytes.
pub async fn read_public_key<R>(reader: &mut R, max_len: usize) -> Result<Vec<u8>, CollectorError>
where
    R: AsyncBufRead + Unpin,
{
    let mut key = Vec::new();

    loop {
        let start = key.len();
        let remaining = (max_len + 1).saturating_sub(start) as u64;
        let n = (&mut *reader).take(remaining).read_until(b'\n', &mut key).await?;

        if key.len() > max_len {
            return Err(ProtocolError::KeyTooLong(max_len).into());
        }
        if n == 0 {
            return Err(if key.is_empty() {
                ProtocolError::EmptyKey.into()
            } else {
                ProtocolError::ConnectionClosed.into()
            });
        }
        if key[start..].trim_ascii() == PEM_END {
            return Ok(key);
        }
    }
}

pub async fn write_identity<W>(writer: &mut W, identity: Identity) -> Result<(), CollectorError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_i32_le(identity.as_i32()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_identity<R>(reader: &mut R) -> Result<Identity, CollectorError>
where
    R: AsyncRead + Unpin,
{
    Ok(Identity::new(reader.read_i32_le().await?))
}

/// Reads one value followed by its fixed-length signature.
///
/// A clean close before the value is reported as [`ProtocolError::ConnectionClosed`].
pub async fn read_submission<R>(reader: &mut R) -> Result<Submission, CollectorError>
where
    R: AsyncRead + Unpin,
{
    let value = match reader.read_i32_le().await {
        Ok(value) => value,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed.into());
        }
        Err(e) => return Err(e.into()),
    };

    let mut signature = [0u8; SIGNATURE_LEN];
    reader.read_exact(&mut signature).await?;

    Ok(Submission {
        value,
        signature: Signature::from(signature),
    })
}

pub async fn write_submission<W>(
    writer: &mut W,
    value: i32,
    signature: &Signature,
) -> Result<(), CollectorError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut frame = Vec::with_capacity(4 + SIGNATURE_LEN);
    frame.extend_from_slice(&value.to_le_bytes());
    frame.extend_from_slice(signature.as_bytes());

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_response<W>(writer: &mut W, code: ResponseCode) -> Result<(), CollectorError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_i32_le(code.code()).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads a response code, rejecting values the protocol does not define.
pub async fn read_response<R>(reader: &mut R) -> Result<ResponseCode, CollectorError>
where
    R: AsyncRead + Unpin,
{
    let raw = reader.read_i32_le().await?;
    ResponseCode::from_code(raw).ok_or_else(|| ProtocolError::UnexpectedResponse(raw).into())
}
