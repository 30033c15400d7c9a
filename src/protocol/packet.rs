//! Packet Codec Interface
//!
//! Every SOCKS message decodes itself from an async byte stream, reading
//! exactly the bytes it needs, and encodes itself into a buffer.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::Result;

/// Common contract of all SOCKS messages
#[allow(async_fn_in_trait)]
pub trait Packet: Sized {
    /// Read one message from the stream
    ///
    /// Reads never go past the end of the message: whatever follows it on
    /// the stream is left untouched for the next reader.
    async fn read_from<R>(stream: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin;

    /// Append the wire form of this message to `buf`
    fn encode(&self, buf: &mut BytesMut);

    /// Exact size of the wire form
    fn encoded_len(&self) -> usize;

    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Write the wire form of this message to the stream
    async fn write_to<W>(&self, stream: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream.write_all(&self.to_bytes()).await?;
        Ok(())
    }
}

/// Read exactly `N` bytes
pub(crate) async fn read_array<const N: usize, R>(stream: &mut R) -> Result<[u8; N]>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; N];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read exactly `len` bytes
pub(crate) async fn read_vec<R>(stream: &mut R, len: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ReplyCode;

    #[tokio::test]
    async fn test_read_array_leaves_rest_of_stream() {
        let data = [1u8, 2, 3, 4, 5];
        let mut stream = &data[..];
        let head: [u8; 2] = read_array(&mut stream).await.unwrap();
        assert_eq!(head, [1, 2]);
        assert_eq!(stream, &[3, 4, 5]);
    }

    #[tokio::test]
    async fn test_short_read_fails() {
        let data = [1u8, 2];
        let mut stream = &data[..];
        let err = read_vec(&mut stream, 3).await.unwrap_err();
        assert_eq!(err.code(), ReplyCode::GeneralFailure);
    }
}
