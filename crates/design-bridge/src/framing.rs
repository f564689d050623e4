//! Length-prefixed framing
//!
//! Every message is a 4-byte little-endian length followed by the JSON body.

use design_mcp_core::{DesignError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame body accepted from the application (64MB)
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Reject an outbound body the application would refuse to read
pub fn check_frame_len(len: usize) -> Result<()> {
    if len > MAX_FRAME_LEN {
        return Err(DesignError::RequestTooLarge {
            size: len,
            limit: MAX_FRAME_LEN,
        });
    }
    Ok(())
}

/// Read one frame body
///
/// `label` names the transport in error messages.
pub async fn read_frame<R>(reader: &mut R, label: &str) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .await
        .map_err(|e| DesignError::ConnectionLost(format!("{} read length failed: {}", label, e)))?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_FRAME_LEN {
        return Err(DesignError::ProtocolError(format!(
            "Message too large: {} bytes",
            len
        )));
    }

    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .await
        .map_err(|e| DesignError::ConnectionLost(format!("{} read data failed: {}", label, e)))?;

    Ok(data)
}

/// Write one frame and flush
pub async fn write_frame<W>(writer: &mut W, data: &[u8], label: &str) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    check_frame_len(data.len())?;

    let len = (data.len() as u32).to_le_bytes();
    writer.write_all(&len).await.map_err(|e| {
        DesignError::TransportUnavailable(format!("{} write length failed: {}", label, e))
    })?;
    writer.write_all(data).await.map_err(|e| {
        DesignError::TransportUnavailable(format!("{} write data failed: {}", label, e))
    })?;
    writer
        .flush()
        .await
        .map_err(|e| DesignError::TransportUnavailable(format!("{} flush failed: {}", label, e)))?;

    Ok(())
}
