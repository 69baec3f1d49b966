use byteorder::{BigEndian, WriteBytesExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::protocol::constants::*;
use crate::protocol::RtspMessage;
use crate::{Error, Result};

/// Encodes RTSP messages and interleaved frames onto the write half.
///
/// Each frame is assembled into one contiguous buffer and emitted with a
/// single `write_all`; callers serialize access through the listener's
/// writer mutex, so concurrent writes never interleave their bytes.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Take ownership of the write half
    pub fn new(writer: W) -> Self {
        FrameWriter { writer }
    }

    /// Serialize and send one RTSP message
    pub async fn write_message(&mut self, message: &RtspMessage) -> Result<()> {
        let wire = message.serialize();
        self.writer.write_all(&wire).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send one interleaved frame: `$ | channel | length | payload`.
    ///
    /// Oversize payloads are rejected before any bytes reach the wire.
    pub async fn write_data(&mut self, channel: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_INTERLEAVED_LEN {
            return Err(Error::invalid_data(format!(
                "Interleaved payload of {} bytes exceeds {}",
                payload.len(),
                MAX_INTERLEAVED_LEN
            )));
        }

        let mut frame = Vec::with_capacity(INTERLEAVED_HEADER_LEN + payload.len());
        frame.push(INTERLEAVED_MARKER);
        frame.push(channel);
        WriteBytesExt::write_u16::<BigEndian>(&mut frame, payload.len() as u16)?;
        frame.extend_from_slice(payload);

        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Shut down the write half
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
