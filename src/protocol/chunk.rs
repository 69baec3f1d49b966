use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::protocol::message::RtspMessage;
use crate::utils::PooledBuffer;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of the listener a chunk came from.
///
/// Identifies the connection without owning it; useful when one subscriber
/// watches several listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a fresh process-wide unique id
    pub fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// An interleaved binary frame (RFC 2326 §10.12): RTP or RTCP payload
/// carried inside the RTSP TCP connection.
#[derive(Debug, Clone, PartialEq)]
pub struct RtspData {
    /// Interleaved channel the frame arrived on
    pub channel: u8,
    /// Frame payload, at most 65535 bytes
    pub payload: PooledBuffer,
    /// Listener that produced this frame
    pub source: Option<ListenerId>,
}

impl RtspData {
    /// Create a data frame from an owned payload
    pub fn new(channel: u8, payload: impl Into<PooledBuffer>) -> Self {
        RtspData {
            channel,
            payload: payload.into(),
            source: None,
        }
    }
}

/// The unit produced by the frame reader: one text message or one
/// interleaved binary frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RtspChunk {
    Message(RtspMessage),
    Data(RtspData),
}

impl RtspChunk {
    pub fn is_message(&self) -> bool {
        matches!(self, RtspChunk::Message(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, RtspChunk::Data(_))
    }

    /// Stamp the producing listener on the chunk
    pub fn set_source(&mut self, id: ListenerId) {
        match self {
            RtspChunk::Message(RtspMessage::Request(req)) => req.source = Some(id),
            RtspChunk::Message(RtspMessage::Response(resp)) => resp.source = Some(id),
            RtspChunk::Data(data) => data.source = Some(id),
        }
    }
}

impl From<RtspMessage> for RtspChunk {
    fn from(message: RtspMessage) -> Self {
        RtspChunk::Message(message)
    }
}

impl From<RtspData> for RtspChunk {
    fn from(data: RtspData) -> Self {
        RtspChunk::Data(data)
    }
}
