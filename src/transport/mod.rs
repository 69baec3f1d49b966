use tokio::io::{AsyncRead, AsyncWrite};

use crate::Result;

mod tcp;

pub use tcp::*;

/// Marker for duplex byte streams the listener can drive.
pub trait StreamIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> StreamIo for T {}

/// A bidirectional byte stream handed over by a transport.
pub type TransportStream = Box<dyn StreamIo>;

/// Injected transport capability.
///
/// The listener does not own socket semantics; it consumes whatever
/// reliable byte stream the transport provides and asks it to redial on
/// reconnect.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Whether the transport believes the link is up
    fn connected(&self) -> bool;

    /// Peer address, for diagnostics
    fn remote_address(&self) -> String;

    /// Hand over the staged stream; errors when none is available.
    ///
    /// Ownership moves to the caller; the transport stays `connected`
    /// until `close` or a failed `reconnect`.
    fn take_stream(&mut self) -> Result<TransportStream>;

    /// Re-establish the link and stage a fresh stream
    async fn reconnect(&mut self) -> Result<()>;

    /// Tear the link down
    async fn close(&mut self) -> Result<()>;
}
