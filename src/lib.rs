mod correlation;
mod dispatch;
mod frame;
mod listener;
mod protocol;
mod transport;
mod utils;

// Re-export commonly used types at crate root
pub use correlation::*;
pub use dispatch::*;
pub use frame::*;
pub use protocol::*;
pub use utils::*;

// Transport exports
pub use transport::{StreamIo, TcpTransport, Transport, TransportStream};

// Listener exports
pub use listener::{ListenerConfig, ListenerConfigBuilder, ListenerState, RtspListener};
