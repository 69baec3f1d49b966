mod chunk;
pub mod constants;
mod message;

pub use chunk::*;
pub use constants::*;
pub use message::*;
