//! Named-pipe transport between the controller and one child process
//!
//! Each child shares a path prefix with the controller. The controller
//! listens on `{prefix}_server` for frames the child writes and on
//! `{prefix}_client` for the child to read frames from. On Unix both paths are
//! stream sockets, so a child (re)connecting replaces the previous peer.

pub mod endpoint;
pub mod framing;
pub mod peer;
pub mod transport;
pub mod wait;

#[cfg(test)]
mod tests;

pub use endpoint::PipeEndpoint;
pub use peer::PipePeer;
pub use transport::{PipeTransport, TransportEvent, DEFAULT_PING_TIMEOUT, DEFAULT_REPLY_TIMEOUT};
