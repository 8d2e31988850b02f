//! Quiz session server: connection transport, session controller, and the
//! WebSocket accept loop.

mod controller;
mod server;
mod transport;

pub use controller::{Controller, SharedController};
pub use server::run;
pub use transport::{ConnectionId, OutboundSender, Transport};
