//! A multiplexed client for `georpc` servers: dials over TCP, Unix sockets,
//! or an HTTP CONNECT tunnel, then lets many calls share one connection.

mod call;
mod client;
mod error;
mod tunnel;

pub use call::Call;
pub use client::Client;
pub use error::ClientError;
