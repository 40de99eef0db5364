//! A tiny HTTP service registry: servers heartbeat their address in, clients
//! poll the current set out. See [`georpc_discovery::RegistryDiscovery`] for
//! the client-side counterpart.

mod error;
mod heartbeat;
mod register;

pub use error::RegistryError;
pub use heartbeat::heartbeat;
pub use register::{router, Register};
